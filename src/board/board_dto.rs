use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::board_models::{Board, BoardAssignment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReassignBoardRequest {
    pub target_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BoardResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub scan_count: i64,
    pub scan_url: String,
    pub active_target_id: Option<Uuid>,
    /// Newest first.
    pub assignments: Vec<BoardAssignment>,
    pub created_at: DateTime<Utc>,
}

impl BoardResponse {
    pub fn new(board: Board, assignments: Vec<BoardAssignment>, frontend_url: &str) -> Self {
        let active_target_id = assignments
            .iter()
            .find(|assignment| assignment.is_active)
            .map(|assignment| assignment.target_id);

        Self {
            id: board.id,
            owner_id: board.owner_id,
            scan_count: board.scan_count,
            scan_url: scan_url(frontend_url, board.id),
            active_target_id,
            assignments,
            created_at: board.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveTargetResponse {
    pub board_id: Uuid,
    pub target_id: Option<Uuid>,
}

/// Public address printed on a board.
pub fn scan_url(frontend_url: &str, board_id: Uuid) -> String {
    format!("{}/scan/{}/", frontend_url.trim_end_matches('/'), board_id)
}
