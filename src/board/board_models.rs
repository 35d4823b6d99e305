use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Board {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One board→target mapping. Rows are never deleted; at most one per board
/// has `is_active` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BoardAssignment {
    pub id: Uuid,
    pub board_id: Uuid,
    pub target_id: Uuid,
    pub is_active: bool,
    pub assigned_at: DateTime<Utc>,
}

/// A listing a board can point at, as asserted by its owning service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScanTarget {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
}
