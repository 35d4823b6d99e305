use std::sync::Arc;
use uuid::Uuid;

use super::scan_models::ScanResolution;
use crate::board::{BoardRepositoryTrait, TargetRepositoryTrait};
use crate::error::{AppError, Result};
use crate::notification::{NotificationCategory, NotificationService};

/// Public resolution of a scanned board to its current target.
///
/// The only writer of scan counters. Counters are bumped with independent
/// increments and are not locked against each other.
#[derive(Clone)]
pub struct ScanResolver {
    boards: Arc<dyn BoardRepositoryTrait>,
    targets: Arc<dyn TargetRepositoryTrait>,
    notifications: NotificationService,
    frontend_url: Arc<str>,
}

impl ScanResolver {
    pub fn new(
        boards: Arc<dyn BoardRepositoryTrait>,
        targets: Arc<dyn TargetRepositoryTrait>,
        notifications: NotificationService,
        frontend_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            boards,
            targets,
            notifications,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn resolve(&self, board_id: Uuid) -> Result<ScanResolution> {
        let board = self
            .boards
            .find_by_id(board_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Board not found".to_string()))?;

        let target_id = self
            .boards
            .find_active_assignment(board_id)
            .await?
            .map(|assignment| assignment.target_id)
            .ok_or_else(|| AppError::NotAssigned("This board has no active target".to_string()))?;

        self.boards.increment_scan_count(board_id).await?;
        self.targets.increment_scan_count(target_id).await?;

        // the scan already counted; a ledger failure must not fail it
        if let Err(e) = self
            .notifications
            .create(
                board.owner_id,
                "QR Code Scanned!",
                &format!("Someone scanned board {} pointing to {}.", board_id, target_id),
                NotificationCategory::Scan,
            )
            .await
        {
            tracing::warn!(%board_id, "Failed to record scan notification: {:?}", e);
        }

        tracing::debug!(%board_id, %target_id, "Board scanned");

        Ok(ScanResolution {
            redirect_url: format!(
                "{}/properties/{}/",
                self.frontend_url.trim_end_matches('/'),
                target_id
            ),
            target_id,
        })
    }
}
