use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::scan_models::ScanResolution;
use crate::{error::Result, state::AppState};

/// Public endpoint hit when a board is scanned: resolves the board to its
/// current target and notifies the owner
#[utoipa::path(
    get,
    path = "/scan/{id}",
    params(
        ("id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 200, description = "Board resolved", body = ScanResolution),
        (status = 404, description = "Unknown board, or board has no active target")
    ),
    tag = "scan"
)]
pub async fn resolve_scan(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ScanResolution>> {
    let resolution = state.scan_resolver.resolve(board_id).await?;

    Ok(Json(resolution))
}
