use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::{
    board_dto::{ActiveTargetResponse, BoardResponse, ReassignBoardRequest},
    board_models::{BoardAssignment, ScanTarget},
};
use crate::{error::Result, middleware::AuthUser, state::AppState};

/// List the caller's boards with their assignment history
#[utoipa::path(
    get,
    path = "/api/boards",
    responses(
        (status = 200, description = "Boards owned by the caller", body = Vec<BoardResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "boards",
    security(("bearer_auth" = []))
)]
pub async fn get_boards(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BoardResponse>>> {
    let boards = state.board_service.list_boards(user_id).await?;

    Ok(Json(boards))
}

/// Create a new, unassigned board
#[utoipa::path(
    post,
    path = "/api/boards",
    responses(
        (status = 201, description = "Board created", body = BoardResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "boards",
    security(("bearer_auth" = []))
)]
pub async fn create_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse> {
    let board = state.board_service.create_board(user_id).await?;
    let board = state.board_service.get_board(board.id, user_id).await?;

    Ok((StatusCode::CREATED, Json(board)))
}

#[utoipa::path(
    get,
    path = "/api/boards/{id}",
    params(
        ("id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 200, description = "Board detail", body = BoardResponse),
        (status = 404, description = "Board not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "boards",
    security(("bearer_auth" = []))
)]
pub async fn get_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<BoardResponse>> {
    let board = state.board_service.get_board(board_id, user_id).await?;

    Ok(Json(board))
}

/// Point a board at another target
#[utoipa::path(
    patch,
    path = "/api/boards/{id}/reassign",
    params(
        ("id" = Uuid, Path, description = "Board ID")
    ),
    request_body = ReassignBoardRequest,
    responses(
        (status = 200, description = "New active assignment", body = BoardAssignment),
        (status = 403, description = "Board or target belongs to someone else"),
        (status = 404, description = "Board or target not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "boards",
    security(("bearer_auth" = []))
)]
pub async fn reassign_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<ReassignBoardRequest>,
) -> Result<Json<BoardAssignment>> {
    let assignment = state
        .board_service
        .reassign(board_id, payload.target_id, user_id)
        .await?;

    Ok(Json(assignment))
}

#[utoipa::path(
    get,
    path = "/api/boards/{id}/target",
    params(
        ("id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 200, description = "Current target, null if never assigned", body = ActiveTargetResponse),
        (status = 404, description = "Board not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "boards",
    security(("bearer_auth" = []))
)]
pub async fn get_active_target(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(board_id): Path<Uuid>,
) -> Result<Json<ActiveTargetResponse>> {
    let target_id = state
        .board_service
        .get_active_target_for(board_id, user_id)
        .await?;

    Ok(Json(ActiveTargetResponse {
        board_id,
        target_id,
    }))
}

/// Register a target owned by the caller so boards can point at it
#[utoipa::path(
    put,
    path = "/api/targets/{id}",
    params(
        ("id" = Uuid, Path, description = "Target ID")
    ),
    responses(
        (status = 200, description = "Target registered", body = ScanTarget),
        (status = 403, description = "Target belongs to someone else"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "targets",
    security(("bearer_auth" = []))
)]
pub async fn register_target(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<ScanTarget>> {
    let target = state.board_service.register_target(target_id, user_id).await?;

    Ok(Json(target))
}

#[utoipa::path(
    get,
    path = "/api/targets/{id}",
    params(
        ("id" = Uuid, Path, description = "Target ID")
    ),
    responses(
        (status = 200, description = "Target with its scan count", body = ScanTarget),
        (status = 404, description = "Target not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "targets",
    security(("bearer_auth" = []))
)]
pub async fn get_target(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<ScanTarget>> {
    let target = state.board_service.get_target(target_id, user_id).await?;

    Ok(Json(target))
}
