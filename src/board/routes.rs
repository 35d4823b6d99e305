use axum::{
    routing::{get, patch},
    Router,
};

use super::board_handlers::{
    create_board, get_active_target, get_board, get_boards, get_target, reassign_board,
    register_target,
};
use crate::state::AppState;

pub fn board_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_boards).post(create_board))
        .route("/:id", get(get_board))
        .route("/:id/reassign", patch(reassign_board))
        .route("/:id/target", get(get_active_target))
}

pub fn target_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_target).put(register_target))
}
