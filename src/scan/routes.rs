use axum::{routing::get, Router};

use super::scan_handlers::resolve_scan;
use crate::state::AppState;

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(resolve_scan))
        .route("/:id/", get(resolve_scan))
}
