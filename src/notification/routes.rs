use axum::{
    routing::{get, post},
    Router,
};

use super::notification_handlers::{
    get_notification_settings, get_notifications, mark_notification_read,
    update_notification_settings,
};
use crate::state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_notifications))
        .route(
            "/settings",
            get(get_notification_settings).patch(update_notification_settings),
        )
        .route("/:id/read", post(mark_notification_read))
}
