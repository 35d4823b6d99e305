use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::{
    notification_dto::{MessageResponse, UpdateNotificationSettingsRequest},
    notification_models::{Notification, NotificationSettings},
};
use crate::{error::Result, middleware::AuthUser, state::AppState};

/// Get all notifications for the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "List of notifications", body = Vec<Notification>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Notification>>> {
    let notifications = state.notification_service.list(user_id).await?;

    Ok(Json(notifications))
}

/// Mark notification as read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked as read", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    state
        .notification_service
        .mark_read(user_id, notification_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Marked as read.".to_string(),
    }))
}

/// Get notification settings
#[utoipa::path(
    get,
    path = "/api/notifications/settings",
    responses(
        (status = 200, description = "Notification settings", body = NotificationSettings),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notification_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<NotificationSettings>> {
    let settings = state.notification_service.get_settings(user_id).await?;

    Ok(Json(settings))
}

/// Update notification settings
#[utoipa::path(
    patch,
    path = "/api/notifications/settings",
    request_body = UpdateNotificationSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = NotificationSettings),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn update_notification_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateNotificationSettingsRequest>,
) -> Result<Json<NotificationSettings>> {
    let settings = state
        .notification_service
        .update_settings(user_id, payload)
        .await?;

    Ok(Json(settings))
}
