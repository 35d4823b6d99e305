use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::notification_models::NotificationCategory;

/// Input to the ledger's create entry point.
#[derive(Debug, Clone, Validate)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    pub category: NotificationCategory,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateNotificationSettingsRequest {
    pub push_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
