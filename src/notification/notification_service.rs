use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::notification_dto::{NewNotification, UpdateNotificationSettingsRequest};
use super::notification_models::{
    Notification, NotificationCategory, NotificationPayload, NotificationSettings,
};
use super::notification_repository::NotificationRepositoryTrait;
use crate::dispatch::Dispatcher;
use crate::error::Result;

/// The notification ledger: durable record first, live push second.
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepositoryTrait>,
    dispatcher: Dispatcher,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepositoryTrait>, dispatcher: Dispatcher) -> Self {
        Self { repo, dispatcher }
    }

    /// Persist a notification for `recipient_id`, then hand it to the
    /// dispatcher. Nothing that happens after the insert can undo it.
    pub async fn create(
        &self,
        recipient_id: Uuid,
        title: &str,
        body: &str,
        category: NotificationCategory,
    ) -> Result<Notification> {
        let new_notification = NewNotification {
            recipient_id,
            title: title.to_string(),
            body: body.to_string(),
            category,
        };
        new_notification.validate()?;

        let notification = self.repo.create(&new_notification).await?;
        tracing::debug!(
            %recipient_id,
            notification_id = %notification.id,
            %category,
            "Notification recorded"
        );

        if self.push_enabled(recipient_id).await {
            self.dispatcher
                .publish(recipient_id, NotificationPayload::from(&notification));
        }

        Ok(notification)
    }

    pub async fn list(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        self.repo.find_all_by_recipient(recipient_id).await
    }

    /// Unknown and already-read ids are accepted silently.
    pub async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> Result<()> {
        self.repo.mark_as_read(notification_id, recipient_id).await?;
        Ok(())
    }

    pub async fn get_settings(&self, user_id: Uuid) -> Result<NotificationSettings> {
        Ok(self
            .repo
            .find_settings(user_id)
            .await?
            .unwrap_or_else(|| NotificationSettings::defaults_for(user_id)))
    }

    pub async fn update_settings(
        &self,
        user_id: Uuid,
        payload: UpdateNotificationSettingsRequest,
    ) -> Result<NotificationSettings> {
        let mut settings = self.get_settings(user_id).await?;
        if let Some(push_enabled) = payload.push_enabled {
            settings.push_enabled = push_enabled;
        }
        if let Some(email_enabled) = payload.email_enabled {
            settings.email_enabled = email_enabled;
        }
        self.repo.upsert_settings(&settings).await
    }

    async fn push_enabled(&self, recipient_id: Uuid) -> bool {
        match self.repo.find_settings(recipient_id).await {
            Ok(settings) => settings.map(|s| s.push_enabled).unwrap_or(true),
            Err(e) => {
                tracing::warn!(%recipient_id, "Could not load notification settings: {:?}", e);
                true
            }
        }
    }
}
