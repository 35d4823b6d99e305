use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use super::notification_dto::NewNotification;
use super::notification_models::{Notification, NotificationSettings};
use crate::error::Result;

/// Durable per-recipient notification store.
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn create(&self, new_notification: &NewNotification) -> Result<Notification>;
    /// Newest first.
    async fn find_all_by_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>>;
    /// Returns the number of rows that changed.
    async fn mark_as_read(&self, id: Uuid, recipient_id: Uuid) -> Result<u64>;
    async fn find_settings(&self, user_id: Uuid) -> Result<Option<NotificationSettings>>;
    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<NotificationSettings>;
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn create(&self, new_notification: &NewNotification) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (recipient_id, title, body, category)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(new_notification.recipient_id)
        .bind(&new_notification.title)
        .bind(&new_notification.body)
        .bind(new_notification.category)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn find_all_by_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_as_read(&self, id: Uuid, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true
             WHERE id = $1 AND recipient_id = $2 AND is_read = false",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_settings(&self, user_id: Uuid) -> Result<Option<NotificationSettings>> {
        let settings = sqlx::query_as::<_, NotificationSettings>(
            "SELECT * FROM user_notification_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<NotificationSettings> {
        let settings = sqlx::query_as::<_, NotificationSettings>(
            "INSERT INTO user_notification_settings (user_id, push_enabled, email_enabled)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET push_enabled = EXCLUDED.push_enabled, email_enabled = EXCLUDED.email_enabled
             RETURNING *",
        )
        .bind(settings.user_id)
        .bind(settings.push_enabled)
        .bind(settings.email_enabled)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }
}

/// Process-local ledger used when no database is configured.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    // recipient -> records in insertion order
    notifications: DashMap<Uuid, Vec<Notification>>,
    settings: DashMap<Uuid, NotificationSettings>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepositoryTrait for InMemoryNotificationRepository {
    async fn create(&self, new_notification: &NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: new_notification.recipient_id,
            title: new_notification.title.clone(),
            body: new_notification.body.clone(),
            category: new_notification.category,
            is_read: false,
            created_at: Utc::now(),
        };

        self.notifications
            .entry(notification.recipient_id)
            .or_default()
            .push(notification.clone());

        Ok(notification)
    }

    async fn find_all_by_recipient(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        Ok(self
            .notifications
            .get(&recipient_id)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_as_read(&self, id: Uuid, recipient_id: Uuid) -> Result<u64> {
        let Some(mut records) = self.notifications.get_mut(&recipient_id) else {
            return Ok(0);
        };

        match records.iter_mut().find(|n| n.id == id && !n.is_read) {
            Some(notification) => {
                notification.is_read = true;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_settings(&self, user_id: Uuid) -> Result<Option<NotificationSettings>> {
        Ok(self.settings.get(&user_id).map(|s| s.clone()))
    }

    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<NotificationSettings> {
        self.settings.insert(settings.user_id, settings.clone());
        Ok(settings.clone())
    }
}
