pub mod notification_dto;
pub mod notification_handlers;
pub mod notification_models;
pub mod notification_repository;
pub mod notification_service;
pub mod routes;

pub use notification_models::{NotificationCategory, NotificationPayload};
pub use notification_repository::{
    InMemoryNotificationRepository, NotificationRepository, NotificationRepositoryTrait,
};
pub use notification_service::NotificationService;
