use anyhow::Context;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::board::{
    BoardRepository, BoardRepositoryTrait, BoardService, InMemoryBoardRepository,
    InMemoryTargetRepository, TargetRepository, TargetRepositoryTrait,
};
use crate::db::DbPool;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::notification::{
    InMemoryNotificationRepository, NotificationRepository, NotificationRepositoryTrait,
    NotificationService,
};
use crate::scan::ScanResolver;
use crate::websocket::{ConnectionGateway, ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: ConnectionGateway,
    pub notification_service: NotificationService,
    pub board_service: BoardService,
    pub scan_resolver: ScanResolver,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        repositories: Repositories,
        registry: ConnectionRegistry,
        dispatcher: Dispatcher,
    ) -> Self {
        let notification_service =
            NotificationService::new(repositories.notifications, dispatcher);
        let board_service = BoardService::new(
            repositories.boards.clone(),
            repositories.targets.clone(),
            notification_service.clone(),
            config.frontend_url.as_str(),
        );
        let scan_resolver = ScanResolver::new(
            repositories.boards,
            repositories.targets,
            notification_service.clone(),
            config.frontend_url.as_str(),
        );
        let gateway = ConnectionGateway::new(
            registry,
            config.jwt_secret.as_str(),
            config.connection_buffer,
        );

        Self {
            config,
            gateway,
            notification_service,
            board_service,
            scan_resolver,
        }
    }
}

pub struct Repositories {
    pub notifications: Arc<dyn NotificationRepositoryTrait>,
    pub boards: Arc<dyn BoardRepositoryTrait>,
    pub targets: Arc<dyn TargetRepositoryTrait>,
}

impl Repositories {
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            boards: Arc::new(BoardRepository::new(pool.clone())),
            targets: Arc::new(TargetRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            boards: Arc::new(InMemoryBoardRepository::new()),
            targets: Arc::new(InMemoryTargetRepository::new()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub frontend_url: String,
    pub host: String,
    pub port: u16,
    pub connection_buffer: usize,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let setting = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            jwt_secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                &setting("DATABASE_MAX_CONNECTIONS", "5"),
            )?,
            frontend_url: setting("FRONTEND_URL", "http://localhost:3000"),
            host: setting("HOST", "127.0.0.1"),
            port: parse("PORT", &setting("PORT", "8080"))?,
            connection_buffer: parse("CONNECTION_BUFFER", &setting("CONNECTION_BUFFER", "32"))?,
            dispatch: DispatchConfig {
                enabled: parse("DISPATCH_ENABLED", &setting("DISPATCH_ENABLED", "true"))?,
                workers: parse("DISPATCH_WORKERS", &setting("DISPATCH_WORKERS", "4"))?,
                queue_capacity: parse(
                    "DISPATCH_QUEUE_CAPACITY",
                    &setting("DISPATCH_QUEUE_CAPACITY", "1024"),
                )?,
                delivery_timeout: Duration::from_millis(parse(
                    "DISPATCH_TIMEOUT_MS",
                    &setting("DISPATCH_TIMEOUT_MS", "2000"),
                )?),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} must be a valid value, got {:?}", key, raw))
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            database_url: None,
            database_max_connections: 1,
            frontend_url: "http://localhost:3000".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            connection_buffer: 8,
            dispatch: DispatchConfig::default(),
        }
    }
}
