mod auth;
mod board;
mod db;
mod dispatch;
mod error;
mod middleware;
mod notification;
mod routes;
mod scan;
mod state;
mod websocket;

use anyhow::Context;
use db::{create_pool, run_migrations};
use dispatch::Dispatcher;
use routes::create_router;
use state::{AppState, Config, Repositories};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use websocket::ConnectionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,board_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    let repositories = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let db = create_pool(database_url, config.database_max_connections)
                .await
                .context("failed to connect to the database")?;

            tracing::info!("Running migrations...");
            run_migrations(&db).await.context("failed to run migrations")?;

            Repositories::postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data is lost on exit");
            Repositories::in_memory()
        }
    };

    // Live connection registry and the workers that push into it
    let registry = ConnectionRegistry::new();
    let (dispatcher, dispatcher_handle) = Dispatcher::start(registry.clone(), &config.dispatch);

    let state = AppState::new(config.clone(), repositories, registry.clone(), dispatcher);
    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // open sockets end once the registry is closed, so shut it down before draining
    let shutdown_registry = registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_registry.shutdown();
        })
        .await?;

    dispatcher_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
