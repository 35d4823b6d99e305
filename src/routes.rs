use crate::{
    board::{self, board_dto, board_models},
    middleware::auth_middleware,
    notification::{self, notification_dto, notification_models},
    scan::{self, scan_models},
    state::AppState,
    websocket,
};
use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        notification::notification_handlers::get_notifications,
        notification::notification_handlers::mark_notification_read,
        notification::notification_handlers::get_notification_settings,
        notification::notification_handlers::update_notification_settings,
        board::board_handlers::get_boards,
        board::board_handlers::create_board,
        board::board_handlers::get_board,
        board::board_handlers::reassign_board,
        board::board_handlers::get_active_target,
        board::board_handlers::register_target,
        board::board_handlers::get_target,
        scan::scan_handlers::resolve_scan,
        websocket::handler::ws_handler,
    ),
    components(
        schemas(
            notification_models::Notification,
            notification_models::NotificationCategory,
            notification_models::NotificationPayload,
            notification_models::NotificationSettings,
            notification_dto::UpdateNotificationSettingsRequest,
            notification_dto::MessageResponse,
            board_models::BoardAssignment,
            board_models::ScanTarget,
            board_dto::BoardResponse,
            board_dto::ReassignBoardRequest,
            board_dto::ActiveTargetResponse,
            scan_models::ScanResolution,
        )
    ),
    tags(
        (name = "notifications", description = "Notification ledger and live push"),
        (name = "boards", description = "Scannable board management"),
        (name = "targets", description = "Targets boards can point at"),
        (name = "scan", description = "Public scan resolution")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protected routes (auth required)
    let api_routes = Router::new()
        .nest("/notifications", notification::routes::notification_routes())
        .nest("/boards", board::routes::board_routes())
        .nest("/targets", board::routes::target_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Public routes; the socket authenticates itself from the query string
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .nest("/scan", scan::routes::scan_routes())
        .route("/ws/notifications", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::create_access_token,
        dispatch::Dispatcher,
        state::{Config, Repositories},
        websocket::ConnectionRegistry,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> (Router, AppState) {
        let state = AppState::new(
            Arc::new(Config::for_tests()),
            Repositories::in_memory(),
            ConnectionRegistry::new(),
            Dispatcher::disabled(),
        );
        (create_router(state.clone()), state)
    }

    fn bearer(user_id: Uuid) -> String {
        let token =
            create_access_token(user_id, "test-secret", chrono::Duration::minutes(5)).unwrap();
        format!("Bearer {}", token)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let (app, _) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_scan_of_unknown_board_is_404() {
        let (app, _) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/scan/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_board_flow_over_http() {
        let (app, state) = app();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/targets/{}", target))
                    .header("Authorization", bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/boards")
                    .header("Authorization", bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let board = json_body(response).await;
        let board_id = board["id"].as_str().unwrap().to_string();
        assert!(board["active_target_id"].is_null());

        // unassigned board resolves to 404 with no counters touched
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/scan/{}", board_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/boards/{}/reassign", board_id))
                    .header("Authorization", bearer(Uuid::new_v4()))
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(r#"{{"target_id":"{}"}}"#, target)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/boards/{}/reassign", board_id))
                    .header("Authorization", bearer(owner))
                    .header("Content-Type", "application/json")
                    .body(Body::from(format!(r#"{{"target_id":"{}"}}"#, target)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/scan/{}/", board_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let resolution = json_body(response).await;
        assert_eq!(resolution["target_id"], target.to_string());
        assert_eq!(
            resolution["redirect_url"],
            format!("http://localhost:3000/properties/{}/", target)
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications")
                    .header("Authorization", bearer(owner))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let notifications = json_body(response).await;
        assert_eq!(notifications.as_array().unwrap().len(), 2);
        assert_eq!(notifications[0]["category"], "scan");

        let board_id = Uuid::parse_str(&board_id).unwrap();
        let detail = state.board_service.get_board(board_id, owner).await.unwrap();
        assert_eq!(detail.scan_count, 1);
    }

    #[tokio::test]
    async fn test_active_target_hidden_from_other_users() {
        let (app, state) = app();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let board = state.board_service.create_board(owner).await.unwrap();
        state.board_service.register_target(target, owner).await.unwrap();
        state.board_service.reassign(board.id, target, owner).await.unwrap();

        let active_target = |user_id: Uuid| {
            Request::builder()
                .uri(format!("/api/boards/{}/target", board.id))
                .header("Authorization", bearer(user_id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(active_target(Uuid::new_v4())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(active_target(owner)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["target_id"], target.to_string());
    }
}
