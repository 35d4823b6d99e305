use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::borrow::Cow;

use super::{ConnectionGateway, LiveConnection};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket upgrade handler; the bearer token travels as `?token=`
#[utoipa::path(
    get,
    path = "/ws/notifications",
    params(
        ("token" = String, Query, description = "Bearer token")
    ),
    responses(
        (status = 101, description = "Switching to WebSocket; pushes NotificationPayload frames")
    ),
    tag = "notifications"
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, query.token))
}

/// Handle individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, gateway: ConnectionGateway, token: Option<String>) {
    let mut connection = gateway.connect(token.as_deref());

    let Some(identity) = connection.identity() else {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: Cow::from(""),
            })))
            .await;
        return;
    };

    let (mut sender, mut receiver) = socket.split();

    let outbound = pump_frames(&mut connection, &mut sender);
    let inbound = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    };

    // Wait for either side to finish
    tokio::select! {
        _ = outbound => {}
        _ = inbound => {}
    }

    connection.close();
    let _ = sender.close().await;

    tracing::info!(%identity, "WebSocket connection closed");
}

async fn pump_frames<S>(connection: &mut LiveConnection, sender: &mut S)
where
    S: futures::Sink<Message> + Unpin,
{
    while let Some(frame) = connection.next_frame().await {
        if sender.send(Message::Text(frame)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_access_token;
    use crate::dispatch::{dispatcher::DispatcherHandle, DispatchConfig, Dispatcher};
    use crate::notification::NotificationCategory;
    use crate::routes::create_router;
    use crate::state::{Config, Repositories};
    use crate::websocket::ConnectionRegistry;
    use std::{net::SocketAddr, sync::Arc, time::Duration};
    use tokio_tungstenite::{
        connect_async,
        tungstenite::{protocol::frame::coding::CloseCode, Message as ClientMessage},
    };
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    struct Server {
        addr: SocketAddr,
        state: AppState,
        registry: ConnectionRegistry,
        dispatcher: DispatcherHandle,
    }

    async fn serve() -> Server {
        let registry = ConnectionRegistry::new();
        let (dispatcher, handle) = Dispatcher::start(registry.clone(), &DispatchConfig::default());
        let state = AppState::new(
            Arc::new(Config::for_tests()),
            Repositories::in_memory(),
            registry.clone(),
            dispatcher,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Server {
            addr,
            state,
            registry,
            dispatcher: handle,
        }
    }

    async fn wait_for_connection(registry: &ConnectionRegistry, identity: &Uuid) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.connection_count(identity) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_token_gets_policy_close_without_reason() {
        let server = serve().await;
        let expired =
            create_access_token(Uuid::new_v4(), SECRET, chrono::Duration::minutes(-10)).unwrap();

        for query in [
            String::new(),
            "?token=".to_string(),
            "?token=not-a-jwt".to_string(),
            format!("?token={}", expired),
        ] {
            let url = format!("ws://{}/ws/notifications{}", server.addr, query);
            let (mut socket, _) = connect_async(url).await.unwrap();

            let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
                .await
                .unwrap();
            match frame {
                Some(Ok(ClientMessage::Close(Some(close)))) => {
                    assert_eq!(close.code, CloseCode::Policy);
                    assert!(close.reason.is_empty());
                }
                other => panic!("expected a 1008 close for {:?}, got {:?}", query, other),
            }
        }

        server.dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_authenticated_socket_receives_payload_frames() {
        let server = serve().await;
        let recipient = Uuid::new_v4();
        let token = create_access_token(recipient, SECRET, chrono::Duration::minutes(5)).unwrap();
        let url = format!("ws://{}/ws/notifications?token={}", server.addr, token);
        let (mut socket, _) = connect_async(url).await.unwrap();
        wait_for_connection(&server.registry, &recipient).await;

        let notification = server
            .state
            .notification_service
            .create(
                recipient,
                "New offer",
                "Someone offered on your listing.",
                NotificationCategory::Offer,
            )
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .unwrap();
        let text = match frame {
            Some(Ok(ClientMessage::Text(text))) => text,
            other => panic!("expected a text frame, got {:?}", other),
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["body", "category", "createdAt", "id", "title"]);
        assert_eq!(value["id"], notification.id.to_string());
        assert_eq!(value["title"], "New offer");
        assert_eq!(value["category"], "offer");

        let _ = socket.close(None).await;
        server.dispatcher.shutdown().await;
    }
}
