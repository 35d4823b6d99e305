use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::registry::{ConnectionId, ConnectionRegistry};
use crate::auth::identity_from_token;

/// Lifecycle of a live connection: `Connecting → Authenticated → Closed`,
/// or `Connecting → Closed` when the token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated(Uuid),
    Closed,
}

/// Admits live connections and keeps the registry membership in step with
/// each connection's state.
#[derive(Clone)]
pub struct ConnectionGateway {
    registry: ConnectionRegistry,
    jwt_secret: Arc<str>,
    buffer: usize,
}

impl ConnectionGateway {
    pub fn new(registry: ConnectionRegistry, jwt_secret: impl Into<Arc<str>>, buffer: usize) -> Self {
        Self {
            registry,
            jwt_secret: jwt_secret.into(),
            buffer: buffer.max(1),
        }
    }

    /// Run the handshake for an incoming connection presenting `token`.
    ///
    /// The returned connection is either `Authenticated` and registered under
    /// its identity, or already `Closed`. Rejections carry no detail.
    pub fn connect(&self, token: Option<&str>) -> LiveConnection {
        let mut connection = LiveConnection {
            state: ConnectionState::Connecting,
            connection_id: None,
            receiver: None,
            registry: self.registry.clone(),
        };

        let identity = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .and_then(|t| identity_from_token(t, &self.jwt_secret).ok());

        let Some(identity) = identity else {
            tracing::debug!("Rejected live connection");
            connection.state = ConnectionState::Closed;
            return connection;
        };

        let (tx, rx) = mpsc::channel(self.buffer);
        match self.registry.register(identity, tx) {
            Some(connection_id) => {
                connection.state = ConnectionState::Authenticated(identity);
                connection.connection_id = Some(connection_id);
                connection.receiver = Some(rx);
            }
            None => {
                tracing::debug!("Refused live connection during shutdown");
                connection.state = ConnectionState::Closed;
            }
        }

        connection
    }
}

pub struct LiveConnection {
    state: ConnectionState,
    connection_id: Option<ConnectionId>,
    receiver: Option<mpsc::Receiver<String>>,
    registry: ConnectionRegistry,
}

impl LiveConnection {
    #[cfg(test)]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> Option<Uuid> {
        match self.state {
            ConnectionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Next pushed frame. Resolves to `None` once the connection is closed,
    /// including when the registry is torn down underneath it.
    pub async fn next_frame(&mut self) -> Option<String> {
        let frame = match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => None,
        };
        if frame.is_none() {
            self.close();
        }
        frame
    }

    pub fn close(&mut self) {
        if let (ConnectionState::Authenticated(identity), Some(connection_id)) =
            (self.state, self.connection_id.take())
        {
            self.registry.unregister(&identity, &connection_id);
        }
        self.receiver = None;
        self.state = ConnectionState::Closed;
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.close();
    }
}
