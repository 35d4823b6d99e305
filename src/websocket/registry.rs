use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Outbound half of a live connection; frames are serialized JSON text.
pub type PushSender = mpsc::Sender<String>;

/// Live connections grouped by recipient identity.
///
/// Created once at process start and shared by the gateway (which adds and
/// removes members) and the dispatcher (which reads groups to fan out).
/// [`ConnectionRegistry::shutdown`] drops every sender, which ends each
/// connection's outbound stream and closes the socket.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    groups: Arc<DashMap<Uuid, HashMap<ConnectionId, PushSender>>>,
    closed: Arc<AtomicBool>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the identity's group. Returns `None` once the
    /// registry has been shut down.
    pub fn register(&self, identity: Uuid, sender: PushSender) -> Option<ConnectionId> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }

        let connection_id = Uuid::new_v4();
        let mut group = self.groups.entry(identity).or_default();
        // re-checked under the shard lock so a concurrent shutdown cannot miss it
        if self.closed.load(Ordering::Acquire) {
            drop(group);
            self.groups.remove_if(&identity, |_, group| group.is_empty());
            return None;
        }
        group.insert(connection_id, sender);
        let members = group.len();
        drop(group);

        tracing::info!(%identity, %connection_id, members, "Connection joined group");
        Some(connection_id)
    }

    /// Remove a single connection; the group disappears with its last member.
    pub fn unregister(&self, identity: &Uuid, connection_id: &ConnectionId) {
        if let Some(mut group) = self.groups.get_mut(identity) {
            group.remove(connection_id);
        }
        self.groups.remove_if(identity, |_, group| group.is_empty());

        tracing::info!(%identity, %connection_id, "Connection left group");
    }

    /// Snapshot of the senders for an identity, taken without holding the
    /// map lock across any await.
    pub fn senders(&self, identity: &Uuid) -> Vec<PushSender> {
        self.groups
            .get(identity)
            .map(|group| group.values().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn connection_count(&self, identity: &Uuid) -> usize {
        self.groups.get(identity).map(|group| group.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn online_identities(&self) -> Vec<Uuid> {
        self.groups.iter().map(|entry| *entry.key()).collect()
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close every live connection and refuse new ones.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let connections: usize = self.groups.iter().map(|group| group.len()).sum();
        self.groups.clear();
        tracing::info!(connections, "Connection registry shut down");
    }
}
