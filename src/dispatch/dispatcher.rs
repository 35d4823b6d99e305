use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::notification::NotificationPayload;
use crate::websocket::ConnectionRegistry;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub enabled: bool,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Upper bound for handing one payload to one connection.
    pub delivery_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 4,
            queue_capacity: 1024,
            delivery_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug)]
struct DeliveryJob {
    recipient_id: Uuid,
    payload: NotificationPayload,
}

/// Fire-and-forget bridge from business operations to live connections.
///
/// `publish` only enqueues; a fixed pool of workers drains the queue and
/// pushes to every connection in the recipient's group. Delivery is
/// at-most-once: a full queue, a stopped pool, a closed connection or a
/// timed-out send all drop the payload after logging it.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Option<mpsc::Sender<DeliveryJob>>,
}

/// Owns the worker pool. Dropping it detaches the workers; they keep draining
/// the queue until [`DispatcherHandle::shutdown`] or until every
/// [`Dispatcher`] clone is gone.
#[must_use = "workers are only stopped through DispatcherHandle::shutdown"]
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    #[must_use]
    pub fn start(registry: ConnectionRegistry, config: &DispatchConfig) -> (Self, DispatcherHandle) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if !config.enabled {
            tracing::warn!("Live dispatch disabled; clients must poll for notifications");
            return (
                Self::disabled(),
                DispatcherHandle {
                    shutdown: shutdown_tx,
                    workers: Vec::new(),
                },
            );
        }

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    queue.clone(),
                    registry.clone(),
                    config.delivery_timeout,
                    shutdown_rx.clone(),
                ))
            })
            .collect::<Vec<_>>();

        tracing::info!(
            workers = workers.len(),
            queue_capacity = config.queue_capacity,
            "Dispatcher started"
        );

        (
            Self { queue: Some(tx) },
            DispatcherHandle {
                shutdown: shutdown_tx,
                workers,
            },
        )
    }

    /// A dispatcher with no backend; every publish is dropped.
    pub fn disabled() -> Self {
        Self { queue: None }
    }

    pub fn publish(&self, recipient_id: Uuid, payload: NotificationPayload) {
        let Some(queue) = &self.queue else {
            return;
        };

        let notification_id = payload.id;
        match queue.try_send(DeliveryJob {
            recipient_id,
            payload,
        }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(%recipient_id, %notification_id, "Dispatch queue full, dropping push");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(%recipient_id, %notification_id, "Dispatcher stopped, dropping push");
            }
        }
    }
}

impl DispatcherHandle {
    /// Stop the workers. Jobs still queued are abandoned.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("Dispatch worker ended abnormally: {:?}", e);
            }
        }
        tracing::info!("Dispatcher stopped");
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<DeliveryJob>>>,
    registry: ConnectionRegistry,
    delivery_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        // a dropped handle closes the channel; that branch is then disabled
        let job = tokio::select! {
            Ok(()) = shutdown.changed() => break,
            job = async { queue.lock().await.recv().await } => job,
        };
        let Some(job) = job else { break };

        let delivered = deliver(&registry, job, delivery_timeout).await;
        tracing::trace!(worker, delivered, "Delivery job finished");
    }
    tracing::debug!(worker, "Dispatch worker exiting");
}

/// Push one job to every live connection of its recipient. Returns how many
/// connections accepted the frame.
async fn deliver(registry: &ConnectionRegistry, job: DeliveryJob, delivery_timeout: Duration) -> usize {
    let DeliveryJob {
        recipient_id,
        payload,
    } = job;

    let frame = match serde_json::to_string(&payload) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(%recipient_id, "Failed to serialize push payload: {:?}", e);
            return 0;
        }
    };

    let senders = registry.senders(&recipient_id);
    if senders.is_empty() {
        tracing::debug!(%recipient_id, "No live connection, push skipped");
        return 0;
    }

    let sends = senders.into_iter().map(|sender| {
        let frame = frame.clone();
        async move { tokio::time::timeout(delivery_timeout, sender.send(frame)).await }
    });

    let mut delivered = 0;
    for result in join_all(sends).await {
        match result {
            Ok(Ok(())) => delivered += 1,
            Ok(Err(_)) => tracing::debug!(%recipient_id, "Connection closed before delivery"),
            Err(_) => tracing::warn!(%recipient_id, notification_id = %payload.id, "Push timed out, abandoned"),
        }
    }
    delivered
}
