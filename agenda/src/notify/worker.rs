//! Background delivery of broadcast notifications

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Notification;

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery to {recipient} failed: {message}")]
    DeliveryFailed { recipient: String, message: String },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Where notifications end up (mail, push, in-app inbox).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Counters reported when a worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub failed: u64,
    /// Notifications skipped because the worker fell behind the channel
    pub lagged: u64,
}

/// Drains a dispatcher subscription into a sink until the channel closes.
pub struct DeliveryWorker {
    receiver: broadcast::Receiver<Notification>,
    sink: Arc<dyn NotificationSink>,
}

impl DeliveryWorker {
    /// Worker draining `receiver` into `sink`.
    pub fn new(receiver: broadcast::Receiver<Notification>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { receiver, sink }
    }

    pub async fn run(mut self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        loop {
            match self.receiver.recv().await {
                Ok(notification) => match self.sink.deliver(&notification).await {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!(
                            notification_id = %notification.id,
                            recipient = %notification.recipient_id,
                            "Notification delivery failed: {}",
                            e
                        );
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    stats.lagged += skipped;
                    warn!(skipped, "Delivery worker lagged behind dispatcher");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!(
            delivered = stats.delivered,
            failed = stats.failed,
            lagged = stats.lagged,
            "Delivery worker stopped"
        );
        stats
    }

    /// Run until every sender is dropped, then return the counters.
    pub fn spawn(self) -> JoinHandle<DeliveryStats> {
        tokio::spawn(self.run())
    }
}

/// Sink that writes each notification to the log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient_id,
            post_id = %notification.post_id,
            kind = notification.kind.name(),
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Sink that keeps notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .map_err(|_| NotifyError::Unavailable("memory sink lock poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}
