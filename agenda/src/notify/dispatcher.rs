//! Broadcast dispatcher for notifications

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::Notification;

/// Default channel capacity for broadcast
pub const DEFAULT_CAPACITY: usize = 256;

/// Shared reference to NotificationDispatcher
pub type SharedDispatcher = Arc<NotificationDispatcher>;

/// Publishes notifications to every subscriber.
pub struct NotificationDispatcher {
    sender: broadcast::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Dispatcher with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Capacity below 1 is raised to 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn shared(self) -> SharedDispatcher {
        Arc::new(self)
    }

    /// Publish notifications, dropping repeats for the same recipient.
    ///
    /// Returns the number of distinct recipients addressed. The count does
    /// not depend on whether anyone is listening.
    pub fn dispatch(&self, notifications: Vec<Notification>) -> usize {
        let mut seen = HashSet::new();
        let mut count = 0;
        for notification in notifications {
            if !seen.insert(notification.recipient_id.clone()) {
                continue;
            }
            count += 1;
            let kind = notification.kind.name();
            let recipient = notification.recipient_id.clone();
            match self.sender.send(notification) {
                Ok(receivers) => {
                    debug!(kind, %recipient, receivers, "Notification published")
                }
                Err(_) => debug!(kind, %recipient, "Notification published (no receivers)"),
            }
        }
        count
    }

    /// Subscribe to every notification dispatched from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of active receivers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
