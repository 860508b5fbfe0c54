//! Per-recipient realtime fanout over `tokio::sync::broadcast`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::notification::{domain::Notification, ports::RealtimeFanout};
use crate::task::domain::StaffId;

type Channels = HashMap<StaffId, broadcast::Sender<Notification>>;

/// In-process publish/subscribe hub keyed by recipient.
///
/// Channels are created on first subscription and pruned by the first
/// publish that finds no live receivers. Slow subscribers lose the oldest
/// payloads instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct BroadcastFanout {
    channels: Arc<Mutex<Channels>>,
    capacity: usize,
}

impl BroadcastFanout {
    /// Creates a hub whose per-recipient buffers hold `capacity` payloads.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Registers interest in `recipient`'s notifications.
    #[must_use]
    pub fn subscribe(&self, recipient: StaffId) -> FanoutSubscription {
        let mut channels = self.lock();
        let receiver = channels
            .entry(recipient)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(%recipient, "realtime subscriber registered");
        FanoutSubscription {
            recipient,
            receiver,
        }
    }

    /// Returns the number of live subscribers for `recipient`.
    #[must_use]
    pub fn subscriber_count(&self, recipient: StaffId) -> usize {
        self.lock()
            .get(&recipient)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Returns the number of recipients with an open channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        // The map stays consistent even if a holder panicked.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BroadcastFanout {
    fn default() -> Self {
        Self::new(crate::config::EngineConfig::default().fanout_capacity)
    }
}

impl RealtimeFanout for BroadcastFanout {
    fn publish(&self, notification: &Notification) -> usize {
        let recipient = notification.recipient();
        let mut channels = self.lock();
        let Some(sender) = channels.get(&recipient) else {
            return 0;
        };
        match sender.send(notification.clone()) {
            Ok(delivered) => delivered,
            Err(_) => {
                channels.remove(&recipient);
                debug!(%recipient, "pruned realtime channel without subscribers");
                0
            }
        }
    }
}

/// Live stream of one recipient's notifications.
#[derive(Debug)]
pub struct FanoutSubscription {
    recipient: StaffId,
    receiver: broadcast::Receiver<Notification>,
}

impl FanoutSubscription {
    /// Returns the recipient this subscription follows.
    #[must_use]
    pub const fn recipient(&self) -> StaffId {
        self.recipient
    }

    /// Waits for the next notification.
    ///
    /// Returns `None` once the hub has dropped the channel. Payloads lost
    /// to lag are logged and skipped.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(recipient = %self.recipient, skipped, "realtime subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
