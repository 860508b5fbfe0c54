//! Port for pushing stored notifications to live subscribers.

use crate::notification::domain::Notification;

/// Per-recipient realtime push.
///
/// Implementations must not block; publishing to a recipient without live
/// subscribers does nothing.
pub trait RealtimeFanout: Send + Sync {
    /// Pushes `notification` to its recipient's subscribers. Returns how
    /// many subscribers received it.
    fn publish(&self, notification: &Notification) -> usize;
}

/// Fanout that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFanout;

impl RealtimeFanout for NoopFanout {
    fn publish(&self, _notification: &Notification) -> usize {
        0
    }
}
