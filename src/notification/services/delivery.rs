//! Store-then-publish delivery shared by the notifier and the scanner.

use crate::notification::{
    domain::{DedupKey, Notification},
    ports::{DedupOutcome, NotificationRepository, NotificationStoreResult, RealtimeFanout},
};
use std::sync::Arc;
use tracing::debug;

/// Writes notifications and pushes them to live subscribers once the write
/// has committed.
#[derive(Debug)]
pub struct NotificationDelivery<N, F>
where
    N: NotificationRepository,
    F: RealtimeFanout,
{
    store: Arc<N>,
    fanout: Arc<F>,
}

impl<N, F> Clone for NotificationDelivery<N, F>
where
    N: NotificationRepository,
    F: RealtimeFanout,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fanout: Arc::clone(&self.fanout),
        }
    }
}

impl<N, F> NotificationDelivery<N, F>
where
    N: NotificationRepository,
    F: RealtimeFanout,
{
    /// Creates a delivery pipeline.
    #[must_use]
    pub const fn new(store: Arc<N>, fanout: Arc<F>) -> Self {
        Self { store, fanout }
    }

    /// Stores `notification`, then publishes it.
    ///
    /// # Errors
    ///
    /// Returns the store error; nothing is published in that case.
    pub async fn deliver(&self, notification: &Notification) -> NotificationStoreResult<()> {
        self.store.insert(notification).await?;
        self.publish(notification);
        Ok(())
    }

    /// Stores `notification` unless `key` was already used, publishing only
    /// what was written.
    ///
    /// # Errors
    ///
    /// Returns the store error; nothing is published in that case.
    pub async fn deliver_once(
        &self,
        notification: &Notification,
        key: &DedupKey,
    ) -> NotificationStoreResult<DedupOutcome> {
        let outcome = self.store.insert_deduplicated(notification, key).await?;
        match outcome {
            DedupOutcome::Inserted => self.publish(notification),
            DedupOutcome::AlreadySent => debug!(
                task_id = %key.task_id,
                recipient = %key.recipient,
                kind = %key.kind,
                "notification already sent"
            ),
        }
        Ok(outcome)
    }

    fn publish(&self, notification: &Notification) {
        let receivers = self.fanout.publish(notification);
        debug!(
            notification_id = %notification.id(),
            recipient = %notification.recipient(),
            kind = %notification.kind(),
            receivers,
            "notification stored"
        );
    }
}
