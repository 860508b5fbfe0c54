//! Repository ports for notifications, the dedup log and preferences.

use crate::error::ErrorKind;
use crate::notification::domain::{
    DedupKey, DedupLogEntry, Notification, NotificationId, NotificationPreference,
};
use crate::task::domain::StaffId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification storage operations.
pub type NotificationStoreResult<T> = Result<T, NotificationStoreError>;

/// Whether a deduplicated insert wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Notification and dedup entry were written together.
    Inserted,
    /// An entry for the key already existed; nothing was written.
    AlreadySent,
}

/// Notification persistence contract.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Stores a notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn insert(&self, notification: &Notification) -> NotificationStoreResult<()>;

    /// Stores a notification together with its dedup entry, or neither
    /// when the key was already used.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails. An
    /// existing key is [`DedupOutcome::AlreadySent`], not an error.
    async fn insert_deduplicated(
        &self,
        notification: &Notification,
        key: &DedupKey,
    ) -> NotificationStoreResult<DedupOutcome>;

    /// Looks up a dedup entry.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn find_dedup(&self, key: &DedupKey) -> NotificationStoreResult<Option<DedupLogEntry>>;

    /// Finds a notification by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn find(&self, id: NotificationId) -> NotificationStoreResult<Option<Notification>>;

    /// Lists a recipient's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn list_for(
        &self,
        recipient: StaffId,
        limit: usize,
    ) -> NotificationStoreResult<Vec<Notification>>;

    /// Counts a recipient's unread notifications.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn unread_count(&self, recipient: StaffId) -> NotificationStoreResult<u64>;

    /// Persists the read flag and read timestamp of `notification`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError::NotFound`] if the notification is
    /// gone.
    async fn save_read_state(&self, notification: &Notification) -> NotificationStoreResult<()>;

    /// Marks every unread notification of `recipient` read at `read_at`.
    /// Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn mark_all_read(
        &self,
        recipient: StaffId,
        read_at: DateTime<Utc>,
    ) -> NotificationStoreResult<u64>;
}

/// Preference persistence contract.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Returns the preferences of `staff_id`, creating defaults on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn load_or_default(
        &self,
        staff_id: StaffId,
    ) -> NotificationStoreResult<NotificationPreference>;

    /// Inserts or replaces preferences.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationStoreError`] when persistence fails.
    async fn upsert(&self, preference: &NotificationPreference) -> NotificationStoreResult<()>;
}

/// Errors returned by notification and preference stores.
#[derive(Debug, Clone, Error)]
pub enum NotificationStoreError {
    /// The notification does not exist.
    #[error("notification not found: {0}")]
    NotFound(NotificationId),

    /// A notification with the same identifier already exists.
    #[error("duplicate notification identifier: {0}")]
    DuplicateNotification(NotificationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateNotification(_) | Self::Persistence(_) => ErrorKind::Internal,
        }
    }
}

impl From<diesel::result::Error> for NotificationStoreError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
