//! Service-level errors for the notification context.

use crate::error::ErrorKind;
use crate::notification::{
    domain::{NotificationDomainError, NotificationId},
    ports::NotificationStoreError,
};
use crate::task::{domain::TaskId, ports::TaskRepositoryError};
use thiserror::Error;

/// Errors returned by notification services.
#[derive(Debug, Error)]
pub enum NotificationServiceError {
    /// Domain validation or template rendering failed.
    #[error(transparent)]
    Domain(#[from] NotificationDomainError),
    /// Notification or preference storage failed.
    #[error(transparent)]
    Store(#[from] NotificationStoreError),
    /// Task storage failed.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),
    /// The task named by an event does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The notification does not exist for the requesting recipient.
    #[error("notification not found: {0}")]
    NotFound(NotificationId),
}

impl NotificationServiceError {
    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Tasks(err) => err.kind(),
            Self::TaskNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for notification services.
pub type NotificationServiceResult<T> = Result<T, NotificationServiceError>;
