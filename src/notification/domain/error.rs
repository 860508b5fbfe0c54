//! Domain errors for notifications and preferences.

use crate::error::ErrorKind;
use thiserror::Error;

/// Errors raised while building notification domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationDomainError {
    /// A reminder offset was zero, negative or too large.
    #[error("reminder day {0} is invalid, expected a positive number of days")]
    InvalidReminderDay(i64),

    /// A reminder list entry was not a number.
    #[error("reminder day list entry {0:?} is not a number")]
    MalformedReminderDay(String),

    /// A stored kind identifier is not recognised.
    #[error("unknown notification kind: {0}")]
    UnknownKind(String),

    /// A title or message template failed to render.
    #[error("notification template {name} failed: {reason}")]
    Template {
        /// Template name.
        name: String,
        /// Renderer error text.
        reason: String,
    },
}

impl NotificationDomainError {
    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidReminderDay(_)
            | Self::MalformedReminderDay(_)
            | Self::UnknownKind(_) => ErrorKind::InvalidArgument,
            Self::Template { .. } => ErrorKind::Internal,
        }
    }
}
