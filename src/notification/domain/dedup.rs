//! Keys guarding once-only scheduled notifications.

use super::NotificationKind;
use crate::task::domain::{StaffId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a scheduled notification that may be sent only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    /// Task the notification is about.
    pub task_id: TaskId,
    /// Recipient.
    pub recipient: StaffId,
    /// Kind of notification.
    pub kind: NotificationKind,
}

impl DedupKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(task_id: TaskId, recipient: StaffId, kind: NotificationKind) -> Self {
        Self {
            task_id,
            recipient,
            kind,
        }
    }
}

/// Record that the notification for `key` went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupLogEntry {
    /// Guarded key.
    pub key: DedupKey,
    /// When the guarded notification was stored.
    pub sent_at: DateTime<Utc>,
}
