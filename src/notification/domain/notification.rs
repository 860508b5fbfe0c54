//! The notification aggregate and its read state.

use super::{CommentId, NotificationId, NotificationKind};
use crate::task::domain::{ProjectId, StaffId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Rendered title and message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
}

/// Entities a notification points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntities {
    /// Related task.
    pub task_id: Option<TaskId>,
    /// Related project.
    pub project_id: Option<ProjectId>,
    /// Related comment.
    pub comment_id: Option<CommentId>,
}

impl RelatedEntities {
    /// Points at a task and, when linked, its project.
    #[must_use]
    pub const fn task(task_id: TaskId, project_id: Option<ProjectId>) -> Self {
        Self {
            task_id: Some(task_id),
            project_id,
            comment_id: None,
        }
    }
}

/// A message addressed to one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    recipient: StaffId,
    kind: NotificationKind,
    title: String,
    message: String,
    related: RelatedEntities,
    is_read: bool,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

/// Persisted notification state used to reconstruct aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedNotificationData {
    /// Identifier.
    pub id: NotificationId,
    /// Recipient.
    pub recipient: StaffId,
    /// Kind.
    pub kind: NotificationKind,
    /// Title.
    pub title: String,
    /// Message.
    pub message: String,
    /// Related entities.
    pub related: RelatedEntities,
    /// Read flag.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Read timestamp.
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Creates an unread notification.
    #[must_use]
    pub fn new(
        recipient: StaffId,
        kind: NotificationKind,
        content: RenderedContent,
        related: RelatedEntities,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient,
            kind,
            title: content.title,
            message: content.message,
            related,
            is_read: false,
            created_at: clock.utc(),
            read_at: None,
        }
    }

    /// Reconstructs a notification from storage.
    #[must_use]
    pub fn from_persisted(data: PersistedNotificationData) -> Self {
        Self {
            id: data.id,
            recipient: data.recipient,
            kind: data.kind,
            title: data.title,
            message: data.message,
            related: data.related,
            is_read: data.is_read,
            created_at: data.created_at,
            read_at: data.read_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> NotificationId {
        self.id
    }

    /// Returns the recipient.
    #[must_use]
    pub const fn recipient(&self) -> StaffId {
        self.recipient
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the related entities.
    #[must_use]
    pub const fn related(&self) -> RelatedEntities {
        self.related
    }

    /// Returns `true` once read.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.is_read
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the notification was read.
    #[must_use]
    pub const fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    /// Marks the notification read. Returns `false` if it already was.
    pub fn mark_read(&mut self, clock: &impl Clock) -> bool {
        self.mark_read_at(clock.utc())
    }

    /// Marks the notification read at `read_at`. Returns `false` if it
    /// already was.
    pub fn mark_read_at(&mut self, read_at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(read_at);
        true
    }

    /// Marks the notification unread. Returns `false` if it already was.
    pub fn mark_unread(&mut self) -> bool {
        if !self.is_read {
            return false;
        }
        self.is_read = false;
        self.read_at = None;
        true
    }
}
