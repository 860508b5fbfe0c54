//! Closed set of notification kinds and their storage identifiers.

use super::NotificationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a notification is about.
///
/// Storage identifiers match the legacy strings, including the singular
/// `deadline_1_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NotificationKind {
    /// Deadline is `days` calendar days away.
    DeadlineReminder {
        /// Days before the deadline.
        days: u32,
    },
    /// Deadline has passed.
    OverdueTask,
    /// Status changed.
    TaskStatusUpdated,
    /// Deadline moved.
    DueDateChanged,
    /// Collaborator set changed.
    CollaboratorsChanged,
    /// Priority changed.
    PriorityUpdated,
    /// Description changed.
    DescriptionUpdated,
    /// Title changed.
    NameUpdated,
    /// Any other task edit.
    TaskUpdated,
    /// A comment was added, edited or removed.
    CommentsUpdated,
    /// The recipient was mentioned.
    Mention,
}

const DEADLINE_PREFIX: &str = "deadline_";

impl NotificationKind {
    /// Stable identifier for the fixed kinds. Reminders have none because
    /// their identifier embeds the day count.
    const fn fixed_str(self) -> Option<&'static str> {
        match self {
            Self::DeadlineReminder { .. } => None,
            Self::OverdueTask => Some("overdue_task"),
            Self::TaskStatusUpdated => Some("task_status_updated"),
            Self::DueDateChanged => Some("due_date_changed"),
            Self::CollaboratorsChanged => Some("collaborators_changed"),
            Self::PriorityUpdated => Some("priority_updated"),
            Self::DescriptionUpdated => Some("description_updated"),
            Self::NameUpdated => Some("name_updated"),
            Self::TaskUpdated => Some("task_updated"),
            Self::CommentsUpdated => Some("comments_updated"),
            Self::Mention => Some("mention"),
        }
    }

    const FIXED: [Self; 10] = [
        Self::OverdueTask,
        Self::TaskStatusUpdated,
        Self::DueDateChanged,
        Self::CollaboratorsChanged,
        Self::PriorityUpdated,
        Self::DescriptionUpdated,
        Self::NameUpdated,
        Self::TaskUpdated,
        Self::CommentsUpdated,
        Self::Mention,
    ];
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DeadlineReminder { days: 1 } => f.write_str("deadline_1_day"),
            Self::DeadlineReminder { days } => write!(f, "{DEADLINE_PREFIX}{days}_days"),
            fixed => f.write_str(fixed.fixed_str().unwrap_or_default()),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = NotificationDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if let Some(kind) = Self::FIXED
            .into_iter()
            .find(|kind| kind.fixed_str() == Some(value))
        {
            return Ok(kind);
        }
        if value == "deadline_1_day" {
            return Ok(Self::DeadlineReminder { days: 1 });
        }
        value
            .strip_prefix(DEADLINE_PREFIX)
            .and_then(|rest| rest.strip_suffix("_days"))
            .and_then(|days| days.parse::<u32>().ok())
            .filter(|days| *days > 1)
            .map(|days| Self::DeadlineReminder { days })
            .ok_or_else(|| NotificationDomainError::UnknownKind(value.to_owned()))
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = NotificationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}
