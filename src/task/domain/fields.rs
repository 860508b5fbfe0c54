//! Validated scalar fields of a task.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task title, non-empty after trimming and at most
/// [`TaskTitle::MAX_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Longest accepted title, in characters. Matches the `tasks.title`
    /// column width.
    pub const MAX_CHARS: usize = 255;

    /// Creates a validated title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the value is blank and
    /// [`TaskDomainError::TitleTooLong`] past [`Self::MAX_CHARS`].
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let length = trimmed.chars().count();
        if length > Self::MAX_CHARS {
            return Err(TaskDomainError::TitleTooLong {
                length,
                max: Self::MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task description, non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDescription(String);

impl TaskDescription {
    /// Creates a validated description.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyDescription`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyDescription);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the description as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task priority in the inclusive range 1–10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Lowest accepted priority.
    pub const MIN: u8 = 1;
    /// Highest accepted priority.
    pub const MAX: u8 = 10;

    /// Creates a validated priority.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PriorityOutOfRange`] outside 1–10.
    pub fn new(value: i64) -> Result<Self, TaskDomainError> {
        u8::try_from(value)
            .ok()
            .filter(|candidate| (Self::MIN..=Self::MAX).contains(candidate))
            .map(Self)
            .ok_or(TaskDomainError::PriorityOutOfRange(value))
    }

    /// Returns the numeric priority.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurrence interval in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecurrenceDays(u32);

impl RecurrenceDays {
    /// Creates a validated recurrence interval.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidRecurrence`] unless the value is a
    /// positive number of days.
    pub fn new(value: i64) -> Result<Self, TaskDomainError> {
        u32::try_from(value)
            .ok()
            .filter(|days| *days > 0)
            .map(Self)
            .ok_or(TaskDomainError::InvalidRecurrence(value))
    }

    /// Returns the number of days.
    #[must_use]
    pub const fn days(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RecurrenceDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
