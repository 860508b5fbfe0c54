//! Per-staff notification preferences.

use super::{NotificationDomainError, NotificationKind};
use crate::task::domain::StaffId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Distinct positive reminder offsets, kept in descending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct ReminderDays(Vec<u32>);

impl ReminderDays {
    /// Builds a reminder set, dropping duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationDomainError::InvalidReminderDay`] for zero,
    /// negative or oversized entries.
    pub fn new(days: impl IntoIterator<Item = i64>) -> Result<Self, NotificationDomainError> {
        let distinct = days
            .into_iter()
            .map(|day| {
                u32::try_from(day)
                    .ok()
                    .filter(|value| *value > 0)
                    .ok_or(NotificationDomainError::InvalidReminderDay(day))
            })
            .collect::<Result<BTreeSet<u32>, _>>()?;
        Ok(Self(distinct.into_iter().rev().collect()))
    }

    /// Returns the offsets, largest first.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Returns `true` when `days` is one of the offsets.
    #[must_use]
    pub fn contains(&self, days: u32) -> bool {
        self.0.contains(&days)
    }

    /// Returns `true` when no offsets are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ReminderDays {
    fn default() -> Self {
        Self(vec![7, 3, 1])
    }
}

impl TryFrom<Vec<i64>> for ReminderDays {
    type Error = NotificationDomainError;

    fn try_from(value: Vec<i64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReminderDays> for Vec<i64> {
    fn from(days: ReminderDays) -> Self {
        days.0.into_iter().map(i64::from).collect()
    }
}

/// Parses a comma-separated list such as `"14,7,3,1"`.
impl FromStr for ReminderDays {
    type Err = NotificationDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse::<i64>()
                    .map_err(|_| NotificationDomainError::MalformedReminderDay(entry.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }
}

/// Notification settings for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    /// Staff member the settings belong to.
    pub staff_id: StaffId,
    /// Whether scheduled deadline reminders are sent.
    pub deadline_reminders: bool,
    /// Offsets at which reminders fire.
    pub reminder_days: ReminderDays,
    /// Whether status change notifications are sent.
    pub task_status_updates: bool,
    /// Whether due date change notifications are sent.
    pub due_date_changes: bool,
}

impl NotificationPreference {
    /// Default settings: everything on, reminders at 7, 3 and 1 days.
    #[must_use]
    pub fn defaults_for(staff_id: StaffId) -> Self {
        Self {
            staff_id,
            deadline_reminders: true,
            reminder_days: ReminderDays::default(),
            task_status_updates: true,
            due_date_changes: true,
        }
    }

    /// Returns `true` when the staff member wants notifications of `kind`.
    ///
    /// Overdue, comment and mention notifications cannot be switched off.
    #[must_use]
    pub fn wants(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::DeadlineReminder { days } => {
                self.deadline_reminders && self.reminder_days.contains(days)
            }
            NotificationKind::TaskStatusUpdated => self.task_status_updates,
            NotificationKind::DueDateChanged => self.due_date_changes,
            _ => true,
        }
    }

    /// Reminder offsets that are active for this staff member.
    #[must_use]
    pub fn active_reminder_days(&self) -> &[u32] {
        if self.deadline_reminders {
            self.reminder_days.as_slice()
        } else {
            &[]
        }
    }
}

/// Partial update of a [`NotificationPreference`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePatch {
    /// New reminder toggle.
    pub deadline_reminders: Option<bool>,
    /// New reminder offsets.
    pub reminder_days: Option<ReminderDays>,
    /// New status update toggle.
    pub task_status_updates: Option<bool>,
    /// New due date change toggle.
    pub due_date_changes: Option<bool>,
}

impl PreferencePatch {
    /// Applies the set fields to `preference`.
    pub fn apply_to(self, preference: &mut NotificationPreference) {
        if let Some(enabled) = self.deadline_reminders {
            preference.deadline_reminders = enabled;
        }
        if let Some(days) = self.reminder_days {
            preference.reminder_days = days;
        }
        if let Some(enabled) = self.task_status_updates {
            preference.task_status_updates = enabled;
        }
        if let Some(enabled) = self.due_date_changes {
            preference.due_date_changes = enabled;
        }
    }
}
