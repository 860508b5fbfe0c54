//! Choice of a single notification kind for a task edit.

use super::NotificationKind;
use crate::task::domain::TaskField;
use std::collections::BTreeSet;

/// Kinds in precedence order with the field that triggers each.
const PRECEDENCE: [(TaskField, NotificationKind); 6] = [
    (TaskField::Collaborators, NotificationKind::CollaboratorsChanged),
    (TaskField::Deadline, NotificationKind::DueDateChanged),
    (TaskField::Status, NotificationKind::TaskStatusUpdated),
    (TaskField::Priority, NotificationKind::PriorityUpdated),
    (TaskField::Description, NotificationKind::DescriptionUpdated),
    (TaskField::Title, NotificationKind::NameUpdated),
];

/// Picks the notification kind for a set of changed fields.
///
/// Collaborators outrank deadline, then status, priority, description and
/// title. Anything else is a generic [`NotificationKind::TaskUpdated`].
#[must_use]
pub fn select_kind(changed: &BTreeSet<TaskField>) -> NotificationKind {
    PRECEDENCE
        .iter()
        .find(|(field, _)| changed.contains(field))
        .map_or(NotificationKind::TaskUpdated, |(_, kind)| *kind)
}
