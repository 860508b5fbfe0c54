//! Generation of the next occurrence of a completed recurring task.

use super::{GeneratedTask, StaffId, StaffRole, Task, TaskId, default_status_for_role};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::HashMap;
use thiserror::Error;

/// A freshly generated top-level task and its cloned subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringFamily {
    /// New top-level task.
    pub parent: Task,
    /// Clones of the original subtasks, re-parented to [`Self::parent`].
    pub subtasks: Vec<Task>,
}

/// Reasons a completed task cannot produce its next occurrence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The task is not a completed top-level task with a recurrence.
    #[error("task {0} is not a completed recurring top-level task")]
    NotDue(TaskId),

    /// The completed task has no completion timestamp to count from.
    #[error("task {0} has no completion date")]
    MissingCompletionDate(TaskId),

    /// The role of an owner could not be resolved.
    #[error("no directory role known for staff {0}")]
    UnknownOwnerRole(StaffId),

    /// Shifting a deadline overflowed the supported date range.
    #[error("deadline arithmetic overflowed for task {0}")]
    DeadlineOverflow(TaskId),
}

/// Builds the next occurrence of `completed`.
///
/// The new parent is due `recurrence` days after the completion date. Each
/// subtask keeps its original distance from the parent deadline. Statuses
/// are recomputed from each owner's role in `owner_roles`; start and
/// completion dates start unset.
///
/// # Errors
///
/// Returns [`RecurrenceError`] when `completed` is not due for recurrence,
/// lacks a completion date, an owner role is unknown, or the date arithmetic
/// overflows.
pub fn next_occurrence<S: std::hash::BuildHasher>(
    completed: &Task,
    subtasks: &[Task],
    owner_roles: &HashMap<StaffId, StaffRole, S>,
    clock: &impl Clock,
) -> Result<RecurringFamily, RecurrenceError> {
    let recurrence = completed
        .recurrence()
        .filter(|_| completed.recurrence_due())
        .ok_or(RecurrenceError::NotDue(completed.id()))?;
    let completed_at = completed
        .completed_date()
        .ok_or(RecurrenceError::MissingCompletionDate(completed.id()))?;

    let new_deadline = Duration::try_days(i64::from(recurrence.days()))
        .and_then(|interval| completed_at.checked_add_signed(interval))
        .ok_or(RecurrenceError::DeadlineOverflow(completed.id()))?;

    let parent = Task::generated(
        GeneratedTask {
            title: completed.title().clone(),
            description: completed.description().clone(),
            priority: completed.priority(),
            deadline: new_deadline,
            status: default_status_for_role(role_of(owner_roles, completed.owner())?),
            owner: completed.owner(),
            collaborators: completed.collaborators().clone(),
            parent_id: None,
            project_id: completed.project_id(),
            recurrence: Some(recurrence),
        },
        clock,
    );

    let cloned = subtasks
        .iter()
        .map(|subtask| {
            let deadline = shifted_subtask_deadline(completed, subtask, new_deadline)?;
            Ok(Task::generated(
                GeneratedTask {
                    title: subtask.title().clone(),
                    description: subtask.description().clone(),
                    priority: subtask.priority(),
                    deadline,
                    status: default_status_for_role(role_of(owner_roles, subtask.owner())?),
                    owner: subtask.owner(),
                    collaborators: subtask.collaborators().clone(),
                    parent_id: Some(parent.id()),
                    project_id: subtask.project_id(),
                    recurrence: None,
                },
                clock,
            ))
        })
        .collect::<Result<Vec<_>, RecurrenceError>>()?;

    Ok(RecurringFamily {
        parent,
        subtasks: cloned,
    })
}

fn shifted_subtask_deadline(
    original_parent: &Task,
    subtask: &Task,
    new_parent_deadline: DateTime<Utc>,
) -> Result<DateTime<Utc>, RecurrenceError> {
    let offset = original_parent.deadline() - subtask.deadline();
    new_parent_deadline
        .checked_sub_signed(offset)
        .ok_or(RecurrenceError::DeadlineOverflow(subtask.id()))
}

fn role_of<S: std::hash::BuildHasher>(
    owner_roles: &HashMap<StaffId, StaffRole, S>,
    staff: StaffId,
) -> Result<StaffRole, RecurrenceError> {
    owner_roles
        .get(&staff)
        .copied()
        .ok_or(RecurrenceError::UnknownOwnerRole(staff))
}
