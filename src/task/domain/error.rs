//! Error types for task domain validation and parsing.

use super::{StaffId, StaffRole, TaskId, TaskStatus};
use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing or mutating tasks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The title is longer than storage accepts.
    #[error("task title is {length} characters long, the limit is {max}")]
    TitleTooLong {
        /// Characters in the trimmed title.
        length: usize,
        /// Accepted maximum.
        max: usize,
    },

    /// The description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// The priority lies outside 1–10.
    #[error("priority {0} is out of range, expected 1-10")]
    PriorityOutOfRange(i64),

    /// The recurrence interval is not a positive number of days.
    #[error("recurrence {0} is invalid, expected a positive number of days")]
    InvalidRecurrence(i64),

    /// The deadline is not strictly in the future.
    #[error("deadline {deadline} must be in the future")]
    DeadlineNotInFuture {
        /// Rejected deadline.
        deadline: DateTime<Utc>,
    },

    /// The requested status string is not a known status.
    #[error(transparent)]
    UnknownStatus(#[from] ParseTaskStatusError),

    /// Subtasks never carry their own recurrence.
    #[error("subtask {0} cannot carry a recurrence interval")]
    RecurrenceOnSubtask(TaskId),

    /// The actor is not a collaborator of the task.
    #[error("staff {actor} is not a collaborator on task {task_id}")]
    NotCollaborator {
        /// Target task.
        task_id: TaskId,
        /// Rejected actor.
        actor: StaffId,
    },

    /// The actor is not the owner of the task.
    #[error("staff {actor} does not own task {task_id}")]
    NotOwner {
        /// Target task.
        task_id: TaskId,
        /// Rejected actor.
        actor: StaffId,
    },

    /// The actor's role may not hand ownership to the target role.
    #[error("a {} cannot assign tasks to a {}", .assigner.as_str(), .assignee.as_str())]
    AssignmentNotPermitted {
        /// Role of the acting member.
        assigner: StaffRole,
        /// Role of the proposed owner.
        assignee: StaffRole,
    },

    /// A completed task never leaves `DONE`.
    #[error("task {task_id} is done and cannot move to {requested}")]
    TaskAlreadyDone {
        /// Target task.
        task_id: TaskId,
        /// Requested status.
        requested: TaskStatus,
    },

    /// The task still has subtasks that are not done.
    #[error("task {task_id} has {open} subtask(s) that are not done")]
    OpenSubtasks {
        /// Target task.
        task_id: TaskId,
        /// Number of unfinished subtasks.
        open: usize,
    },

    /// The parent is already done and accepts no new subtasks.
    #[error("task {0} is done and cannot take new subtasks")]
    ParentAlreadyDone(TaskId),

    /// The parent is itself a subtask.
    #[error("task {0} is a subtask and cannot have subtasks of its own")]
    NestedSubtask(TaskId),

    /// A subtask deadline would fall after the parent deadline.
    #[error("subtask deadline {subtask_deadline} is after parent deadline {parent_deadline}")]
    SubtaskDeadlineAfterParent {
        /// Proposed subtask deadline.
        subtask_deadline: DateTime<Utc>,
        /// Parent deadline.
        parent_deadline: DateTime<Utc>,
    },

    /// Some collaborators are not collaborators of the parent task.
    #[error("collaborators {missing:?} are not collaborators on parent task {parent_id}")]
    CollaboratorsNotSubset {
        /// Parent task.
        parent_id: TaskId,
        /// Offending staff members.
        missing: Vec<StaffId>,
    },
}

impl TaskDomainError {
    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyTitle
            | Self::TitleTooLong { .. }
            | Self::EmptyDescription
            | Self::PriorityOutOfRange(_)
            | Self::InvalidRecurrence(_)
            | Self::DeadlineNotInFuture { .. }
            | Self::UnknownStatus(_)
            | Self::RecurrenceOnSubtask(_) => ErrorKind::InvalidArgument,
            Self::NotCollaborator { .. }
            | Self::NotOwner { .. }
            | Self::AssignmentNotPermitted { .. } => ErrorKind::Forbidden,
            Self::TaskAlreadyDone { .. }
            | Self::OpenSubtasks { .. }
            | Self::ParentAlreadyDone(_)
            | Self::NestedSubtask(_)
            | Self::SubtaskDeadlineAfterParent { .. }
            | Self::CollaboratorsNotSubset { .. } => ErrorKind::PreconditionFailed,
        }
    }
}

/// Error returned while parsing task statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing staff roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown staff role: {0}")]
pub struct ParseStaffRoleError(pub String);
