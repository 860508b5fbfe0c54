//! Request and outcome types for the task lifecycle service.

use crate::task::domain::{
    MetadataChanges, OwnerTransfer, Priority, ProjectId, RecurrenceDays, RecurringFamily,
    StaffId, StaffRole, StatusChange, Task, TaskDescription, TaskDomainError, TaskDraft, TaskId,
    TaskTitle,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Raw input for creating a task or subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: String,
    priority: i64,
    deadline: DateTime<Utc>,
    collaborators: Vec<StaffId>,
    parent_id: Option<TaskId>,
    project_id: Option<ProjectId>,
    recurrence: Option<i64>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: i64,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            deadline,
            collaborators: Vec::new(),
            parent_id: None,
            project_id: None,
            recurrence: None,
        }
    }

    /// Adds collaborators besides the owner.
    #[must_use]
    pub fn with_collaborators(mut self, collaborators: impl IntoIterator<Item = StaffId>) -> Self {
        self.collaborators = collaborators.into_iter().collect();
        self
    }

    /// Makes the task a subtask of `parent_id`.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Links the task to a project.
    #[must_use]
    pub const fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the recurrence interval in days.
    #[must_use]
    pub const fn with_recurrence(mut self, days: i64) -> Self {
        self.recurrence = Some(days);
        self
    }

    /// Returns the requested parent.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskId> {
        self.parent_id
    }

    pub(super) fn into_draft(self, owner: StaffId) -> Result<TaskDraft, TaskDomainError> {
        Ok(TaskDraft {
            title: TaskTitle::new(self.title)?,
            description: TaskDescription::new(self.description)?,
            priority: Priority::new(self.priority)?,
            deadline: self.deadline,
            owner,
            collaborators: self.collaborators.into_iter().collect(),
            parent_id: self.parent_id,
            project_id: self.project_id,
            recurrence: self.recurrence.map(RecurrenceDays::new).transpose()?,
        })
    }
}

/// Raw owner-only metadata edits.
///
/// Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMetadataPatch {
    title: Option<String>,
    description: Option<String>,
    priority: Option<i64>,
    deadline: Option<DateTime<Utc>>,
    collaborators: Option<Vec<StaffId>>,
    owner: Option<StaffId>,
    recurrence: Option<Option<i64>>,
    project_id: Option<Option<ProjectId>>,
}

impl TaskMetadataPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Moves the deadline.
    #[must_use]
    pub const fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Replaces the collaborator set. The owner is always kept.
    #[must_use]
    pub fn collaborators(mut self, collaborators: impl IntoIterator<Item = StaffId>) -> Self {
        self.collaborators = Some(collaborators.into_iter().collect());
        self
    }

    /// Hands ownership to another staff member.
    #[must_use]
    pub const fn owner(mut self, owner: StaffId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets or clears the recurrence interval.
    #[must_use]
    pub const fn recurrence(mut self, days: Option<i64>) -> Self {
        self.recurrence = Some(days);
        self
    }

    /// Sets or clears the project link.
    #[must_use]
    pub const fn project(mut self, project_id: Option<ProjectId>) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub(super) const fn new_owner(&self) -> Option<StaffId> {
        self.owner
    }

    pub(super) fn into_changes(
        self,
        new_owner_role: Option<StaffRole>,
    ) -> Result<MetadataChanges, TaskDomainError> {
        let owner = self
            .owner
            .zip(new_owner_role)
            .map(|(new_owner, role)| OwnerTransfer {
                new_owner,
                new_owner_role: role,
            });
        Ok(MetadataChanges {
            title: self.title.map(TaskTitle::new).transpose()?,
            description: self.description.map(TaskDescription::new).transpose()?,
            priority: self.priority.map(Priority::new).transpose()?,
            deadline: self.deadline,
            collaborators: self
                .collaborators
                .map(|members| members.into_iter().collect::<BTreeSet<_>>()),
            owner,
            recurrence: self
                .recurrence
                .map(|days| days.map(RecurrenceDays::new).transpose())
                .transpose()?,
            project_id: self.project_id,
        })
    }
}

/// What happened to the recurrence chain after a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceReport {
    /// The update did not complete a recurring top-level task.
    NotApplicable,
    /// The next occurrence was generated and stored.
    Spawned(RecurringFamily),
    /// Generation failed; the status update itself stays committed.
    Failed(String),
}

/// Result of a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateOutcome {
    /// Task as stored after the update.
    pub task: Task,
    /// Previous and current status.
    pub change: StatusChange,
    /// Recurrence side effect.
    pub recurrence: RecurrenceReport,
}
