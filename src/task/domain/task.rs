//! Task aggregate root and its status state machine.

use super::{
    ActorContext, ParseTaskStatusError, Priority, ProjectId, RecurrenceDays, StaffId, StaffRole,
    TaskDescription, TaskDomainError, TaskId, TaskTitle, can_assign_across_role,
    default_status_for_role,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created by an elevated role and waiting for someone to pick it up.
    Unassigned,
    /// Work is in progress.
    Ongoing,
    /// Work is awaiting review.
    UnderReview,
    /// Work is complete. Terminal for the row.
    Done,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Ongoing => "ongoing",
            Self::UnderReview => "under_review",
            Self::Done => "done",
        }
    }

    /// Returns `true` when no further transitions are accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "unassigned" => Ok(Self::Unassigned),
            "ongoing" => Ok(Self::Ongoing),
            "under_review" => Ok(Self::UnderReview),
            "done" => Ok(Self::Done),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task attribute touched by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    /// Title text.
    Title,
    /// Description text.
    Description,
    /// Priority value.
    Priority,
    /// Deadline timestamp.
    Deadline,
    /// Lifecycle status.
    Status,
    /// Collaborator set.
    Collaborators,
    /// Owning staff member.
    Owner,
    /// Recurrence interval.
    Recurrence,
    /// Project link.
    Project,
}

impl TaskField {
    /// Returns the canonical field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Priority => "priority",
            Self::Deadline => "deadline",
            Self::Status => "status",
            Self::Collaborators => "collaborators",
            Self::Owner => "owner",
            Self::Recurrence => "recurrence",
            Self::Project => "project_id",
        }
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Task title.
    pub title: TaskTitle,
    /// Task description.
    pub description: TaskDescription,
    /// Task priority.
    pub priority: Priority,
    /// Deadline; must be in the future at creation.
    pub deadline: DateTime<Utc>,
    /// Owning staff member.
    pub owner: StaffId,
    /// Collaborators besides the owner. The owner is always added.
    pub collaborators: BTreeSet<StaffId>,
    /// Parent task for subtasks.
    pub parent_id: Option<TaskId>,
    /// Linked project.
    pub project_id: Option<ProjectId>,
    /// Recurrence interval. Ignored for subtasks.
    pub recurrence: Option<RecurrenceDays>,
}

/// Owner reassignment carried by a metadata update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerTransfer {
    /// Proposed owner.
    pub new_owner: StaffId,
    /// Directory role of the proposed owner.
    pub new_owner_role: StaffRole,
}

/// Validated metadata changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataChanges {
    /// New title.
    pub title: Option<TaskTitle>,
    /// New description.
    pub description: Option<TaskDescription>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New deadline; must be in the future.
    pub deadline: Option<DateTime<Utc>>,
    /// Replacement collaborator set. The owner is always kept.
    pub collaborators: Option<BTreeSet<StaffId>>,
    /// Ownership transfer.
    pub owner: Option<OwnerTransfer>,
    /// New recurrence; `Some(None)` clears it.
    pub recurrence: Option<Option<RecurrenceDays>>,
    /// New project link; `Some(None)` clears it.
    pub project_id: Option<Option<ProjectId>>,
}

/// Result of applying a status request to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Status stored before the request.
    pub previous: TaskStatus,
    /// Status stored after the request.
    pub current: TaskStatus,
}

impl StatusChange {
    /// Returns `true` when the request left the status unchanged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }

    /// Returns `true` when the request moved the task into `DONE`.
    #[must_use]
    pub fn entered_done(&self) -> bool {
        !self.is_noop() && self.current == TaskStatus::Done
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: TaskTitle,
    description: TaskDescription,
    priority: Priority,
    deadline: DateTime<Utc>,
    start_date: Option<DateTime<Utc>>,
    completed_date: Option<DateTime<Utc>>,
    recurrence: Option<RecurrenceDays>,
    status: TaskStatus,
    owner: StaffId,
    collaborators: BTreeSet<StaffId>,
    parent_id: Option<TaskId>,
    project_id: Option<ProjectId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted description.
    pub description: TaskDescription,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// First time the task left `UNASSIGNED`.
    pub start_date: Option<DateTime<Utc>>,
    /// Time the task entered `DONE`.
    pub completed_date: Option<DateTime<Utc>>,
    /// Persisted recurrence interval.
    pub recurrence: Option<RecurrenceDays>,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted owner.
    pub owner: StaffId,
    /// Persisted collaborators.
    pub collaborators: BTreeSet<StaffId>,
    /// Persisted parent link.
    pub parent_id: Option<TaskId>,
    /// Persisted project link.
    pub project_id: Option<ProjectId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    pub version: u64,
}

/// Fields of a task generated by recurrence rather than by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeneratedTask {
    pub(crate) title: TaskTitle,
    pub(crate) description: TaskDescription,
    pub(crate) priority: Priority,
    pub(crate) deadline: DateTime<Utc>,
    pub(crate) status: TaskStatus,
    pub(crate) owner: StaffId,
    pub(crate) collaborators: BTreeSet<StaffId>,
    pub(crate) parent_id: Option<TaskId>,
    pub(crate) project_id: Option<ProjectId>,
    pub(crate) recurrence: Option<RecurrenceDays>,
}

impl Task {
    /// Creates a task from a validated draft.
    ///
    /// The initial status follows the owner's role. Subtasks must be given
    /// their parent so hierarchy invariants can be checked; a subtask's
    /// recurrence is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::DeadlineNotInFuture`] for past deadlines,
    /// [`TaskDomainError::ParentAlreadyDone`] under a completed parent, or a
    /// hierarchy error when the parent placement is invalid.
    pub fn create(
        draft: TaskDraft,
        owner_role: StaffRole,
        parent: Option<&Self>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let now = clock.utc();
        ensure_future(draft.deadline, now)?;

        let mut collaborators = draft.collaborators;
        collaborators.insert(draft.owner);

        let (parent_id, recurrence) = match parent {
            Some(parent_task) => {
                if parent_task.status.is_terminal() {
                    return Err(TaskDomainError::ParentAlreadyDone(parent_task.id));
                }
                check_subtask_placement(parent_task, draft.deadline, &collaborators)?;
                (Some(parent_task.id), None)
            }
            None => (None, draft.recurrence),
        };

        Ok(Self {
            id: TaskId::new(),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            deadline: draft.deadline,
            start_date: None,
            completed_date: None,
            recurrence,
            status: default_status_for_role(owner_role),
            owner: draft.owner,
            collaborators,
            parent_id,
            project_id: draft.project_id,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub(crate) fn generated(fields: GeneratedTask, clock: &impl Clock) -> Self {
        let now = clock.utc();
        let mut collaborators = fields.collaborators;
        collaborators.insert(fields.owner);
        Self {
            id: TaskId::new(),
            title: fields.title,
            description: fields.description,
            priority: fields.priority,
            deadline: fields.deadline,
            start_date: None,
            completed_date: None,
            recurrence: fields.recurrence,
            status: fields.status,
            owner: fields.owner,
            collaborators,
            parent_id: fields.parent_id,
            project_id: fields.project_id,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            deadline: data.deadline,
            start_date: data.start_date,
            completed_date: data.completed_date,
            recurrence: data.recurrence,
            status: data.status,
            owner: data.owner,
            collaborators: data.collaborators,
            parent_id: data.parent_id,
            project_id: data.project_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
            version: data.version,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub const fn description(&self) -> &TaskDescription {
        &self.description
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns when the task first left `UNASSIGNED`.
    #[must_use]
    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Returns when the task entered `DONE`.
    #[must_use]
    pub const fn completed_date(&self) -> Option<DateTime<Utc>> {
        self.completed_date
    }

    /// Returns the recurrence interval.
    #[must_use]
    pub const fn recurrence(&self) -> Option<RecurrenceDays> {
        self.recurrence
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the owner.
    #[must_use]
    pub const fn owner(&self) -> StaffId {
        self.owner
    }

    /// Returns the collaborator set, owner included.
    #[must_use]
    pub const fn collaborators(&self) -> &BTreeSet<StaffId> {
        &self.collaborators
    }

    /// Returns the parent task for subtasks.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskId> {
        self.parent_id
    }

    /// Returns the linked project.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the version this copy was read at.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` for subtasks.
    #[must_use]
    pub const fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Returns `true` when `staff` is a collaborator (owner included).
    #[must_use]
    pub fn is_collaborator(&self, staff: StaffId) -> bool {
        self.collaborators.contains(&staff)
    }

    /// Returns `true` once a completed top-level task should spawn its next
    /// occurrence.
    #[must_use]
    pub const fn recurrence_due(&self) -> bool {
        self.status.is_terminal() && self.recurrence.is_some() && self.parent_id.is_none()
    }

    /// Returns a copy stamped with the version assigned by storage.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Applies a status request from `actor`.
    ///
    /// Side effects derive from the previously stored status: leaving
    /// `UNASSIGNED` stamps `start_date` once, entering `DONE` stamps
    /// `completed_date`. Requesting the current status changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotCollaborator`] for outsiders,
    /// [`TaskDomainError::TaskAlreadyDone`] when leaving `DONE`, and
    /// [`TaskDomainError::OpenSubtasks`] when completing a parent whose
    /// subtasks are not all done.
    pub fn apply_status(
        &mut self,
        requested: TaskStatus,
        actor: StaffId,
        subtasks: &[Self],
        clock: &impl Clock,
    ) -> Result<StatusChange, TaskDomainError> {
        if !self.is_collaborator(actor) {
            return Err(TaskDomainError::NotCollaborator {
                task_id: self.id,
                actor,
            });
        }

        let previous = self.status;
        if previous == requested {
            return Ok(StatusChange {
                previous,
                current: previous,
            });
        }
        if previous.is_terminal() {
            return Err(TaskDomainError::TaskAlreadyDone {
                task_id: self.id,
                requested,
            });
        }
        if requested == TaskStatus::Done {
            let open = subtasks
                .iter()
                .filter(|subtask| subtask.status != TaskStatus::Done)
                .count();
            if open > 0 {
                return Err(TaskDomainError::OpenSubtasks {
                    task_id: self.id,
                    open,
                });
            }
        }

        let now = clock.utc();
        if previous == TaskStatus::Unassigned && self.start_date.is_none() {
            self.start_date = Some(now);
        }
        if requested == TaskStatus::Done {
            self.completed_date = Some(now);
        }
        self.status = requested;
        self.updated_at = now;

        Ok(StatusChange {
            previous,
            current: requested,
        })
    }

    /// Applies owner-only metadata changes.
    ///
    /// Every change is validated before any field is written. Returns the
    /// fields whose values actually changed, in [`TaskField`] order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotOwner`] for non-owners,
    /// [`TaskDomainError::AssignmentNotPermitted`] for disallowed ownership
    /// transfers, validation errors for past deadlines or subtask
    /// recurrence, and hierarchy errors when the result would break the
    /// parent/subtask invariants.
    pub fn apply_metadata(
        &mut self,
        changes: MetadataChanges,
        actor: &ActorContext,
        parent: Option<&Self>,
        subtasks: &[Self],
        clock: &impl Clock,
    ) -> Result<Vec<TaskField>, TaskDomainError> {
        if actor.staff_id() != self.owner {
            return Err(TaskDomainError::NotOwner {
                task_id: self.id,
                actor: actor.staff_id(),
            });
        }
        let now = clock.utc();

        let owner = match changes.owner {
            Some(transfer) if transfer.new_owner != self.owner => {
                if !can_assign_across_role(actor.role(), transfer.new_owner_role) {
                    return Err(TaskDomainError::AssignmentNotPermitted {
                        assigner: actor.role(),
                        assignee: transfer.new_owner_role,
                    });
                }
                transfer.new_owner
            }
            _ => self.owner,
        };

        let mut collaborators = changes
            .collaborators
            .unwrap_or_else(|| self.collaborators.clone());
        collaborators.insert(owner);

        let deadline = changes.deadline.unwrap_or(self.deadline);
        if deadline != self.deadline {
            ensure_future(deadline, now)?;
        }

        let recurrence = changes.recurrence.unwrap_or(self.recurrence);
        if recurrence.is_some() && recurrence != self.recurrence && self.is_subtask() {
            return Err(TaskDomainError::RecurrenceOnSubtask(self.id));
        }

        if let Some(parent_task) = parent {
            check_subtask_placement(parent_task, deadline, &collaborators)?;
        }
        for subtask in subtasks {
            check_subtask_fits(self.id, deadline, &collaborators, subtask)?;
        }

        let mut changed = Vec::new();
        if let Some(title) = changes.title.filter(|value| *value != self.title) {
            self.title = title;
            changed.push(TaskField::Title);
        }
        if let Some(description) = changes
            .description
            .filter(|value| *value != self.description)
        {
            self.description = description;
            changed.push(TaskField::Description);
        }
        if let Some(priority) = changes.priority.filter(|value| *value != self.priority) {
            self.priority = priority;
            changed.push(TaskField::Priority);
        }
        if deadline != self.deadline {
            self.deadline = deadline;
            changed.push(TaskField::Deadline);
        }
        if collaborators != self.collaborators {
            self.collaborators = collaborators;
            changed.push(TaskField::Collaborators);
        }
        if owner != self.owner {
            self.owner = owner;
            changed.push(TaskField::Owner);
        }
        if recurrence != self.recurrence {
            self.recurrence = recurrence;
            changed.push(TaskField::Recurrence);
        }
        if let Some(project_id) = changes.project_id.filter(|value| *value != self.project_id) {
            self.project_id = project_id;
            changed.push(TaskField::Project);
        }

        if !changed.is_empty() {
            self.updated_at = now;
        }
        Ok(changed)
    }
}

fn ensure_future(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), TaskDomainError> {
    if deadline <= now {
        return Err(TaskDomainError::DeadlineNotInFuture { deadline });
    }
    Ok(())
}

/// Checks that a subtask with the given deadline and collaborators may sit
/// under `parent`.
fn check_subtask_placement(
    parent: &Task,
    deadline: DateTime<Utc>,
    collaborators: &BTreeSet<StaffId>,
) -> Result<(), TaskDomainError> {
    if parent.is_subtask() {
        return Err(TaskDomainError::NestedSubtask(parent.id));
    }
    if deadline > parent.deadline {
        return Err(TaskDomainError::SubtaskDeadlineAfterParent {
            subtask_deadline: deadline,
            parent_deadline: parent.deadline,
        });
    }
    let missing: Vec<StaffId> = collaborators
        .difference(&parent.collaborators)
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(TaskDomainError::CollaboratorsNotSubset {
            parent_id: parent.id,
            missing,
        });
    }
    Ok(())
}

/// Checks that an existing subtask still fits a parent whose deadline or
/// collaborators are about to change.
fn check_subtask_fits(
    parent_id: TaskId,
    parent_deadline: DateTime<Utc>,
    parent_collaborators: &BTreeSet<StaffId>,
    subtask: &Task,
) -> Result<(), TaskDomainError> {
    if subtask.deadline > parent_deadline {
        return Err(TaskDomainError::SubtaskDeadlineAfterParent {
            subtask_deadline: subtask.deadline,
            parent_deadline,
        });
    }
    let missing: Vec<StaffId> = subtask
        .collaborators
        .difference(parent_collaborators)
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(TaskDomainError::CollaboratorsNotSubset { parent_id, missing });
    }
    Ok(())
}
