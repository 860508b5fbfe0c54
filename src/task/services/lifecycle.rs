//! Service layer for task creation, status transitions and metadata edits.

use super::requests::{
    CreateTaskRequest, RecurrenceReport, StatusUpdateOutcome, TaskMetadataPatch,
};
use crate::config::EngineConfig;
use crate::error::ErrorKind;
use crate::task::{
    domain::{
        ActorContext, RecurrenceError, RecurringFamily, StaffId, StaffRole, Task,
        TaskDomainError, TaskDraft, TaskField, TaskId, TaskStatus, next_occurrence,
    },
    ports::{
        DirectoryError, StaffDirectory, TaskChange, TaskEventSink, TaskRepository,
        TaskRepositoryError,
    },
};
use mockable::Clock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Staff directory lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// Next occurrence could not be generated.
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The requested parent task does not exist.
    #[error("parent task not found: {0}")]
    ParentNotFound(TaskId),
    /// Concurrent writers kept winning the race for this task.
    #[error("task {task_id} kept changing concurrently; gave up after {attempts} attempts")]
    ConflictRetriesExhausted {
        /// Contended task.
        task_id: TaskId,
        /// Attempts made.
        attempts: u32,
    },
}

impl TaskLifecycleError {
    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(err) => err.kind(),
            Self::Directory(err) => err.kind(),
            Self::Recurrence(_) => ErrorKind::Internal,
            Self::NotFound(_) | Self::ParentNotFound(_) => ErrorKind::NotFound,
            Self::ConflictRetriesExhausted { .. } => ErrorKind::Conflict,
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Tunables for the lifecycle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Re-reads allowed after an optimistic version conflict.
    pub transition_retries: u32,
    /// Upper bound on a single event sink call.
    pub notifier_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for LifecycleSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            transition_retries: config.transition_retries,
            notifier_timeout: config.notifier_timeout(),
        }
    }
}

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, D, E, C>
where
    R: TaskRepository,
    D: StaffDirectory,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    directory: Arc<D>,
    events: Arc<E>,
    clock: Arc<C>,
    settings: LifecycleSettings,
}

impl<R, D, E, C> TaskLifecycleService<R, D, E, C>
where
    R: TaskRepository,
    D: StaffDirectory,
    E: TaskEventSink,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service with default settings.
    #[must_use]
    pub fn new(repository: Arc<R>, directory: Arc<D>, events: Arc<E>, clock: Arc<C>) -> Self {
        Self {
            repository,
            directory,
            events,
            clock,
            settings: LifecycleSettings::default(),
        }
    }

    /// Replaces the service settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Creates a task owned by `actor`.
    ///
    /// The initial status follows the actor's role. A request naming a
    /// parent creates a subtask under it; the insert is serialised against
    /// concurrent writes to the parent and retried like a status update.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] for invalid input or a parent
    /// that is already done, [`TaskLifecycleError::ParentNotFound`] for an
    /// unknown parent, [`TaskLifecycleError::ConflictRetriesExhausted`] when
    /// the parent kept changing, or [`TaskLifecycleError::Repository`] when
    /// persistence fails.
    pub async fn create(
        &self,
        request: CreateTaskRequest,
        actor: &ActorContext,
    ) -> TaskLifecycleResult<Task> {
        let draft = request.into_draft(actor.staff_id())?;
        let task = match draft.parent_id {
            Some(parent_id) => self.create_subtask(draft, parent_id, actor).await?,
            None => {
                let top_level = Task::create(draft, actor.role(), None, &*self.clock)?;
                self.repository.store(&top_level).await?;
                top_level
            }
        };

        info!(
            task_id = %task.id(),
            owner = %task.owner(),
            status = %task.status(),
            subtask = task.is_subtask(),
            "task created"
        );
        Ok(task)
    }

    /// Moves a task to `requested` on behalf of a collaborator.
    ///
    /// Completing a recurring top-level task generates its next occurrence.
    /// Generation failures are reported in the outcome and never undo the
    /// committed transition. Requesting the current status is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks,
    /// [`TaskLifecycleError::Domain`] for unknown statuses, outsiders and
    /// guarded transitions, and
    /// [`TaskLifecycleError::ConflictRetriesExhausted`] when concurrent
    /// writers never let the update land.
    pub async fn update_status(
        &self,
        task_id: TaskId,
        requested: &str,
        actor: &ActorContext,
    ) -> TaskLifecycleResult<StatusUpdateOutcome> {
        let status = TaskStatus::try_from(requested).map_err(TaskDomainError::from)?;
        let attempts = self.settings.transition_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let mut task = self.load(task_id).await?;
            let subtasks = if status == TaskStatus::Done && !task.is_subtask() {
                self.repository.find_subtasks(task_id).await?
            } else {
                Vec::new()
            };

            let change = task.apply_status(status, actor.staff_id(), &subtasks, &*self.clock)?;
            if change.is_noop() {
                debug!(%task_id, status = %status, "status unchanged");
                return Ok(StatusUpdateOutcome {
                    task,
                    change,
                    recurrence: RecurrenceReport::NotApplicable,
                });
            }

            let committed = match self.repository.update(&task).await {
                Ok(stored) => stored,
                Err(TaskRepositoryError::VersionConflict { .. }) => {
                    debug!(%task_id, attempt, "status update lost a version race; retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            info!(
                %task_id,
                actor = %actor.staff_id(),
                from = %change.previous,
                to = %change.current,
                "task status updated"
            );

            let recurrence = if change.entered_done() && committed.recurrence_due() {
                self.spawn_next_occurrence(&committed).await
            } else {
                RecurrenceReport::NotApplicable
            };

            self.announce(TaskChange::status(
                committed.clone(),
                actor.staff_id(),
                change.previous,
            ))
            .await;

            return Ok(StatusUpdateOutcome {
                task: committed,
                change,
                recurrence,
            });
        }

        Err(TaskLifecycleError::ConflictRetriesExhausted { task_id, attempts })
    }

    /// Applies owner-only metadata edits.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks,
    /// [`TaskLifecycleError::Directory`] when a new owner cannot be
    /// resolved, [`TaskLifecycleError::Domain`] for invalid edits, and
    /// [`TaskLifecycleError::ConflictRetriesExhausted`] under sustained
    /// contention.
    pub async fn update_metadata(
        &self,
        task_id: TaskId,
        actor: &ActorContext,
        patch: TaskMetadataPatch,
    ) -> TaskLifecycleResult<Task> {
        let new_owner_role = match patch.new_owner() {
            Some(owner) => Some(self.directory.lookup(owner).await?.role),
            None => None,
        };
        let changes = patch.into_changes(new_owner_role)?;
        let attempts = self.settings.transition_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let mut task = self.load(task_id).await?;
            let parent = match task.parent_id() {
                Some(parent_id) => Some(
                    self.repository
                        .find_by_id(parent_id)
                        .await?
                        .ok_or(TaskLifecycleError::ParentNotFound(parent_id))?,
                ),
                None => None,
            };
            let subtasks = if task.is_subtask() {
                Vec::new()
            } else {
                self.repository.find_subtasks(task_id).await?
            };

            let previous_deadline = task.deadline();
            let changed = task.apply_metadata(
                changes.clone(),
                actor,
                parent.as_ref(),
                &subtasks,
                &*self.clock,
            )?;
            if changed.is_empty() {
                return Ok(task);
            }

            let committed = match self.repository.update(&task).await {
                Ok(stored) => stored,
                Err(TaskRepositoryError::VersionConflict { .. }) => {
                    debug!(%task_id, attempt, "metadata update lost a version race; retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let changed_fields: BTreeSet<TaskField> = changed.into_iter().collect();
            info!(%task_id, fields = ?changed_fields, "task metadata updated");
            let deadline_moved = changed_fields.contains(&TaskField::Deadline);
            self.announce(TaskChange {
                task: committed.clone(),
                actor: actor.staff_id(),
                changed_fields,
                previous_status: None,
                previous_deadline: deadline_moved.then_some(previous_deadline),
            })
            .await;
            return Ok(committed);
        }

        Err(TaskLifecycleError::ConflictRetriesExhausted { task_id, attempts })
    }

    /// Returns a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks.
    pub async fn find(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.load(task_id).await
    }

    /// Returns the subtasks of a task ordered by deadline.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks.
    pub async fn subtasks_of(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<Task>> {
        self.load(task_id).await?;
        Ok(self.repository.find_subtasks(task_id).await?)
    }

    /// Deletes a task and its subtasks. Only the owner may delete.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskDomainError::NotOwner`] for anyone but the owner.
    pub async fn delete(&self, task_id: TaskId, actor: &ActorContext) -> TaskLifecycleResult<()> {
        let task = self.load(task_id).await?;
        if task.owner() != actor.staff_id() {
            return Err(TaskDomainError::NotOwner {
                task_id,
                actor: actor.staff_id(),
            }
            .into());
        }
        self.repository.delete(task_id).await?;
        info!(%task_id, "task deleted");
        Ok(())
    }

    async fn create_subtask(
        &self,
        draft: TaskDraft,
        parent_id: TaskId,
        actor: &ActorContext,
    ) -> TaskLifecycleResult<Task> {
        let attempts = self.settings.transition_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let parent = self
                .repository
                .find_by_id(parent_id)
                .await?
                .ok_or(TaskLifecycleError::ParentNotFound(parent_id))?;
            let subtask = Task::create(draft.clone(), actor.role(), Some(&parent), &*self.clock)?;

            match self.repository.store_subtask(&parent, &subtask).await {
                Ok(()) => return Ok(subtask),
                Err(TaskRepositoryError::VersionConflict { .. }) => {
                    debug!(%parent_id, attempt, "subtask insert lost a parent version race; retrying");
                }
                Err(TaskRepositoryError::NotFound(_)) => {
                    return Err(TaskLifecycleError::ParentNotFound(parent_id));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TaskLifecycleError::ConflictRetriesExhausted {
            task_id: parent_id,
            attempts,
        })
    }

    async fn load(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    async fn spawn_next_occurrence(&self, completed: &Task) -> RecurrenceReport {
        match self.generate_family(completed).await {
            Ok(family) => {
                info!(
                    task_id = %completed.id(),
                    next_task_id = %family.parent.id(),
                    next_deadline = %family.parent.deadline(),
                    subtasks = family.subtasks.len(),
                    "recurring task regenerated"
                );
                RecurrenceReport::Spawned(family)
            }
            Err(err) => {
                warn!(task_id = %completed.id(), error = %err, "recurrence generation failed");
                RecurrenceReport::Failed(err.to_string())
            }
        }
    }

    async fn generate_family(&self, completed: &Task) -> TaskLifecycleResult<RecurringFamily> {
        let subtasks = self.repository.find_subtasks(completed.id()).await?;
        let owners: BTreeSet<StaffId> = std::iter::once(completed)
            .chain(&subtasks)
            .map(Task::owner)
            .collect();

        let mut roles: HashMap<StaffId, StaffRole> = HashMap::with_capacity(owners.len());
        for owner in owners {
            let profile = self.directory.lookup(owner).await?;
            roles.insert(owner, profile.role);
        }

        let family = next_occurrence(completed, &subtasks, &roles, &*self.clock)?;
        self.repository
            .store_family(&family.parent, &family.subtasks)
            .await?;
        Ok(family)
    }

    async fn announce(&self, change: TaskChange) {
        let task_id = change.task.id();
        let delivery = tokio::time::timeout(
            self.settings.notifier_timeout,
            self.events.task_changed(&change),
        )
        .await;
        match delivery {
            Ok(Ok(())) => debug!(%task_id, "task change announced"),
            Ok(Err(err)) => warn!(%task_id, error = %err, "task change not delivered"),
            Err(_) => warn!(
                %task_id,
                timeout_ms = self.settings.notifier_timeout.as_millis(),
                "task change delivery timed out"
            ),
        }
    }
}
