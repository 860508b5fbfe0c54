//! Repository port for task persistence and lookup.

use crate::error::ErrorKind;
use crate::task::domain::{Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Stores a new subtask and bumps the version of its parent as one unit.
    ///
    /// The insert only lands while the stored parent version still equals
    /// `parent.version()`, so it conflicts with any concurrent write to the
    /// parent, including a transition to `DONE`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the parent no longer
    /// exists, [`TaskRepositoryError::VersionConflict`] when the parent
    /// changed since it was read, and [`TaskRepositoryError::DuplicateTask`]
    /// when the subtask ID already exists.
    async fn store_subtask(&self, parent: &Task, subtask: &Task) -> TaskRepositoryResult<()>;

    /// Stores a new top-level task and its subtasks as one unit. Either all
    /// rows become visible or none do.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when any identifier
    /// already exists.
    async fn store_family(&self, parent: &Task, subtasks: &[Task]) -> TaskRepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// The write only succeeds when the stored version still equals
    /// `task.version()`; the returned copy carries the new version.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::VersionConflict`] when another writer got
    /// there first.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns the subtasks of `parent_id`, ordered by deadline.
    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every task whose status is not terminal, ordered by deadline.
    ///
    /// Stored rows that can no longer be read as tasks are logged and left
    /// out rather than failing the whole listing.
    async fn find_open(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Deletes a task and, for top-level tasks, all of its subtasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<()>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The stored version moved on since the task was read.
    #[error("task {task_id} was modified concurrently (read at version {expected})")]
    VersionConflict {
        /// Contended task.
        task_id: TaskId,
        /// Version the writer read.
        expected: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Maps the error onto the cross-cutting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::VersionConflict { .. } => ErrorKind::Conflict,
            Self::DuplicateTask(_) | Self::Persistence(_) => ErrorKind::Internal,
        }
    }
}

impl From<diesel::result::Error> for TaskRepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
