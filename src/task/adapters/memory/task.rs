//! In-memory repository for task lifecycle tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    subtask_index: HashMap<TaskId, Vec<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn insert_task(state: &mut InMemoryTaskState, task: &Task) {
    if let Some(parent_id) = task.parent_id() {
        state
            .subtask_index
            .entry(parent_id)
            .or_default()
            .push(task.id());
    }
    state.tasks.insert(task.id(), task.clone());
}

/// Removes a task ID from the subtask index, cleaning up the entry if empty.
fn remove_from_index(index: &mut HashMap<TaskId, Vec<TaskId>>, parent_id: TaskId, task_id: TaskId) {
    if let Some(ids) = index.get_mut(&parent_id) {
        ids.retain(|id| *id != task_id);
        if ids.is_empty() {
            index.remove(&parent_id);
        }
    }
}

fn sorted_by_deadline(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by_key(|task| (task.deadline(), task.id()));
    tasks
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        insert_task(&mut state, task);
        Ok(())
    }

    async fn store_subtask(&self, parent: &Task, subtask: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let stored_parent = state
            .tasks
            .get(&parent.id())
            .ok_or(TaskRepositoryError::NotFound(parent.id()))?;
        if stored_parent.version() != parent.version() {
            return Err(TaskRepositoryError::VersionConflict {
                task_id: parent.id(),
                expected: parent.version(),
            });
        }
        if state.tasks.contains_key(&subtask.id()) {
            return Err(TaskRepositoryError::DuplicateTask(subtask.id()));
        }

        let bumped = stored_parent.clone().with_version(parent.version() + 1);
        state.tasks.insert(bumped.id(), bumped);
        insert_task(&mut state, subtask);
        Ok(())
    }

    async fn store_family(&self, parent: &Task, subtasks: &[Task]) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let duplicate = std::iter::once(parent)
            .chain(subtasks)
            .find(|task| state.tasks.contains_key(&task.id()));
        if let Some(existing) = duplicate {
            return Err(TaskRepositoryError::DuplicateTask(existing.id()));
        }
        insert_task(&mut state, parent);
        for subtask in subtasks {
            insert_task(&mut state, subtask);
        }
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let mut state = self.write()?;
        let stored_version = state
            .tasks
            .get(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?
            .version();
        if stored_version != task.version() {
            return Err(TaskRepositoryError::VersionConflict {
                task_id: task.id(),
                expected: task.version(),
            });
        }

        let updated = task.clone().with_version(stored_version + 1);
        state.tasks.insert(updated.id(), updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let subtasks = state
            .subtask_index
            .get(&parent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(sorted_by_deadline(subtasks))
    }

    async fn find_open(&self) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let open = state
            .tasks
            .values()
            .filter(|task| !task.status().is_terminal())
            .cloned()
            .collect();
        Ok(sorted_by_deadline(open))
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .remove(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;

        if let Some(parent_id) = task.parent_id() {
            remove_from_index(&mut state.subtask_index, parent_id, id);
        }
        if let Some(children) = state.subtask_index.remove(&id) {
            for child in children {
                state.tasks.remove(&child);
            }
        }
        Ok(())
    }
}
