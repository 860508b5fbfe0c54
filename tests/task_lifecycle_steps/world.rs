//! Shared world state for task lifecycle BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use crate::test_helpers::{ManualClock, reference_now};
use rstest::fixture;
use taskpulse::task::{
    adapters::memory::{InMemoryStaffDirectory, InMemoryTaskRepository},
    domain::{ActorContext, StaffId, StaffRole, Task},
    ports::{DiscardingEventSink, StaffProfile},
    services::{StatusUpdateOutcome, TaskLifecycleError, TaskLifecycleService},
};

/// Service type used by the BDD world.
pub type TestTaskService = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryStaffDirectory,
    DiscardingEventSink,
    ManualClock,
>;

/// Scenario world for task lifecycle behaviour tests.
pub struct TaskLifecycleWorld {
    pub tasks: Arc<InMemoryTaskRepository>,
    pub directory: Arc<InMemoryStaffDirectory>,
    pub service: TestTaskService,
    pub staff: HashMap<String, ActorContext>,
    pub last_task: Option<Task>,
    pub last_transition: Option<Result<StatusUpdateOutcome, TaskLifecycleError>>,
}

impl TaskLifecycleWorld {
    /// Creates a world with an empty directory and task store.
    #[must_use]
    pub fn new() -> Self {
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let directory = Arc::new(InMemoryStaffDirectory::new());
        let service = TaskLifecycleService::new(
            Arc::clone(&tasks),
            Arc::clone(&directory),
            Arc::new(DiscardingEventSink),
            Arc::new(ManualClock::at(reference_now())),
        );

        Self {
            tasks,
            directory,
            service,
            staff: HashMap::new(),
            last_task: None,
            last_transition: None,
        }
    }

    /// Registers `name` in the directory under the next free identifier.
    pub fn register(&mut self, name: &str, actor_role: StaffRole) -> eyre::Result<()> {
        let next = i64::try_from(self.staff.len())?.saturating_add(1);
        let id = StaffId::new(next);
        self.directory.insert(StaffProfile {
            id,
            display_name: name.to_owned(),
            role: actor_role,
            department: "Operations".to_owned(),
        })?;
        self.staff.insert(name.to_owned(), ActorContext::new(id, actor_role));
        Ok(())
    }

    /// Returns the acting context registered for `name`.
    pub fn actor(&self, name: &str) -> eyre::Result<ActorContext> {
        self.staff
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown staff member {name} in scenario world"))
    }

    /// Returns the task most recently created in the scenario.
    pub fn current_task(&self) -> eyre::Result<&Task> {
        self.last_task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing created task in scenario world"))
    }
}

impl Default for TaskLifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskLifecycleWorld {
    TaskLifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
