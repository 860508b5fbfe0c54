//! Application services for task lifecycle orchestration.

mod lifecycle;
mod requests;

pub use lifecycle::{
    LifecycleSettings, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub use requests::{CreateTaskRequest, RecurrenceReport, StatusUpdateOutcome, TaskMetadataPatch};
