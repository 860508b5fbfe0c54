//! Outbound port announcing committed task changes.
//!
//! The task service calls the sink after a write has committed. Delivery is
//! best-effort: errors are logged by the caller and never undo the write.

use crate::task::domain::{StaffId, Task, TaskField, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

/// A committed change to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    /// Task state after the commit.
    pub task: Task,
    /// Staff member who made the change.
    pub actor: StaffId,
    /// Fields whose values changed.
    pub changed_fields: BTreeSet<TaskField>,
    /// Status before the change, when the status changed.
    pub previous_status: Option<TaskStatus>,
    /// Deadline before the change, when the deadline changed.
    pub previous_deadline: Option<DateTime<Utc>>,
}

impl TaskChange {
    /// Describes a committed status transition.
    #[must_use]
    pub fn status(task: Task, actor: StaffId, previous: TaskStatus) -> Self {
        Self {
            task,
            actor,
            changed_fields: BTreeSet::from([TaskField::Status]),
            previous_status: Some(previous),
            previous_deadline: None,
        }
    }
}

/// Failure to hand a change to the sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventSinkError {
    /// The receiving side could not be reached or rejected the event.
    #[error("task event sink unavailable: {0}")]
    Unavailable(String),
}

/// Receiver of committed task changes.
#[async_trait]
pub trait TaskEventSink: Send + Sync {
    /// Announces a committed change.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::Unavailable`] when the change could not be
    /// delivered.
    async fn task_changed(&self, change: &TaskChange) -> Result<(), EventSinkError>;
}

/// Sink that discards every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardingEventSink;

#[async_trait]
impl TaskEventSink for DiscardingEventSink {
    async fn task_changed(&self, _change: &TaskChange) -> Result<(), EventSinkError> {
        Ok(())
    }
}
