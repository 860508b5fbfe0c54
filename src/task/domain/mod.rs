//! Domain model for task lifecycle management.
//!
//! The task domain models role-based task creation, the status state
//! machine with its timestamp side effects, one-level subtask hierarchies
//! and recurrence, while keeping all infrastructure concerns outside of the
//! domain boundary.

mod error;
mod fields;
mod ids;
mod recurrence;
mod role;
mod task;

pub use error::{ParseStaffRoleError, ParseTaskStatusError, TaskDomainError};
pub use fields::{Priority, RecurrenceDays, TaskDescription, TaskTitle};
pub use ids::{ProjectId, StaffId, TaskId};
pub use recurrence::{RecurrenceError, RecurringFamily, next_occurrence};
pub use role::{ActorContext, StaffRole, can_assign_across_role, default_status_for_role};
pub use task::{
    MetadataChanges, OwnerTransfer, PersistedTaskData, StatusChange, Task, TaskDraft, TaskField,
    TaskStatus,
};

pub(crate) use task::GeneratedTask;
