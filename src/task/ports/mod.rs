//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod directory;
pub mod events;
pub mod repository;

pub use directory::{DirectoryError, StaffDirectory, StaffProfile};
pub use events::{DiscardingEventSink, EventSinkError, TaskChange, TaskEventSink};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
