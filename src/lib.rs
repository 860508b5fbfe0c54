//! Taskpulse: task lifecycle tracking with deadline and event notifications.
//!
//! Tasks move through a small status machine, may own one level of
//! subtasks and may recur once completed. Every committed change is turned
//! into notifications for the people involved, and a background scanner
//! reminds them of approaching and missed deadlines.
//!
//! # Architecture
//!
//! Each context follows hexagonal architecture:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage and collaborators
//! - **Adapters**: In-memory, `PostgreSQL` and network implementations
//! - **Services**: Orchestration over the ports
//!
//! # Modules
//!
//! - [`task`]: Task lifecycle, subtasks and recurrence
//! - [`notification`]: Notification kinds, delivery, scanning and the inbox
//! - [`config`]: Engine configuration
//! - [`error`]: Cross-cutting error taxonomy

pub mod config;
pub mod error;
pub mod notification;
pub mod task;

#[cfg(test)]
mod test_support;
