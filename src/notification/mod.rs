//! Notifications about tasks: event fan-out, deadline reminders and the
//! per-recipient inbox.
//!
//! Layout mirrors [`crate::task`]:
//!
//! - Kinds, templates, preferences and dedup keys in [`domain`]
//! - Storage and realtime contracts in [`ports`]
//! - In-memory, `PostgreSQL` and broadcast implementations in [`adapters`]
//! - The notifier, scanner, scheduler and inbox in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
