//! `PostgreSQL` adapters for notifications, the dedup log and preferences.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresNotificationRepository, PostgresPreferenceRepository};
