//! Port contracts for notification storage and delivery.

pub mod fanout;
pub mod repository;

pub use fanout::{NoopFanout, RealtimeFanout};
pub use repository::{
    DedupOutcome, NotificationRepository, NotificationStoreError, NotificationStoreResult,
    PreferenceRepository,
};
