//! Notification services: event fan-out, deadline scanning, scheduling and
//! the per-recipient inbox.

mod delivery;
mod error;
mod inbox;
mod notifier;
mod scanner;
mod scheduler;

pub use delivery::NotificationDelivery;
pub use error::{NotificationServiceError, NotificationServiceResult};
pub use inbox::NotificationInbox;
pub use notifier::{
    CommentAction, CommentContext, DispatchReport, EventNotifier, MentionContext, UNKNOWN_ACTOR,
};
pub use scanner::{DeadlineScanner, ScanOutcome, ScanReport};
pub use scheduler::{ScanJob, ScanScheduler, ScanSchedulerHandle};
