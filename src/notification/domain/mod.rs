//! Notification domain model.
//!
//! Kinds, the notification aggregate, per-staff preferences, dedup keys,
//! kind selection for task edits, and text templates.

mod dedup;
mod error;
mod ids;
mod kind;
mod notification;
mod preference;
mod selection;
mod templates;

pub use dedup::{DedupKey, DedupLogEntry};
pub use error::NotificationDomainError;
pub use ids::{CommentId, NotificationId};
pub use kind::NotificationKind;
pub use notification::{Notification, PersistedNotificationData, RelatedEntities, RenderedContent};
pub use preference::{NotificationPreference, PreferencePatch, ReminderDays};
pub use selection::select_kind;
pub use templates::{MAX_TITLE_CHARS, TemplateContext, format_instant, render};
