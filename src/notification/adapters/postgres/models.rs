//! Diesel row models for notification persistence.

use super::schema::{deadline_notification_log, notification_preferences, notifications};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Notification row used for both reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    /// Notification identifier.
    pub id: uuid::Uuid,
    /// Recipient.
    pub recipient_id: i64,
    /// Kind identifier.
    pub kind: String,
    /// Title.
    pub title: String,
    /// Message.
    pub message: String,
    /// Related task.
    pub related_task_id: Option<uuid::Uuid>,
    /// Related project.
    pub related_project_id: Option<i64>,
    /// Related comment.
    pub related_comment_id: Option<i64>,
    /// Read flag.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Read timestamp.
    pub read_at: Option<DateTime<Utc>>,
}

/// Dedup log insert model.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deadline_notification_log)]
pub struct NewDedupRow {
    /// Task.
    pub task_id: uuid::Uuid,
    /// Recipient.
    pub staff_id: i64,
    /// Kind identifier.
    pub notification_type: String,
    /// Send timestamp.
    pub sent_at: DateTime<Utc>,
}

/// Preference row used for reads, inserts and upserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = notification_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PreferenceRow {
    /// Staff member.
    pub staff_id: i64,
    /// Reminder toggle.
    pub deadline_reminders: bool,
    /// Reminder offsets.
    pub reminder_days: Vec<i32>,
    /// Status update toggle.
    pub task_status_updates: bool,
    /// Due date change toggle.
    pub due_date_changes: bool,
}
