//! Diesel schema for notification persistence.

diesel::table! {
    /// Stored notifications.
    notifications (id) {
        /// Notification identifier.
        id -> Uuid,
        /// Recipient staff member.
        recipient_id -> BigInt,
        /// Kind identifier, e.g. `deadline_3_days`.
        #[max_length = 64]
        kind -> Varchar,
        /// Title text.
        #[max_length = 255]
        title -> Varchar,
        /// Message body.
        message -> Text,
        /// Related task.
        related_task_id -> Nullable<Uuid>,
        /// Related project.
        related_project_id -> Nullable<BigInt>,
        /// Related comment.
        related_comment_id -> Nullable<BigInt>,
        /// Read flag.
        is_read -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Read timestamp.
        read_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Once-only guard for scheduled notifications.
    deadline_notification_log (id) {
        /// Surrogate key.
        id -> BigInt,
        /// Task the notification was about.
        task_id -> Uuid,
        /// Recipient.
        staff_id -> BigInt,
        /// Kind identifier.
        #[max_length = 64]
        notification_type -> Varchar,
        /// When the notification was stored.
        sent_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-staff notification settings.
    notification_preferences (staff_id) {
        /// Staff member.
        staff_id -> BigInt,
        /// Deadline reminder toggle.
        deadline_reminders -> Bool,
        /// Reminder offsets in days, descending.
        reminder_days -> Array<Integer>,
        /// Status update toggle.
        task_status_updates -> Bool,
        /// Due date change toggle.
        due_date_changes -> Bool,
    }
}
