//! Diesel row models for task persistence.

use super::schema::{task_collaborators, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Title text.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Priority value.
    pub priority: i16,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Start timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_date: Option<DateTime<Utc>>,
    /// Recurrence interval in days.
    pub recurrence_days: Option<i32>,
    /// Lifecycle status.
    pub status: String,
    /// Owning staff member.
    pub owner_id: i64,
    /// Parent task.
    pub parent_id: Option<uuid::Uuid>,
    /// Linked project.
    pub project_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    pub version: i64,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Title text.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Priority value.
    pub priority: i16,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Start timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_date: Option<DateTime<Utc>>,
    /// Recurrence interval in days.
    pub recurrence_days: Option<i32>,
    /// Lifecycle status.
    pub status: String,
    /// Owning staff member.
    pub owner_id: i64,
    /// Parent task.
    pub parent_id: Option<uuid::Uuid>,
    /// Linked project.
    pub project_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version.
    pub version: i64,
}

/// Update model for mutable task columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks, treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Title text.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Priority value.
    pub priority: i16,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Start timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_date: Option<DateTime<Utc>>,
    /// Recurrence interval in days.
    pub recurrence_days: Option<i32>,
    /// Lifecycle status.
    pub status: String,
    /// Owning staff member.
    pub owner_id: i64,
    /// Linked project.
    pub project_id: Option<i64>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Version written by this update.
    pub version: i64,
}

/// Collaborator membership row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_collaborators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CollaboratorRow {
    /// Task identifier.
    pub task_id: uuid::Uuid,
    /// Collaborating staff member.
    pub staff_id: i64,
}
