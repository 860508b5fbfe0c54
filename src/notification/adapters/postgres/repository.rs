//! `PostgreSQL` repositories for notifications and preferences.

use super::{
    models::{NewDedupRow, NotificationRow, PreferenceRow},
    schema::{deadline_notification_log, notification_preferences, notifications},
};
use crate::notification::{
    domain::{
        CommentId, DedupKey, DedupLogEntry, Notification, NotificationId, NotificationKind,
        NotificationPreference, PersistedNotificationData, RelatedEntities, ReminderDays,
    },
    ports::{
        DedupOutcome, NotificationRepository, NotificationStoreError, NotificationStoreResult,
        PreferenceRepository,
    },
};
use crate::task::{
    adapters::postgres::TaskPgPool,
    domain::{ProjectId, StaffId, TaskId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::on_constraint;

/// Name of the unique constraint over `(task_id, staff_id, notification_type)`.
const DEDUP_CONSTRAINT: &str = "unique_deadline_notification";

async fn run_blocking<F, T>(pool: &TaskPgPool, f: F) -> NotificationStoreResult<T>
where
    F: FnOnce(&mut PgConnection) -> NotificationStoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(NotificationStoreError::persistence)?;
        f(&mut connection)
    })
    .await
    .map_err(NotificationStoreError::persistence)?
}

/// `PostgreSQL`-backed notification store and dedup log.
#[derive(Debug, Clone)]
pub struct PostgresNotificationRepository {
    pool: TaskPgPool,
}

impl PostgresNotificationRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn insert(&self, notification: &Notification) -> NotificationStoreResult<()> {
        let row = to_row(notification);
        run_blocking(&self.pool, move |connection| insert_row(connection, &row)).await
    }

    async fn insert_deduplicated(
        &self,
        notification: &Notification,
        key: &DedupKey,
    ) -> NotificationStoreResult<DedupOutcome> {
        let row = to_row(notification);
        let guard = NewDedupRow {
            task_id: key.task_id.into_inner(),
            staff_id: key.recipient.value(),
            notification_type: key.kind.to_string(),
            sent_at: notification.created_at(),
        };
        run_blocking(&self.pool, move |connection| {
            connection.transaction(|tx| {
                let claimed = diesel::insert_into(deadline_notification_log::table)
                    .values(&guard)
                    .on_conflict(on_constraint(DEDUP_CONSTRAINT))
                    .do_nothing()
                    .execute(tx)
                    .map_err(NotificationStoreError::persistence)?;
                if claimed == 0 {
                    return Ok(DedupOutcome::AlreadySent);
                }
                insert_row(tx, &row)?;
                Ok(DedupOutcome::Inserted)
            })
        })
        .await
    }

    async fn find_dedup(&self, key: &DedupKey) -> NotificationStoreResult<Option<DedupLogEntry>> {
        let lookup = *key;
        run_blocking(&self.pool, move |connection| {
            let logged = deadline_notification_log::table
                .filter(deadline_notification_log::task_id.eq(lookup.task_id.into_inner()))
                .filter(deadline_notification_log::staff_id.eq(lookup.recipient.value()))
                .filter(deadline_notification_log::notification_type.eq(lookup.kind.to_string()))
                .select(deadline_notification_log::sent_at)
                .first::<DateTime<Utc>>(connection)
                .optional()
                .map_err(NotificationStoreError::persistence)?;
            Ok(logged.map(|sent_at| DedupLogEntry {
                key: lookup,
                sent_at,
            }))
        })
        .await
    }

    async fn find(&self, id: NotificationId) -> NotificationStoreResult<Option<Notification>> {
        run_blocking(&self.pool, move |connection| {
            notifications::table
                .filter(notifications::id.eq(id.into_inner()))
                .select(NotificationRow::as_select())
                .first::<NotificationRow>(connection)
                .optional()
                .map_err(NotificationStoreError::persistence)?
                .map(row_to_notification)
                .transpose()
        })
        .await
    }

    async fn list_for(
        &self,
        recipient: StaffId,
        limit: usize,
    ) -> NotificationStoreResult<Vec<Notification>> {
        let row_limit = i64::try_from(limit).map_err(NotificationStoreError::persistence)?;
        run_blocking(&self.pool, move |connection| {
            notifications::table
                .filter(notifications::recipient_id.eq(recipient.value()))
                .order((notifications::created_at.desc(), notifications::id.desc()))
                .limit(row_limit)
                .select(NotificationRow::as_select())
                .load::<NotificationRow>(connection)
                .map_err(NotificationStoreError::persistence)?
                .into_iter()
                .map(row_to_notification)
                .collect()
        })
        .await
    }

    async fn unread_count(&self, recipient: StaffId) -> NotificationStoreResult<u64> {
        run_blocking(&self.pool, move |connection| {
            let unread: i64 = notifications::table
                .filter(notifications::recipient_id.eq(recipient.value()))
                .filter(notifications::is_read.eq(false))
                .count()
                .get_result(connection)
                .map_err(NotificationStoreError::persistence)?;
            u64::try_from(unread).map_err(NotificationStoreError::persistence)
        })
        .await
    }

    async fn save_read_state(&self, notification: &Notification) -> NotificationStoreResult<()> {
        let id = notification.id();
        let is_read = notification.is_read();
        let read_at = notification.read_at();
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(notifications::table.filter(notifications::id.eq(id.into_inner())))
                .set((
                    notifications::is_read.eq(is_read),
                    notifications::read_at.eq(read_at),
                ))
                .execute(connection)
                .map_err(NotificationStoreError::persistence)?;
            if updated == 0 {
                return Err(NotificationStoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn mark_all_read(
        &self,
        recipient: StaffId,
        read_at: DateTime<Utc>,
    ) -> NotificationStoreResult<u64> {
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(
                notifications::table
                    .filter(notifications::recipient_id.eq(recipient.value()))
                    .filter(notifications::is_read.eq(false)),
            )
            .set((
                notifications::is_read.eq(true),
                notifications::read_at.eq(Some(read_at)),
            ))
            .execute(connection)
            .map_err(NotificationStoreError::persistence)?;
            u64::try_from(updated).map_err(NotificationStoreError::persistence)
        })
        .await
    }
}

/// `PostgreSQL`-backed preference store.
#[derive(Debug, Clone)]
pub struct PostgresPreferenceRepository {
    pool: TaskPgPool,
}

impl PostgresPreferenceRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceRepository for PostgresPreferenceRepository {
    async fn load_or_default(
        &self,
        staff_id: StaffId,
    ) -> NotificationStoreResult<NotificationPreference> {
        let defaults = to_preference_row(&NotificationPreference::defaults_for(staff_id))?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(notification_preferences::table)
                .values(&defaults)
                .on_conflict(notification_preferences::staff_id)
                .do_nothing()
                .execute(connection)
                .map_err(NotificationStoreError::persistence)?;
            let row = notification_preferences::table
                .filter(notification_preferences::staff_id.eq(staff_id.value()))
                .select(PreferenceRow::as_select())
                .first::<PreferenceRow>(connection)
                .map_err(NotificationStoreError::persistence)?;
            row_to_preference(row)
        })
        .await
    }

    async fn upsert(&self, preference: &NotificationPreference) -> NotificationStoreResult<()> {
        let row = to_preference_row(preference)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(notification_preferences::table)
                .values(&row)
                .on_conflict(notification_preferences::staff_id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(NotificationStoreError::persistence)?;
            Ok(())
        })
        .await
    }
}

fn insert_row(connection: &mut PgConnection, row: &NotificationRow) -> NotificationStoreResult<()> {
    diesel::insert_into(notifications::table)
        .values(row)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                NotificationStoreError::DuplicateNotification(NotificationId::from_uuid(row.id))
            }
            _ => NotificationStoreError::persistence(err),
        })?;
    Ok(())
}

fn to_row(notification: &Notification) -> NotificationRow {
    let related = notification.related();
    NotificationRow {
        id: notification.id().into_inner(),
        recipient_id: notification.recipient().value(),
        kind: notification.kind().to_string(),
        title: notification.title().to_owned(),
        message: notification.message().to_owned(),
        related_task_id: related.task_id.map(TaskId::into_inner),
        related_project_id: related.project_id.map(ProjectId::value),
        related_comment_id: related.comment_id.map(CommentId::value),
        is_read: notification.is_read(),
        created_at: notification.created_at(),
        read_at: notification.read_at(),
    }
}

fn row_to_notification(row: NotificationRow) -> NotificationStoreResult<Notification> {
    let NotificationRow {
        id,
        recipient_id,
        kind,
        title,
        message,
        related_task_id,
        related_project_id,
        related_comment_id,
        is_read,
        created_at,
        read_at,
    } = row;

    let data = PersistedNotificationData {
        id: NotificationId::from_uuid(id),
        recipient: StaffId::new(recipient_id),
        kind: NotificationKind::try_from(kind.as_str())
            .map_err(NotificationStoreError::persistence)?,
        title,
        message,
        related: RelatedEntities {
            task_id: related_task_id.map(TaskId::from_uuid),
            project_id: related_project_id.map(ProjectId::new),
            comment_id: related_comment_id.map(CommentId::new),
        },
        is_read,
        created_at,
        read_at,
    };
    Ok(Notification::from_persisted(data))
}

fn to_preference_row(preference: &NotificationPreference) -> NotificationStoreResult<PreferenceRow> {
    let reminder_days = preference
        .reminder_days
        .as_slice()
        .iter()
        .map(|day| i32::try_from(*day).map_err(NotificationStoreError::persistence))
        .collect::<NotificationStoreResult<Vec<_>>>()?;
    Ok(PreferenceRow {
        staff_id: preference.staff_id.value(),
        deadline_reminders: preference.deadline_reminders,
        reminder_days,
        task_status_updates: preference.task_status_updates,
        due_date_changes: preference.due_date_changes,
    })
}

fn row_to_preference(row: PreferenceRow) -> NotificationStoreResult<NotificationPreference> {
    let reminder_days = ReminderDays::new(row.reminder_days.into_iter().map(i64::from))
        .map_err(NotificationStoreError::persistence)?;
    Ok(NotificationPreference {
        staff_id: StaffId::new(row.staff_id),
        deadline_reminders: row.deadline_reminders,
        reminder_days,
        task_status_updates: row.task_status_updates,
        due_date_changes: row.due_date_changes,
    })
}
