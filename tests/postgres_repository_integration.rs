//! Integration tests for the `PostgreSQL` adapters using embedded `PostgreSQL`.
//!
//! These tests exercise the task, notification and preference repositories
//! against a real database instance, verifying optimistic versioning, the
//! once-only dedup constraint and preference defaults.
//!
//! Uses `pg-embed-setup-unpriv` for embedded `PostgreSQL` lifecycle management.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]
#![expect(
    clippy::print_stderr,
    reason = "Test cleanup warnings are informational"
)]

mod test_helpers;

use chrono::Duration;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use std::sync::Arc;
use taskpulse::notification::{
    adapters::postgres::{PostgresNotificationRepository, PostgresPreferenceRepository},
    domain::{
        DedupKey, Notification, NotificationKind, NotificationPreference, RelatedEntities,
        ReminderDays, RenderedContent,
    },
    ports::{DedupOutcome, NotificationRepository, PreferenceRepository},
};
use taskpulse::task::{
    adapters::{
        memory::InMemoryStaffDirectory,
        postgres::{PostgresTaskRepository, TaskPgPool},
    },
    domain::{ActorContext, StaffId, StaffRole, Task, TaskStatus},
    ports::{DiscardingEventSink, TaskRepository, TaskRepositoryError},
    services::{CreateTaskRequest, RecurrenceReport, TaskLifecycleService},
};
use test_helpers::{ManualClock, reference_now};
use tokio::runtime::Runtime;

/// SQL creating the task tables.
const CREATE_TASKS_SQL: &str = include_str!("../migrations/2025-03-01-000000_create_tasks/up.sql");

/// SQL creating the notification tables.
const CREATE_NOTIFICATIONS_SQL: &str =
    include_str!("../migrations/2025-03-01-000100_create_notifications/up.sql");

/// Template database name for pre-migrated schema.
const TEMPLATE_DB: &str = "taskpulse_test_template";

const OWNER: StaffId = StaffId::new(10);
const PEER: StaffId = StaffId::new(11);

type PgLifecycle = TaskLifecycleService<
    PostgresTaskRepository,
    InMemoryStaffDirectory,
    DiscardingEventSink,
    ManualClock,
>;

/// Creates a tokio runtime for async operations in tests.
fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
fn ensure_template(cluster: &TestCluster) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            execute_sql_statements(&mut conn, CREATE_TASKS_SQL)?;
            execute_sql_statements(&mut conn, CREATE_NOTIFICATIONS_SQL)?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    Ok(())
}

/// Executes multiple SQL statements from a single string.
fn execute_sql_statements(conn: &mut PgConnection, sql: &str) -> eyre::Result<()> {
    for statement in sql.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() || trimmed.lines().all(|line| line.trim().starts_with("--")) {
            continue;
        }
        diesel::sql_query(trimmed)
            .execute(conn)
            .map_err(|e| eyre::eyre!("SQL error: {e}\nStatement: {trimmed}"))?;
    }
    Ok(())
}

/// Creates a test database from the template and returns a pool on it.
fn setup_pool(
    cluster: &TestCluster,
    db_name: &str,
) -> Result<TaskPgPool, Box<dyn std::error::Error + Send + Sync>> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    Ok(pool)
}

/// Guard that drops the test database even if the test panics.
struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Fresh database plus the services under test.
struct Fixture<'a> {
    _guard: CleanupGuard<'a>,
    pool: TaskPgPool,
    clock: ManualClock,
    lifecycle: PgLifecycle,
    rt: Runtime,
}

fn fixture(cluster: &'static TestCluster, prefix: &str) -> Fixture<'static> {
    ensure_template(cluster).expect("template setup");
    let db_name = format!("{prefix}_{}", uuid::Uuid::new_v4().simple());
    let guard = CleanupGuard::new(cluster, db_name.clone());
    let pool = setup_pool(cluster, &db_name).expect("pool setup");
    let clock = ManualClock::at(reference_now());
    let directory = InMemoryStaffDirectory::new()
        .with_member(OWNER, "Olive Owner", StaffRole::Staff)
        .and_then(|dir| dir.with_member(PEER, "Pat Peer", StaffRole::Staff))
        .expect("directory should accept members");
    let lifecycle = TaskLifecycleService::new(
        Arc::new(PostgresTaskRepository::new(pool.clone())),
        Arc::new(directory),
        Arc::new(DiscardingEventSink),
        Arc::new(clock.clone()),
    );
    Fixture {
        _guard: guard,
        pool,
        clock,
        lifecycle,
        rt: test_runtime(),
    }
}

fn owner() -> ActorContext {
    ActorContext::new(OWNER, StaffRole::Staff)
}

fn create_task(fx: &Fixture<'_>, request: CreateTaskRequest) -> Task {
    fx.rt
        .block_on(fx.lifecycle.create(request, &owner()))
        .expect("task creation should succeed")
}

fn weekly_request() -> CreateTaskRequest {
    CreateTaskRequest::new(
        "Weekly report",
        "Summarise the week",
        5,
        reference_now() + Duration::days(4),
    )
    .with_collaborators([PEER])
    .with_recurrence(7)
}

fn reminder_for(fx: &Fixture<'_>, task: &Task, recipient: StaffId) -> Notification {
    Notification::new(
        recipient,
        NotificationKind::DeadlineReminder { days: 3 },
        RenderedContent {
            title: "Deadline in 3 days: Weekly report".to_owned(),
            message: "\"Weekly report\" is due on 2025-03-07 09:00 UTC.".to_owned(),
        },
        RelatedEntities::task(task.id(), None),
        &fx.clock,
    )
}

// ============================================================================
// Tasks
// ============================================================================

#[rstest]
fn stored_tasks_round_trip(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_round_trip");
    let repo = PostgresTaskRepository::new(fx.pool.clone());

    let created = create_task(&fx, weekly_request());
    let found = fx
        .rt
        .block_on(repo.find_by_id(created.id()))
        .expect("query ok")
        .expect("task should exist");

    assert_eq!(found, created);
    assert_eq!(found.collaborators().len(), 2);
    assert_eq!(found.status(), TaskStatus::Ongoing);
}

#[rstest]
fn stale_versions_are_rejected(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_versions");
    let repo = PostgresTaskRepository::new(fx.pool.clone());
    let created = create_task(&fx, weekly_request());

    let first = fx.rt.block_on(repo.update(&created)).expect("first write wins");
    let second = fx.rt.block_on(repo.update(&created));

    assert_eq!(first.version(), created.version() + 1);
    assert!(matches!(
        second,
        Err(TaskRepositoryError::VersionConflict { task_id, .. }) if task_id == created.id()
    ));
}

#[rstest]
fn recurring_completion_persists_one_successor(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_recurrence");
    let repo = PostgresTaskRepository::new(fx.pool.clone());
    let created = create_task(&fx, weekly_request());

    let outcome = fx
        .rt
        .block_on(fx.lifecycle.update_status(created.id(), "done", &owner()))
        .expect("completion should succeed");

    let RecurrenceReport::Spawned(family) = outcome.recurrence else {
        panic!("expected a generated occurrence");
    };
    let open = fx.rt.block_on(repo.find_open()).expect("query ok");
    assert_eq!(open.len(), 1);
    assert_eq!(open.first().map(Task::id), Some(family.parent.id()));
    assert_eq!(family.parent.deadline(), reference_now() + Duration::days(7));
    let original = fx
        .rt
        .block_on(repo.find_by_id(created.id()))
        .expect("query ok")
        .expect("original should remain");
    assert_eq!(original.status(), TaskStatus::Done);
}

#[rstest]
fn deleting_a_parent_removes_subtasks(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_delete");
    let repo = PostgresTaskRepository::new(fx.pool.clone());
    let parent = create_task(
        &fx,
        CreateTaskRequest::new("Launch", "Ship it", 6, reference_now() + Duration::days(10)),
    );
    let child = create_task(
        &fx,
        CreateTaskRequest::new("Notes", "Write notes", 4, reference_now() + Duration::days(5))
            .with_parent(parent.id()),
    );

    let subtasks = fx.rt.block_on(repo.find_subtasks(parent.id())).expect("query ok");
    assert_eq!(subtasks.len(), 1);

    fx.rt
        .block_on(fx.lifecycle.delete(parent.id(), &owner()))
        .expect("owner may delete");

    let gone = fx.rt.block_on(repo.find_by_id(child.id())).expect("query ok");
    assert!(gone.is_none());
}

#[rstest]
fn subtask_inserts_move_the_parent_version(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_subtask_version");
    let repo = PostgresTaskRepository::new(fx.pool.clone());
    let parent = create_task(
        &fx,
        CreateTaskRequest::new("Launch", "Ship it", 6, reference_now() + Duration::days(10)),
    );

    create_task(
        &fx,
        CreateTaskRequest::new("Notes", "Write notes", 4, reference_now() + Duration::days(5))
            .with_parent(parent.id()),
    );
    let mut stale = parent.clone();
    stale
        .apply_status(TaskStatus::Done, OWNER, &[], &fx.clock)
        .expect("owner may complete");
    let result = fx.rt.block_on(repo.update(&stale));

    assert!(matches!(
        result,
        Err(TaskRepositoryError::VersionConflict { task_id, .. }) if task_id == parent.id()
    ));
    let reloaded = fx
        .rt
        .block_on(repo.find_by_id(parent.id()))
        .expect("query ok")
        .expect("parent should exist");
    assert_eq!(reloaded.version(), parent.version() + 1);
    assert_eq!(reloaded.status(), TaskStatus::Ongoing);
}

#[rstest]
fn unreadable_rows_do_not_hide_other_open_tasks(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_unreadable_row");
    let repo = PostgresTaskRepository::new(fx.pool.clone());
    let broken = create_task(&fx, weekly_request());
    let healthy = create_task(
        &fx,
        CreateTaskRequest::new("Launch", "Ship it", 6, reference_now() + Duration::days(10)),
    );
    let mut conn = fx.pool.get().expect("connection");
    diesel::sql_query("UPDATE tasks SET version = -1 WHERE id = $1")
        .bind::<diesel::sql_types::Uuid, _>(broken.id().into_inner())
        .execute(&mut conn)
        .expect("corrupt row");

    let open = fx.rt.block_on(repo.find_open()).expect("listing should survive");

    assert_eq!(open.iter().map(Task::id).collect::<Vec<_>>(), vec![healthy.id()]);
}

#[rstest]
fn blank_descriptions_are_refused_by_storage(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_task_blank_description");
    let task = create_task(&fx, weekly_request());
    let mut conn = fx.pool.get().expect("connection");

    let result = diesel::sql_query("UPDATE tasks SET description = '   ' WHERE id = $1")
        .bind::<diesel::sql_types::Uuid, _>(task.id().into_inner())
        .execute(&mut conn);

    assert!(result.is_err(), "blank description should violate the check");
}

// ============================================================================
// Notifications
// ============================================================================

#[rstest]
fn dedup_constraint_allows_one_send(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_notification_dedup");
    let notifications = PostgresNotificationRepository::new(fx.pool.clone());
    let task = create_task(&fx, weekly_request());
    let key = DedupKey::new(
        task.id(),
        PEER,
        NotificationKind::DeadlineReminder { days: 3 },
    );

    let first = fx
        .rt
        .block_on(notifications.insert_deduplicated(&reminder_for(&fx, &task, PEER), &key))
        .expect("first insert");
    let second = fx
        .rt
        .block_on(notifications.insert_deduplicated(&reminder_for(&fx, &task, PEER), &key))
        .expect("second insert");

    assert_eq!(first, DedupOutcome::Inserted);
    assert_eq!(second, DedupOutcome::AlreadySent);
    let inbox = fx
        .rt
        .block_on(notifications.list_for(PEER, 10))
        .expect("query ok");
    assert_eq!(inbox.len(), 1);
    let logged = fx
        .rt
        .block_on(notifications.find_dedup(&key))
        .expect("query ok")
        .expect("log entry should exist");
    assert_eq!(logged.sent_at, reference_now());
}

#[rstest]
fn read_state_updates_are_scoped_to_the_recipient(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_notification_read");
    let notifications = PostgresNotificationRepository::new(fx.pool.clone());
    let task = create_task(&fx, weekly_request());
    for recipient in [OWNER, PEER, PEER] {
        fx.rt
            .block_on(notifications.insert(&reminder_for(&fx, &task, recipient)))
            .expect("insert");
        fx.clock.advance(Duration::minutes(1));
    }

    let mut newest = fx
        .rt
        .block_on(notifications.list_for(PEER, 1))
        .expect("query ok")
        .pop()
        .expect("peer has notifications");
    assert!(newest.mark_read(&fx.clock));
    fx.rt
        .block_on(notifications.save_read_state(&newest))
        .expect("save read state");
    assert_eq!(fx.rt.block_on(notifications.unread_count(PEER)).expect("count"), 1);

    let updated = fx
        .rt
        .block_on(notifications.mark_all_read(PEER, reference_now() + Duration::hours(1)))
        .expect("mark all read");

    assert_eq!(updated, 1);
    assert_eq!(fx.rt.block_on(notifications.unread_count(PEER)).expect("count"), 0);
    assert_eq!(fx.rt.block_on(notifications.unread_count(OWNER)).expect("count"), 1);
}

#[rstest]
fn preferences_default_then_upsert(shared_test_cluster: &'static TestCluster) {
    let fx = fixture(shared_test_cluster, "test_preferences");
    let preferences = PostgresPreferenceRepository::new(fx.pool.clone());

    let defaults = fx
        .rt
        .block_on(preferences.load_or_default(OWNER))
        .expect("defaults");
    assert_eq!(defaults, NotificationPreference::defaults_for(OWNER));

    let mut custom = defaults;
    custom.reminder_days = ReminderDays::new([14, 2]).expect("valid offsets");
    custom.due_date_changes = false;
    fx.rt.block_on(preferences.upsert(&custom)).expect("upsert");

    let reloaded = fx
        .rt
        .block_on(preferences.load_or_default(OWNER))
        .expect("reload");
    assert_eq!(reloaded, custom);
}
