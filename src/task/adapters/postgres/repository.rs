//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{CollaboratorRow, NewTaskRow, TaskChangeset, TaskRow},
    schema::{task_collaborators, tasks},
};
use crate::task::{
    domain::{
        PersistedTaskData, Priority, ProjectId, RecurrenceDays, StaffId, Task, TaskDescription,
        TaskId, TaskStatus, TaskTitle,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let staged = StagedTask::from_task(task)?;
        self.run_blocking(move |connection| {
            connection.transaction(|tx| insert_staged(tx, &staged))
        })
        .await
    }

    async fn store_subtask(&self, parent: &Task, subtask: &Task) -> TaskRepositoryResult<()> {
        let parent_id = parent.id();
        let expected = parent.version();
        let expected_column = to_version_column(expected)?;
        let staged = StagedTask::from_task(subtask)?;
        self.run_blocking(move |connection| {
            connection.transaction(|tx| {
                let affected = diesel::update(
                    tasks::table
                        .filter(tasks::id.eq(parent_id.into_inner()))
                        .filter(tasks::version.eq(expected_column)),
                )
                .set(tasks::version.eq(tasks::version + 1_i64))
                .execute(tx)
                .map_err(TaskRepositoryError::persistence)?;
                if affected == 0 {
                    return Err(missing_or_conflict(tx, parent_id, expected));
                }
                insert_staged(tx, &staged)
            })
        })
        .await
    }

    async fn store_family(&self, parent: &Task, subtasks: &[Task]) -> TaskRepositoryResult<()> {
        let family = std::iter::once(parent)
            .chain(subtasks)
            .map(StagedTask::from_task)
            .collect::<TaskRepositoryResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            connection.transaction(|tx| family.iter().try_for_each(|staged| insert_staged(tx, staged)))
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let task_id = task.id();
        let expected = task.version();
        let next_version = expected
            .checked_add(1)
            .ok_or_else(|| TaskRepositoryError::VersionConflict { task_id, expected })?;
        let changeset = to_changeset(task, next_version)?;
        let collaborators = collaborator_rows(task);
        let expected_column = to_version_column(expected)?;

        self.run_blocking(move |connection| {
            connection.transaction(|tx| {
                let affected = diesel::update(
                    tasks::table
                        .filter(tasks::id.eq(task_id.into_inner()))
                        .filter(tasks::version.eq(expected_column)),
                )
                .set(&changeset)
                .execute(tx)
                .map_err(TaskRepositoryError::persistence)?;

                if affected == 0 {
                    return Err(missing_or_conflict(tx, task_id, expected));
                }

                replace_collaborators(tx, task_id, &collaborators)?;
                load_task(tx, task_id)?.ok_or(TaskRepositoryError::NotFound(task_id))
            })
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| load_task(connection, id))
            .await
    }

    async fn find_subtasks(&self, parent_id: TaskId) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::parent_id.eq(parent_id.into_inner()))
                .order((tasks::deadline.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            hydrate(connection, rows)
        })
        .await
    }

    async fn find_open(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::status.ne(TaskStatus::Done.as_str()))
                .order((tasks::deadline.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            hydrate_readable(connection, rows)
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction(|tx| {
                diesel::delete(tasks::table.filter(tasks::parent_id.eq(id.into_inner())))
                    .execute(tx)
                    .map_err(TaskRepositoryError::persistence)?;
                let removed = diesel::delete(tasks::table.filter(tasks::id.eq(id.into_inner())))
                    .execute(tx)
                    .map_err(TaskRepositoryError::persistence)?;
                if removed == 0 {
                    return Err(TaskRepositoryError::NotFound(id));
                }
                Ok(())
            })
        })
        .await
    }
}

/// Task row plus collaborator rows ready for insertion.
struct StagedTask {
    id: TaskId,
    row: NewTaskRow,
    collaborators: Vec<CollaboratorRow>,
}

impl StagedTask {
    fn from_task(task: &Task) -> TaskRepositoryResult<Self> {
        Ok(Self {
            id: task.id(),
            row: to_new_row(task)?,
            collaborators: collaborator_rows(task),
        })
    }
}

fn insert_staged(connection: &mut PgConnection, staged: &StagedTask) -> TaskRepositoryResult<()> {
    diesel::insert_into(tasks::table)
        .values(&staged.row)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                TaskRepositoryError::DuplicateTask(staged.id)
            }
            _ => TaskRepositoryError::persistence(err),
        })?;
    diesel::insert_into(task_collaborators::table)
        .values(&staged.collaborators)
        .execute(connection)
        .map_err(TaskRepositoryError::persistence)?;
    Ok(())
}

fn replace_collaborators(
    connection: &mut PgConnection,
    task_id: TaskId,
    rows: &[CollaboratorRow],
) -> TaskRepositoryResult<()> {
    diesel::delete(task_collaborators::table.filter(task_collaborators::task_id.eq(task_id.into_inner())))
        .execute(connection)
        .map_err(TaskRepositoryError::persistence)?;
    diesel::insert_into(task_collaborators::table)
        .values(rows)
        .execute(connection)
        .map_err(TaskRepositoryError::persistence)?;
    Ok(())
}

/// Distinguishes a vanished row from a stale version after a zero-row update.
fn missing_or_conflict(
    connection: &mut PgConnection,
    task_id: TaskId,
    expected: u64,
) -> TaskRepositoryError {
    let exists = tasks::table
        .filter(tasks::id.eq(task_id.into_inner()))
        .select(tasks::id)
        .first::<uuid::Uuid>(connection)
        .optional();
    match exists {
        Ok(Some(_)) => TaskRepositoryError::VersionConflict { task_id, expected },
        Ok(None) => TaskRepositoryError::NotFound(task_id),
        Err(err) => TaskRepositoryError::persistence(err),
    }
}

fn load_task(connection: &mut PgConnection, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
    let row = tasks::table
        .filter(tasks::id.eq(id.into_inner()))
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)
        .optional()
        .map_err(TaskRepositoryError::persistence)?;
    let Some(found) = row else {
        return Ok(None);
    };
    let mut hydrated = hydrate(connection, vec![found])?;
    Ok(hydrated.pop())
}

fn hydrate(connection: &mut PgConnection, rows: Vec<TaskRow>) -> TaskRepositoryResult<Vec<Task>> {
    hydrate_each(connection, rows)?
        .into_iter()
        .map(|(_, task)| task)
        .collect()
}

/// Like [`hydrate`], but skips rows that no longer pass domain validation
/// so one bad row cannot hide every other open task.
fn hydrate_readable(
    connection: &mut PgConnection,
    rows: Vec<TaskRow>,
) -> TaskRepositoryResult<Vec<Task>> {
    let tasks = hydrate_each(connection, rows)?
        .into_iter()
        .filter_map(|(id, task)| match task {
            Ok(readable) => Some(readable),
            Err(err) => {
                warn!(task_id = %id, error = %err, "skipping unreadable task row");
                None
            }
        })
        .collect();
    Ok(tasks)
}

fn hydrate_each(
    connection: &mut PgConnection,
    rows: Vec<TaskRow>,
) -> TaskRepositoryResult<Vec<(uuid::Uuid, TaskRepositoryResult<Task>)>> {
    let ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
    let memberships = task_collaborators::table
        .filter(task_collaborators::task_id.eq_any(&ids))
        .select(CollaboratorRow::as_select())
        .load::<CollaboratorRow>(connection)
        .map_err(TaskRepositoryError::persistence)?;

    let mut by_task: HashMap<uuid::Uuid, BTreeSet<StaffId>> = HashMap::new();
    for membership in memberships {
        by_task
            .entry(membership.task_id)
            .or_default()
            .insert(StaffId::new(membership.staff_id));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            let collaborators = by_task.remove(&id).unwrap_or_default();
            (id, row_to_task(row, collaborators))
        })
        .collect())
}

fn collaborator_rows(task: &Task) -> Vec<CollaboratorRow> {
    task.collaborators()
        .iter()
        .map(|staff| CollaboratorRow {
            task_id: task.id().into_inner(),
            staff_id: staff.value(),
        })
        .collect()
}

fn to_version_column(version: u64) -> TaskRepositoryResult<i64> {
    i64::try_from(version).map_err(TaskRepositoryError::persistence)
}

fn to_recurrence_column(task: &Task) -> TaskRepositoryResult<Option<i32>> {
    task.recurrence()
        .map(|recurrence| i32::try_from(recurrence.days()).map_err(TaskRepositoryError::persistence))
        .transpose()
}

fn to_new_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        title: task.title().as_str().to_owned(),
        description: task.description().as_str().to_owned(),
        priority: i16::from(task.priority().value()),
        deadline: task.deadline(),
        start_date: task.start_date(),
        completed_date: task.completed_date(),
        recurrence_days: to_recurrence_column(task)?,
        status: task.status().as_str().to_owned(),
        owner_id: task.owner().value(),
        parent_id: task.parent_id().map(TaskId::into_inner),
        project_id: task.project_id().map(ProjectId::value),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        version: to_version_column(task.version())?,
    })
}

fn to_changeset(task: &Task, next_version: u64) -> TaskRepositoryResult<TaskChangeset> {
    Ok(TaskChangeset {
        title: task.title().as_str().to_owned(),
        description: task.description().as_str().to_owned(),
        priority: i16::from(task.priority().value()),
        deadline: task.deadline(),
        start_date: task.start_date(),
        completed_date: task.completed_date(),
        recurrence_days: to_recurrence_column(task)?,
        status: task.status().as_str().to_owned(),
        owner_id: task.owner().value(),
        project_id: task.project_id().map(ProjectId::value),
        updated_at: task.updated_at(),
        version: to_version_column(next_version)?,
    })
}

fn row_to_task(row: TaskRow, collaborators: BTreeSet<StaffId>) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        title,
        description,
        priority,
        deadline,
        start_date,
        completed_date,
        recurrence_days,
        status,
        owner_id,
        parent_id,
        project_id,
        created_at,
        updated_at,
        version,
    } = row;

    let recurrence = recurrence_days
        .map(|days| RecurrenceDays::new(i64::from(days)))
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        title: TaskTitle::new(title).map_err(TaskRepositoryError::persistence)?,
        description: TaskDescription::new(description).map_err(TaskRepositoryError::persistence)?,
        priority: Priority::new(i64::from(priority)).map_err(TaskRepositoryError::persistence)?,
        deadline,
        start_date,
        completed_date,
        recurrence,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskRepositoryError::persistence)?,
        owner: StaffId::new(owner_id),
        collaborators,
        parent_id: parent_id.map(TaskId::from_uuid),
        project_id: project_id.map(ProjectId::new),
        created_at,
        updated_at,
        version: u64::try_from(version).map_err(TaskRepositoryError::persistence)?,
    };
    Ok(Task::from_persisted(data))
}
