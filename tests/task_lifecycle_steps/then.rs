//! Then steps for task lifecycle BDD scenarios.

use super::world::{TaskLifecycleWorld, run_async};
use crate::test_helpers::reference_now;
use chrono::Duration;
use rstest_bdd_macros::then;
use std::collections::BTreeSet;
use taskpulse::task::{
    domain::{Task, TaskDomainError, TaskStatus},
    ports::TaskRepository,
    services::TaskLifecycleError,
};

fn parse_status(raw: &str) -> Result<TaskStatus, eyre::Report> {
    TaskStatus::try_from(raw).map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))
}

fn single_open_task(world: &TaskLifecycleWorld) -> Result<Task, eyre::Report> {
    let mut open = run_async(world.tasks.find_open())?;
    eyre::ensure!(open.len() == 1, "expected one open task, found {}", open.len());
    open.pop().ok_or_else(|| eyre::eyre!("expected an open task"))
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let task = world.current_task()?;
    eyre::ensure!(
        task.status() == expected,
        "expected status {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"the task collaborators are "{first}" and "{second}""#)]
fn task_collaborators_are(
    world: &TaskLifecycleWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let expected = BTreeSet::from([
        world.actor(&first)?.staff_id(),
        world.actor(&second)?.staff_id(),
    ]);
    let task = world.current_task()?;
    eyre::ensure!(
        *task.collaborators() == expected,
        "expected collaborators {expected:?}, found {:?}",
        task.collaborators()
    );
    Ok(())
}

#[then("the task has no start date")]
fn task_has_no_start_date(world: &TaskLifecycleWorld) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    eyre::ensure!(
        task.start_date().is_none(),
        "expected no start date, found {:?}",
        task.start_date()
    );
    Ok(())
}

#[then("exactly one open task exists")]
fn exactly_one_open_task(world: &TaskLifecycleWorld) -> Result<(), eyre::Report> {
    let open = single_open_task(world)?;
    let original = world.current_task()?;
    eyre::ensure!(open.id() != original.id(), "the original task is still open");
    Ok(())
}

#[then("the open task is due {days:i64} days from now")]
fn open_task_due_in(world: &TaskLifecycleWorld, days: i64) -> Result<(), eyre::Report> {
    let open = single_open_task(world)?;
    let expected = reference_now() + Duration::days(days);
    eyre::ensure!(
        open.deadline() == expected,
        "expected deadline {expected}, found {}",
        open.deadline()
    );
    Ok(())
}

#[then(r#"the open task status is "{status}""#)]
fn open_task_status_is(world: &TaskLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let open = single_open_task(world)?;
    eyre::ensure!(
        open.status() == expected,
        "expected status {expected}, found {}",
        open.status()
    );
    Ok(())
}

#[then(r#"the original task is "{status}""#)]
fn original_task_is(world: &TaskLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let task_id = world.current_task()?.id();
    let stored = run_async(world.service.find(task_id))?;
    eyre::ensure!(
        stored.status() == expected,
        "expected status {expected}, found {}",
        stored.status()
    );
    Ok(())
}

#[then("the transition is refused because the task is done")]
fn transition_refused_task_done(world: &TaskLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_transition
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    if !matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::TaskAlreadyDone { .. }
        ))
    ) {
        return Err(eyre::eyre!("expected TaskAlreadyDone error, got {result:?}"));
    }

    Ok(())
}
