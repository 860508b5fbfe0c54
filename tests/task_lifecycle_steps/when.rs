//! When steps for task lifecycle BDD scenarios.

use super::world::{TaskLifecycleWorld, run_async};
use crate::test_helpers::reference_now;
use chrono::Duration;
use eyre::WrapErr;
use rstest_bdd_macros::when;
use taskpulse::task::services::CreateTaskRequest;

#[when(r#""{name}" creates a task due in {days:i64} days with priority {priority:i64} and collaborator "{other}""#)]
fn creates_task(
    world: &mut TaskLifecycleWorld,
    name: String,
    days: i64,
    priority: i64,
    other: String,
) -> Result<(), eyre::Report> {
    let creator = world.actor(&name)?;
    let collaborator = world.actor(&other)?;
    let request = CreateTaskRequest::new(
        "Audit ledger",
        "Reconcile the quarter",
        priority,
        reference_now() + Duration::days(days),
    )
    .with_collaborators([collaborator.staff_id()]);

    let created = run_async(world.service.create(request, &creator))
        .wrap_err("create task in scenario")?;
    world.last_task = Some(created);
    Ok(())
}

#[when(r#""{name}" moves the task to "{status}""#)]
fn moves_task(
    world: &mut TaskLifecycleWorld,
    name: String,
    status: String,
) -> Result<(), eyre::Report> {
    let actor = world.actor(&name)?;
    let task_id = world.current_task()?.id();

    let result = run_async(world.service.update_status(task_id, &status, &actor));
    world.last_transition = Some(result);
    Ok(())
}
