//! Given steps for task lifecycle BDD scenarios.

use super::world::{TaskLifecycleWorld, run_async};
use crate::test_helpers::reference_now;
use chrono::Duration;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskpulse::task::{
    domain::{StaffRole, TaskStatus},
    services::CreateTaskRequest,
};

#[given(r#"a staff member "{name}" with role "{role}""#)]
fn staff_member(
    world: &mut TaskLifecycleWorld,
    name: String,
    role: String,
) -> Result<(), eyre::Report> {
    let parsed = StaffRole::try_from(role.as_str())
        .map_err(|err| eyre::eyre!("invalid role in scenario: {err}"))?;
    world.register(&name, parsed)
}

#[given(r#""{name}" owns an ongoing task due in {days:i64} days recurring every {interval:i64} days"#)]
fn owns_recurring_task(
    world: &mut TaskLifecycleWorld,
    name: String,
    days: i64,
    interval: i64,
) -> Result<(), eyre::Report> {
    let owner = world.actor(&name)?;
    let request = CreateTaskRequest::new(
        "Weekly report",
        "Summarise the week",
        5,
        reference_now() + Duration::days(days),
    )
    .with_recurrence(interval);
    let created = run_async(world.service.create(request, &owner))
        .wrap_err("create recurring task for scenario setup")?;
    eyre::ensure!(
        created.status() == TaskStatus::Ongoing,
        "expected an ongoing task, found {}",
        created.status()
    );
    world.last_task = Some(created);
    Ok(())
}

#[given(r#""{name}" has moved the task to "{status}""#)]
fn has_moved_task(
    world: &mut TaskLifecycleWorld,
    name: String,
    status: String,
) -> Result<(), eyre::Report> {
    let actor = world.actor(&name)?;
    let task_id = world.current_task()?.id();
    run_async(world.service.update_status(task_id, &status, &actor))
        .wrap_err("move task in scenario setup")?;
    Ok(())
}
