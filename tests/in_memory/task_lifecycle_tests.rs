//! In-memory integration tests for task lifecycle operations.

use super::helpers::{ALICE, BOB, Engine, MANAGER, as_actor, engine, shared_request};
use crate::test_helpers::reference_now;
use chrono::Duration;
use eyre::{bail, ensure};
use rstest::rstest;
use std::collections::BTreeSet;
use taskpulse::error::ErrorKind;
use taskpulse::task::{
    domain::{StaffId, TaskDomainError, TaskStatus},
    ports::TaskRepository,
    services::{CreateTaskRequest, RecurrenceReport, TaskLifecycleError, TaskMetadataPatch},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn creator_role_decides_initial_status(engine: Engine) -> eyre::Result<()> {
    let by_staff = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(ALICE))
        .await?;
    let by_manager = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(MANAGER))
        .await?;

    ensure!(by_staff.status() == TaskStatus::Ongoing);
    ensure!(by_manager.status() == TaskStatus::Unassigned);
    ensure!(*by_staff.collaborators() == BTreeSet::from([ALICE, BOB]));
    ensure!(*by_manager.collaborators() == BTreeSet::from([MANAGER, BOB]));
    ensure!(by_staff.start_date().is_none());
    ensure!(by_manager.start_date().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn leaving_unassigned_stamps_start_date_once(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Plan sprint", 6), &as_actor(MANAGER))
        .await?;

    engine.clock.advance(Duration::hours(2));
    let started = engine
        .lifecycle
        .update_status(task.id(), "ongoing", &as_actor(BOB))
        .await?;
    engine.clock.advance(Duration::hours(2));
    let reviewed = engine
        .lifecycle
        .update_status(task.id(), "under_review", &as_actor(BOB))
        .await?;

    let stamped = reference_now() + Duration::hours(2);
    ensure!(started.task.start_date() == Some(stamped));
    ensure!(reviewed.task.start_date() == Some(stamped));
    ensure!(reviewed.task.status() == TaskStatus::UnderReview);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outsiders_cannot_move_tasks(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Private work", 4), &as_actor(ALICE))
        .await?;

    let result = engine
        .lifecycle
        .update_status(task.id(), "done", &as_actor(MANAGER))
        .await;

    let Err(err) = result else {
        bail!("outsider transition should be refused");
    };
    ensure!(err.kind() == ErrorKind::Forbidden);
    ensure!(engine.lifecycle.find(task.id()).await?.status() == TaskStatus::Ongoing);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recurring_completion_spawns_exactly_one_successor(engine: Engine) -> eyre::Result<()> {
    let weekly = engine
        .lifecycle
        .create(
            shared_request("Weekly report", 2).with_recurrence(7),
            &as_actor(ALICE),
        )
        .await?;

    let outcome = engine
        .lifecycle
        .update_status(weekly.id(), "done", &as_actor(ALICE))
        .await?;

    let RecurrenceReport::Spawned(family) = outcome.recurrence else {
        bail!("expected a generated occurrence, got {:?}", outcome.recurrence);
    };
    ensure!(family.parent.deadline() == reference_now() + Duration::days(7));
    ensure!(family.parent.status() == TaskStatus::Ongoing);
    ensure!(family.parent.start_date().is_none());
    ensure!(family.parent.completed_date().is_none());

    let open = engine.tasks.find_open().await?;
    ensure!(open.len() == 1, "expected one open task, found {}", open.len());
    ensure!(open.iter().all(|task| task.id() == family.parent.id()));

    let original = engine.lifecycle.find(weekly.id()).await?;
    ensure!(original.status() == TaskStatus::Done);
    ensure!(original.completed_date() == Some(reference_now()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_rows_stay_done(engine: Engine) -> eyre::Result<()> {
    let weekly = engine
        .lifecycle
        .create(
            shared_request("Weekly report", 2).with_recurrence(7),
            &as_actor(ALICE),
        )
        .await?;
    engine
        .lifecycle
        .update_status(weekly.id(), "done", &as_actor(ALICE))
        .await?;

    let reopened = engine
        .lifecycle
        .update_status(weekly.id(), "ongoing", &as_actor(ALICE))
        .await;
    let again = engine
        .lifecycle
        .update_status(weekly.id(), "done", &as_actor(BOB))
        .await?;

    ensure!(matches!(
        reopened,
        Err(TaskLifecycleError::Domain(TaskDomainError::TaskAlreadyDone { .. }))
    ));
    ensure!(again.change.is_noop());
    ensure!(matches!(again.recurrence, RecurrenceReport::NotApplicable));
    ensure!(engine.tasks.find_open().await?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn manager_owned_recurrence_returns_to_unassigned(engine: Engine) -> eyre::Result<()> {
    let monthly = engine
        .lifecycle
        .create(
            shared_request("Stock take", 3).with_recurrence(30),
            &as_actor(MANAGER),
        )
        .await?;
    engine
        .lifecycle
        .update_status(monthly.id(), "ongoing", &as_actor(BOB))
        .await?;

    let outcome = engine
        .lifecycle
        .update_status(monthly.id(), "done", &as_actor(BOB))
        .await?;

    let RecurrenceReport::Spawned(family) = outcome.recurrence else {
        bail!("expected a generated occurrence");
    };
    ensure!(family.parent.owner() == MANAGER);
    ensure!(family.parent.status() == TaskStatus::Unassigned);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parents_wait_for_their_subtasks(engine: Engine) -> eyre::Result<()> {
    let parent = engine
        .lifecycle
        .create(shared_request("Launch", 10), &as_actor(ALICE))
        .await?;
    let child = engine
        .lifecycle
        .create(
            CreateTaskRequest::new("Write notes", "Release notes", 4, reference_now() + Duration::days(5))
                .with_parent(parent.id()),
            &as_actor(ALICE),
        )
        .await?;

    let blocked = engine
        .lifecycle
        .update_status(parent.id(), "done", &as_actor(ALICE))
        .await;
    ensure!(matches!(
        blocked,
        Err(TaskLifecycleError::Domain(TaskDomainError::OpenSubtasks { open: 1, .. }))
    ));

    engine
        .lifecycle
        .update_status(child.id(), "done", &as_actor(ALICE))
        .await?;
    let finished = engine
        .lifecycle
        .update_status(parent.id(), "done", &as_actor(ALICE))
        .await?;

    ensure!(finished.task.status() == TaskStatus::Done);
    ensure!(engine.lifecycle.subtasks_of(parent.id()).await?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subtasks_cannot_nest(engine: Engine) -> eyre::Result<()> {
    let parent = engine
        .lifecycle
        .create(shared_request("Launch", 10), &as_actor(ALICE))
        .await?;
    let child = engine
        .lifecycle
        .create(
            CreateTaskRequest::new("Write notes", "Release notes", 4, reference_now() + Duration::days(5))
                .with_parent(parent.id()),
            &as_actor(ALICE),
        )
        .await?;

    let nested = engine
        .lifecycle
        .create(
            CreateTaskRequest::new("Proofread", "Check notes", 3, reference_now() + Duration::days(4))
                .with_parent(child.id()),
            &as_actor(ALICE),
        )
        .await;

    ensure!(matches!(
        nested,
        Err(TaskLifecycleError::Domain(TaskDomainError::NestedSubtask(_)))
    ));
    Ok(())
}

#[rstest]
#[case(ALICE, true)]
#[case(BOB, false)]
#[tokio::test(flavor = "multi_thread")]
async fn only_owners_edit_metadata(
    engine: Engine,
    #[case] editor: StaffId,
    #[case] permitted: bool,
) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Budget", 8), &as_actor(ALICE))
        .await?;

    let result = engine
        .lifecycle
        .update_metadata(
            task.id(),
            &as_actor(editor),
            TaskMetadataPatch::new().priority(9),
        )
        .await;

    ensure!(result.is_ok() == permitted);
    let stored = engine.lifecycle.find(task.id()).await?;
    let expected_priority = if permitted { 9 } else { 5 };
    ensure!(stored.priority().value() == expected_priority);
    Ok(())
}
