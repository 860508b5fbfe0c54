//! In-memory integration tests for change notifications, deadline scans and
//! the inbox.

use super::helpers::{ALICE, BOB, Engine, MANAGER, as_actor, engine, shared_request};
use crate::test_helpers::reference_now;
use chrono::Duration;
use eyre::{OptionExt, ensure};
use rstest::rstest;
use std::collections::BTreeSet;
use taskpulse::notification::domain::{NotificationKind, PreferencePatch};
use taskpulse::task::domain::TaskField;
use taskpulse::task::services::TaskMetadataPatch;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn status_changes_reach_other_collaborators(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(ALICE))
        .await?;

    engine
        .lifecycle
        .update_status(task.id(), "under_review", &as_actor(ALICE))
        .await?;

    ensure!(engine.inbox.unread_count(ALICE).await? == 0);
    let inbox = engine.inbox.list(BOB, None).await?;
    ensure!(inbox.len() == 1);
    let received = inbox.first().ok_or_eyre("bob should be notified")?;
    ensure!(received.kind() == NotificationKind::TaskStatusUpdated);
    ensure!(received.title() == "Status updated: Audit ledger");
    ensure!(
        received.message()
            == "Alice Analyst moved \"Audit ledger\" from ongoing to under_review."
    );
    ensure!(received.related().task_id == Some(task.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_edits_report_both_dates(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(ALICE))
        .await?;

    engine
        .lifecycle
        .update_metadata(
            task.id(),
            &as_actor(ALICE),
            TaskMetadataPatch::new()
                .deadline(reference_now() + Duration::days(12))
                .priority(8),
        )
        .await?;

    let inbox = engine.inbox.list(BOB, None).await?;
    let received = inbox.first().ok_or_eyre("bob should be notified")?;
    ensure!(received.kind() == NotificationKind::DueDateChanged);
    ensure!(
        received.message()
            == "Alice Analyst changed the due date of \"Audit ledger\" \
                from 2025-03-13 09:00 UTC to 2025-03-15 09:00 UTC."
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn externally_reported_changes_use_stored_task(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(ALICE))
        .await?;

    let report = engine
        .notifier
        .emit_task_changed(task.id(), BTreeSet::from([TaskField::Deadline]), ALICE)
        .await?;

    ensure!(report.delivered == 1);
    let inbox = engine.inbox.list(BOB, None).await?;
    let received = inbox.first().ok_or_eyre("bob should be notified")?;
    ensure!(received.kind() == NotificationKind::DueDateChanged);
    ensure!(
        received.message()
            == "Alice Analyst changed the due date of \"Audit ledger\" to 2025-03-13 09:00 UTC."
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn muted_status_updates_are_not_stored(engine: Engine) -> eyre::Result<()> {
    engine
        .inbox
        .update_preferences(
            BOB,
            PreferencePatch {
                task_status_updates: Some(false),
                ..PreferencePatch::default()
            },
        )
        .await?;
    let task = engine
        .lifecycle
        .create(shared_request("Audit ledger", 10), &as_actor(ALICE))
        .await?;

    engine
        .lifecycle
        .update_status(task.id(), "under_review", &as_actor(ALICE))
        .await?;

    ensure!(engine.inbox.list(BOB, None).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn scans_walk_reminders_then_overdue_once_each(engine: Engine) -> eyre::Result<()> {
    engine
        .lifecycle
        .create(shared_request("Quarterly filing", 3), &as_actor(ALICE))
        .await?;

    let three_days_out = engine.scan().await?;
    let rerun = engine.scan().await?;
    engine.clock.advance(Duration::days(2));
    let one_day_out = engine.scan().await?;
    engine.clock.advance(Duration::days(2));
    let overdue = engine.scan().await?;
    let overdue_rerun = engine.scan().await?;

    ensure!(three_days_out.notifications_sent == 2);
    ensure!(rerun.notifications_sent == 0);
    ensure!(rerun.duplicates_suppressed == 2);
    ensure!(one_day_out.notifications_sent == 2);
    ensure!(overdue.notifications_sent == 2);
    ensure!(overdue_rerun.notifications_sent == 0);

    let kinds: Vec<NotificationKind> = engine
        .inbox
        .list(BOB, None)
        .await?
        .iter()
        .map(|n| n.kind())
        .collect();
    ensure!(
        kinds
            == [
                NotificationKind::OverdueTask,
                NotificationKind::DeadlineReminder { days: 1 },
                NotificationKind::DeadlineReminder { days: 3 },
            ],
        "unexpected inbox {kinds:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finished_tasks_are_left_alone(engine: Engine) -> eyre::Result<()> {
    let task = engine
        .lifecycle
        .create(shared_request("Quick fix", 1), &as_actor(ALICE))
        .await?;
    engine
        .lifecycle
        .update_status(task.id(), "done", &as_actor(ALICE))
        .await?;
    engine.clock.advance(Duration::days(3));

    let report = engine.scan().await?;

    ensure!(report.tasks_scanned == 0);
    ensure!(report.notifications_sent == 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reminders_are_pushed_to_live_subscribers(engine: Engine) -> eyre::Result<()> {
    let mut feed = engine.fanout.subscribe(MANAGER);
    engine
        .lifecycle
        .create(shared_request("Board pack", 7), &as_actor(MANAGER))
        .await?;

    engine.scan().await?;

    let pushed = feed.recv().await.ok_or_eyre("feed closed")?;
    ensure!(pushed.recipient() == MANAGER);
    ensure!(pushed.kind() == NotificationKind::DeadlineReminder { days: 7 });
    ensure!(pushed.title() == "Deadline in 7 days: Board pack");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inbox_read_state_follows_the_recipient(engine: Engine) -> eyre::Result<()> {
    engine
        .lifecycle
        .create(shared_request("Quarterly filing", 3), &as_actor(ALICE))
        .await?;
    engine.scan().await?;
    engine.clock.advance(Duration::days(2));
    engine.scan().await?;

    let newest = engine
        .inbox
        .list(BOB, Some(1))
        .await?
        .first()
        .map(|n| n.id())
        .ok_or_eyre("bob should have notifications")?;
    let read = engine.inbox.mark_read(newest, BOB).await?;
    ensure!(read.read_at() == Some(reference_now() + Duration::days(2)));
    ensure!(engine.inbox.unread_count(BOB).await? == 1);
    ensure!(engine.inbox.mark_read(newest, ALICE).await.is_err());

    ensure!(engine.inbox.mark_all_read(BOB).await? == 1);
    ensure!(engine.inbox.unread_count(BOB).await? == 0);
    ensure!(engine.inbox.unread_count(ALICE).await? == 2);
    Ok(())
}
