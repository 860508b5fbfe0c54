//! Deadline scanner emitting reminder and overdue notifications.

use super::{delivery::NotificationDelivery, error::NotificationServiceResult};
use crate::notification::{
    domain::{
        DedupKey, Notification, NotificationKind, NotificationPreference, RelatedEntities,
        TemplateContext, render,
    },
    ports::{
        DedupOutcome, NotificationRepository, PreferenceRepository, RealtimeFanout,
    },
};
use crate::task::{
    domain::{StaffId, Task},
    ports::TaskRepository,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Totals of one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Open tasks examined.
    pub tasks_scanned: usize,
    /// Notifications stored and published.
    pub notifications_sent: usize,
    /// Notifications withheld because they had already been sent.
    pub duplicates_suppressed: usize,
    /// Tasks whose scan failed.
    pub failures: usize,
}

/// Result of asking for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan ran to the end.
    Completed(ScanReport),
    /// Another scan was already running.
    Skipped,
}

#[derive(Debug, Default)]
struct TaskTally {
    sent: usize,
    suppressed: usize,
}

/// Periodic job that reminds recipients of approaching and missed
/// deadlines, at most once per task, recipient and kind.
pub struct DeadlineScanner<T, N, P, F, C>
where
    T: TaskRepository,
    N: NotificationRepository,
    P: PreferenceRepository,
    F: RealtimeFanout,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    preferences: Arc<P>,
    delivery: NotificationDelivery<N, F>,
    clock: Arc<C>,
    in_flight: Mutex<()>,
}

impl<T, N, P, F, C> DeadlineScanner<T, N, P, F, C>
where
    T: TaskRepository,
    N: NotificationRepository,
    P: PreferenceRepository,
    F: RealtimeFanout,
    C: Clock + Send + Sync,
{
    /// Creates a scanner.
    #[must_use]
    pub fn new(
        tasks: Arc<T>,
        notifications: Arc<N>,
        preferences: Arc<P>,
        fanout: Arc<F>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            preferences,
            delivery: NotificationDelivery::new(notifications, fanout),
            clock,
            in_flight: Mutex::new(()),
        }
    }

    /// Runs one scan over every task that is not done.
    ///
    /// Returns [`ScanOutcome::Skipped`] when a scan is already running.
    /// Failures on one task are logged and counted; the scan moves on.
    ///
    /// # Errors
    ///
    /// Returns [`super::NotificationServiceError::Tasks`] when the open
    /// tasks cannot be listed.
    pub async fn scan_once(&self) -> NotificationServiceResult<ScanOutcome> {
        let Ok(_running) = self.in_flight.try_lock() else {
            debug!("deadline scan already running");
            return Ok(ScanOutcome::Skipped);
        };

        let now = self.clock.utc();
        let open = self.tasks.find_open().await?;
        let mut report = ScanReport::default();
        for task in &open {
            report.tasks_scanned += 1;
            match self.scan_task(task, now).await {
                Ok(tally) => {
                    report.notifications_sent += tally.sent;
                    report.duplicates_suppressed += tally.suppressed;
                }
                Err(err) => {
                    warn!(task_id = %task.id(), error = %err, "deadline scan failed for task");
                    report.failures += 1;
                }
            }
        }

        info!(
            tasks_scanned = report.tasks_scanned,
            notifications_sent = report.notifications_sent,
            duplicates_suppressed = report.duplicates_suppressed,
            failures = report.failures,
            "deadline scan finished"
        );
        Ok(ScanOutcome::Completed(report))
    }

    async fn scan_task(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> NotificationServiceResult<TaskTally> {
        let recipients: BTreeSet<StaffId> = task
            .collaborators()
            .iter()
            .copied()
            .chain(std::iter::once(task.owner()))
            .collect();
        let mut preferences = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            preferences.push(self.preferences.load_or_default(recipient).await?);
        }

        let mut tally = TaskTally::default();
        let offsets: BTreeSet<u32> = preferences
            .iter()
            .flat_map(|preference| preference.active_reminder_days().iter().copied())
            .collect();
        let due = task.deadline().date_naive();
        let today = now.date_naive();
        for days in offsets.into_iter().rev() {
            if !reminder_due(due, days, today) {
                continue;
            }
            let kind = NotificationKind::DeadlineReminder { days };
            let eligible = wanting(&preferences, kind);
            self.notify_once(task, kind, &eligible, &mut tally).await?;
        }

        if task.deadline() < now {
            let everyone = wanting(&preferences, NotificationKind::OverdueTask);
            self.notify_once(task, NotificationKind::OverdueTask, &everyone, &mut tally)
                .await?;
        }
        Ok(tally)
    }

    async fn notify_once(
        &self,
        task: &Task,
        kind: NotificationKind,
        recipients: &[StaffId],
        tally: &mut TaskTally,
    ) -> NotificationServiceResult<()> {
        if recipients.is_empty() {
            return Ok(());
        }
        let mut context = TemplateContext::for_task(task.title().as_str(), task.is_subtask())
            .deadline(task.deadline());
        if let NotificationKind::DeadlineReminder { days } = kind {
            context.days = Some(days);
        }
        let content = render(kind, &context)?;
        let related = RelatedEntities::task(task.id(), task.project_id());

        for recipient in recipients {
            let notification =
                Notification::new(*recipient, kind, content.clone(), related, &*self.clock);
            let key = DedupKey::new(task.id(), *recipient, kind);
            match self.delivery.deliver_once(&notification, &key).await? {
                DedupOutcome::Inserted => tally.sent += 1,
                DedupOutcome::AlreadySent => tally.suppressed += 1,
            }
        }
        Ok(())
    }
}

/// Day `days` fires on the calendar day exactly `days` before the deadline.
fn reminder_due(due: NaiveDate, days: u32, today: NaiveDate) -> bool {
    due.checked_sub_days(Days::new(u64::from(days)))
        .is_some_and(|fire_on| fire_on == today)
}

fn wanting(preferences: &[NotificationPreference], kind: NotificationKind) -> Vec<StaffId> {
    preferences
        .iter()
        .filter(|preference| preference.wants(kind))
        .map(|preference| preference.staff_id)
        .collect()
}
