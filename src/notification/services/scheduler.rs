//! Background loop driving the deadline scanner on a fixed interval.

use super::{
    error::NotificationServiceResult,
    scanner::{DeadlineScanner, ScanOutcome},
};
use crate::notification::ports::{NotificationRepository, PreferenceRepository, RealtimeFanout};
use crate::task::ports::TaskRepository;
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Work executed on every scheduler tick.
#[async_trait]
pub trait ScanJob: Send + Sync + 'static {
    /// Runs the job once.
    ///
    /// # Errors
    ///
    /// Returns the job's failure; the scheduler logs it and keeps ticking.
    async fn run(&self) -> NotificationServiceResult<ScanOutcome>;
}

#[async_trait]
impl<T, N, P, F, C> ScanJob for DeadlineScanner<T, N, P, F, C>
where
    T: TaskRepository + 'static,
    N: NotificationRepository + 'static,
    P: PreferenceRepository + 'static,
    F: RealtimeFanout + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn run(&self) -> NotificationServiceResult<ScanOutcome> {
        self.scan_once().await
    }
}

/// Fixed-interval driver for a [`ScanJob`].
///
/// The first run happens immediately. Each run is awaited before the next
/// tick; ticks missed while a run was in progress are skipped.
#[derive(Debug)]
pub struct ScanScheduler<J: ScanJob> {
    job: Arc<J>,
    interval: Duration,
}

impl<J: ScanJob> ScanScheduler<J> {
    /// Creates a scheduler running `job` every `interval`.
    #[must_use]
    pub fn new(job: Arc<J>, interval: Duration) -> Self {
        Self {
            job,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Spawns the loop on the current runtime.
    #[must_use]
    pub fn start(self) -> ScanSchedulerHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let join = tokio::spawn(async move { self.run(cancel).await });
        ScanSchedulerHandle { token, join }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "deadline scheduler started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => match self.job.run().await {
                    Ok(ScanOutcome::Completed(report)) => {
                        debug!(failures = report.failures, "scheduled scan completed");
                    }
                    Ok(ScanOutcome::Skipped) => debug!("scheduled scan skipped"),
                    Err(err) => warn!(error = %err, "scheduled scan failed"),
                },
            }
        }

        info!("deadline scheduler stopped");
    }
}

/// Handle to a running [`ScanScheduler`].
#[derive(Debug)]
pub struct ScanSchedulerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl ScanSchedulerHandle {
    /// Returns `true` once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals the loop to stop and waits for it. A run in progress
    /// finishes first.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(err) = self.join.await {
            warn!(error = %err, "deadline scheduler task ended abnormally");
        }
    }
}
