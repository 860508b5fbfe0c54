//! Shared wiring for in-memory integration tests.
//!
//! [`Engine`] assembles the lifecycle service with the event notifier as
//! its sink, plus the deadline scanner and inbox, all over in-memory
//! adapters and one manual clock.

use crate::test_helpers::{ManualClock, reference_now};
use chrono::Duration;
use rstest::fixture;
use std::sync::Arc;
use taskpulse::notification::{
    adapters::{
        broadcast::BroadcastFanout,
        memory::{InMemoryNotificationRepository, InMemoryPreferenceRepository},
    },
    services::{DeadlineScanner, EventNotifier, NotificationInbox, ScanOutcome, ScanReport},
};
use taskpulse::task::{
    adapters::memory::{InMemoryStaffDirectory, InMemoryTaskRepository},
    domain::{ActorContext, StaffId, StaffRole},
    services::{CreateTaskRequest, TaskLifecycleService},
};

/// Manager who creates unassigned work.
pub const MANAGER: StaffId = StaffId::new(1);
/// Staff member who owns most tasks in these tests.
pub const ALICE: StaffId = StaffId::new(2);
/// Staff member collaborating with Alice.
pub const BOB: StaffId = StaffId::new(3);

/// Notifier wired over in-memory stores.
pub type Notifier = EventNotifier<
    InMemoryTaskRepository,
    InMemoryNotificationRepository,
    InMemoryPreferenceRepository,
    BroadcastFanout,
    InMemoryStaffDirectory,
    ManualClock,
>;

/// Lifecycle service announcing changes through [`Notifier`].
pub type Lifecycle =
    TaskLifecycleService<InMemoryTaskRepository, InMemoryStaffDirectory, Notifier, ManualClock>;

/// Deadline scanner over the shared stores.
pub type Scanner = DeadlineScanner<
    InMemoryTaskRepository,
    InMemoryNotificationRepository,
    InMemoryPreferenceRepository,
    BroadcastFanout,
    ManualClock,
>;

/// Inbox over the shared stores.
pub type Inbox =
    NotificationInbox<InMemoryNotificationRepository, InMemoryPreferenceRepository, ManualClock>;

/// Every service of the engine sharing one set of in-memory adapters.
pub struct Engine {
    /// Clock shared by every service.
    pub clock: ManualClock,
    /// Task store, exposed for direct queries.
    pub tasks: Arc<InMemoryTaskRepository>,
    /// Realtime fanout, exposed for subscriptions.
    pub fanout: Arc<BroadcastFanout>,
    /// Event notifier, also the lifecycle's sink.
    pub notifier: Arc<Notifier>,
    /// Task lifecycle service.
    pub lifecycle: Lifecycle,
    /// Deadline scanner.
    pub scanner: Scanner,
    /// Notification inbox.
    pub inbox: Inbox,
}

impl Engine {
    /// Wires a fresh engine at [`reference_now`].
    pub fn new() -> Self {
        let clock = ManualClock::at(reference_now());
        let shared_clock = Arc::new(clock.clone());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let preferences = Arc::new(InMemoryPreferenceRepository::new());
        let fanout = Arc::new(BroadcastFanout::new(16));
        let directory = Arc::new(staff_directory());

        let notifier = Arc::new(EventNotifier::new(
            Arc::clone(&tasks),
            Arc::clone(&notifications),
            Arc::clone(&preferences),
            Arc::clone(&fanout),
            Arc::clone(&directory),
            Arc::clone(&shared_clock),
        ));
        let lifecycle = TaskLifecycleService::new(
            Arc::clone(&tasks),
            directory,
            Arc::clone(&notifier),
            Arc::clone(&shared_clock),
        );
        let scanner = DeadlineScanner::new(
            Arc::clone(&tasks),
            Arc::clone(&notifications),
            Arc::clone(&preferences),
            Arc::clone(&fanout),
            Arc::clone(&shared_clock),
        );
        let inbox = NotificationInbox::new(notifications, preferences, shared_clock);

        Self {
            clock,
            tasks,
            fanout,
            notifier,
            lifecycle,
            scanner,
            inbox,
        }
    }

    /// Runs one deadline scan and unwraps the completed report.
    ///
    /// # Errors
    ///
    /// Returns an error when the scan fails or reports that it was skipped.
    pub async fn scan(&self) -> eyre::Result<ScanReport> {
        match self.scanner.scan_once().await? {
            ScanOutcome::Completed(report) => Ok(report),
            ScanOutcome::Skipped => Err(eyre::eyre!("scan unexpectedly skipped")),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn staff_directory() -> InMemoryStaffDirectory {
    InMemoryStaffDirectory::new()
        .with_member(MANAGER, "Maya Manager", StaffRole::Manager)
        .and_then(|dir| dir.with_member(ALICE, "Alice Analyst", StaffRole::Staff))
        .and_then(|dir| dir.with_member(BOB, "Bob Builder", StaffRole::Staff))
        .expect("directory should accept members")
}

/// Provides a freshly wired engine for each test.
#[fixture]
pub fn engine() -> Engine {
    Engine::new()
}

/// Acting context for a directory member.
pub fn as_actor(staff_id: StaffId) -> ActorContext {
    let role = if staff_id == MANAGER {
        StaffRole::Manager
    } else {
        StaffRole::Staff
    };
    ActorContext::new(staff_id, role)
}

/// Request for a task due `days` from now with Bob collaborating.
pub fn shared_request(title: &str, days: i64) -> CreateTaskRequest {
    CreateTaskRequest::new(
        title,
        "Shared work item",
        5,
        reference_now() + Duration::days(days),
    )
    .with_collaborators([BOB])
}
