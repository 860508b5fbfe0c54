//! Event notifier turning task edits, comments and mentions into stored
//! notifications.

use super::{
    delivery::NotificationDelivery,
    error::{NotificationServiceError, NotificationServiceResult},
};
use crate::config::EngineConfig;
use crate::notification::{
    domain::{
        CommentId, Notification, NotificationKind, RelatedEntities, RenderedContent,
        TemplateContext, format_instant, render, select_kind,
    },
    ports::{NotificationRepository, PreferenceRepository, RealtimeFanout},
};
use crate::task::{
    domain::{ProjectId, StaffId, TaskField, TaskId},
    ports::{EventSinkError, StaffDirectory, TaskChange, TaskEventSink, TaskRepository},
};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Display name used when the acting staff member cannot be resolved.
pub const UNKNOWN_ACTOR: &str = "Someone";

/// What happened to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentAction {
    /// A comment was posted.
    Added,
    /// A comment was edited.
    Updated,
    /// A comment was removed.
    Deleted,
}

impl CommentAction {
    /// Returns the verb used in message text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for CommentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied context for comment and mention events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContext {
    /// Task the comment belongs to.
    pub task_id: TaskId,
    /// Title of that task.
    pub task_title: String,
    /// Whether that task is a subtask.
    pub subtask: bool,
    /// Project of that task.
    pub project_id: Option<ProjectId>,
    /// Comment identifier, when the comment still exists.
    pub comment_id: Option<CommentId>,
    /// Display name of the author.
    pub actor_name: String,
    /// Short extract of the comment text.
    pub excerpt: Option<String>,
}

/// Context for mention events; mentions always live inside a comment.
pub type MentionContext = CommentContext;

impl CommentContext {
    fn template_context(&self) -> TemplateContext {
        let mut context =
            TemplateContext::for_task(self.task_title.as_str(), self.subtask).actor(&self.actor_name);
        context.excerpt.clone_from(&self.excerpt);
        context
    }

    const fn related(&self) -> RelatedEntities {
        RelatedEntities {
            task_id: Some(self.task_id),
            project_id: self.project_id,
            comment_id: self.comment_id,
        }
    }
}

/// Per-event delivery tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Kind that was dispatched.
    pub kind: NotificationKind,
    /// Recipients who received a stored notification.
    pub delivered: usize,
    /// Recipients whose preferences suppressed the kind.
    pub skipped: usize,
    /// Recipients whose delivery failed.
    pub failed: usize,
}

impl DispatchReport {
    const fn empty(kind: NotificationKind) -> Self {
        Self {
            kind,
            delivered: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Fans task, comment and mention events out to their recipients.
pub struct EventNotifier<T, N, P, F, D, C>
where
    T: TaskRepository,
    N: NotificationRepository,
    P: PreferenceRepository,
    F: RealtimeFanout,
    D: StaffDirectory,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    delivery: NotificationDelivery<N, F>,
    preferences: Arc<P>,
    directory: Arc<D>,
    clock: Arc<C>,
    lookup_timeout: Duration,
}

impl<T, N, P, F, D, C> EventNotifier<T, N, P, F, D, C>
where
    T: TaskRepository,
    N: NotificationRepository,
    P: PreferenceRepository,
    F: RealtimeFanout,
    D: StaffDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a notifier with the default directory lookup timeout.
    #[must_use]
    pub fn new(
        tasks: Arc<T>,
        notifications: Arc<N>,
        preferences: Arc<P>,
        fanout: Arc<F>,
        directory: Arc<D>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            delivery: NotificationDelivery::new(notifications, fanout),
            preferences,
            directory,
            clock,
            lookup_timeout: EngineConfig::default().notifier_timeout(),
        }
    }

    /// Replaces the bound on actor name lookups.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Notifies the owner and collaborators of `task_id` that
    /// `changed_fields` were just committed by `actor`, except the actor.
    ///
    /// For writers outside the lifecycle service that only know what
    /// changed. The task is read back from storage; earlier values are not
    /// known and are left out of the message.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::TaskNotFound`] for unknown tasks,
    /// [`NotificationServiceError::Tasks`] when the lookup fails, and
    /// [`NotificationServiceError::Domain`] when rendering fails.
    pub async fn emit_task_changed(
        &self,
        task_id: TaskId,
        changed_fields: BTreeSet<TaskField>,
        actor: StaffId,
    ) -> NotificationServiceResult<DispatchReport> {
        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or(NotificationServiceError::TaskNotFound(task_id))?;
        let change = TaskChange {
            task,
            actor,
            changed_fields,
            previous_status: None,
            previous_deadline: None,
        };
        self.notify_task_change(&change).await
    }

    /// Notifies the owner and collaborators of a committed task change,
    /// except the actor.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Domain`] when the notification
    /// text cannot be rendered. Per-recipient failures are counted in the
    /// report instead.
    pub async fn notify_task_change(
        &self,
        change: &TaskChange,
    ) -> NotificationServiceResult<DispatchReport> {
        let kind = select_kind(&change.changed_fields);
        let task = &change.task;
        let recipients: BTreeSet<StaffId> = task
            .collaborators()
            .iter()
            .copied()
            .chain(std::iter::once(task.owner()))
            .filter(|staff| *staff != change.actor)
            .collect();
        if recipients.is_empty() {
            debug!(task_id = %task.id(), %kind, "no recipients besides the actor");
            return Ok(DispatchReport::empty(kind));
        }

        let actor_name = self.actor_name(change.actor).await;
        let mut context = TemplateContext::for_task(task.title().as_str(), task.is_subtask())
            .actor(actor_name)
            .deadline(task.deadline());
        context.status = Some(task.status().to_string());
        context.previous_status = change.previous_status.map(|status| status.to_string());
        context.previous_deadline = change.previous_deadline.map(format_instant);
        context.priority = Some(task.priority().value());

        let content = render(kind, &context)?;
        let related = RelatedEntities::task(task.id(), task.project_id());
        Ok(self.dispatch(kind, recipients, &content, related).await)
    }

    /// Notifies `recipient` that they were mentioned.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Domain`] when the notification
    /// text cannot be rendered.
    pub async fn emit_mention(
        &self,
        recipient: StaffId,
        context: &MentionContext,
    ) -> NotificationServiceResult<DispatchReport> {
        let kind = NotificationKind::Mention;
        let content = render(kind, &context.template_context())?;
        Ok(self
            .dispatch(kind, [recipient], &content, context.related())
            .await)
    }

    /// Notifies `recipient` that a comment was added, edited or removed.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationServiceError::Domain`] when the notification
    /// text cannot be rendered.
    pub async fn emit_comment_event(
        &self,
        recipient: StaffId,
        action: CommentAction,
        context: &CommentContext,
    ) -> NotificationServiceResult<DispatchReport> {
        let kind = NotificationKind::CommentsUpdated;
        let mut template_context = context.template_context();
        template_context.action = Some(action.as_str().to_owned());
        let content = render(kind, &template_context)?;
        Ok(self
            .dispatch(kind, [recipient], &content, context.related())
            .await)
    }

    async fn actor_name(&self, actor: StaffId) -> String {
        match tokio::time::timeout(self.lookup_timeout, self.directory.lookup(actor)).await {
            Ok(Ok(profile)) => profile.display_name,
            Ok(Err(err)) => {
                debug!(%actor, error = %err, "actor lookup failed");
                UNKNOWN_ACTOR.to_owned()
            }
            Err(_) => {
                warn!(
                    %actor,
                    timeout_ms = self.lookup_timeout.as_millis(),
                    "actor lookup timed out"
                );
                UNKNOWN_ACTOR.to_owned()
            }
        }
    }

    async fn dispatch(
        &self,
        kind: NotificationKind,
        recipients: impl IntoIterator<Item = StaffId>,
        content: &RenderedContent,
        related: RelatedEntities,
    ) -> DispatchReport {
        let mut report = DispatchReport::empty(kind);
        for recipient in recipients {
            match self.preferences.load_or_default(recipient).await {
                Ok(preference) if !preference.wants(kind) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(%recipient, %kind, error = %err, "preference lookup failed");
                    report.failed += 1;
                    continue;
                }
            }

            let notification =
                Notification::new(recipient, kind, content.clone(), related, &*self.clock);
            match self.delivery.deliver(&notification).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(%recipient, %kind, error = %err, "notification not stored");
                    report.failed += 1;
                }
            }
        }

        info!(
            %kind,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "notifications dispatched"
        );
        report
    }
}

#[async_trait]
impl<T, N, P, F, D, C> TaskEventSink for EventNotifier<T, N, P, F, D, C>
where
    T: TaskRepository,
    N: NotificationRepository,
    P: PreferenceRepository,
    F: RealtimeFanout,
    D: StaffDirectory,
    C: Clock + Send + Sync,
{
    async fn task_changed(&self, change: &TaskChange) -> Result<(), EventSinkError> {
        self.notify_task_change(change)
            .await
            .map(|_| ())
            .map_err(|err| EventSinkError::Unavailable(err.to_string()))
    }
}
