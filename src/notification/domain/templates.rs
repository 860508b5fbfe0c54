//! Title and message templates per notification kind.

use super::{NotificationDomainError, NotificationKind, RenderedContent};
use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde::Serialize;

const SUBTASK_PREFIX: &str = "{% if subtask %}Subtask: {% endif %}";

/// Longest rendered title, in characters. Matches the `notifications.title`
/// column width; longer titles are cut and end in an ellipsis.
pub const MAX_TITLE_CHARS: usize = 255;

/// Values available to templates.
///
/// Unset optional values are left out of the template context and render
/// as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateContext {
    /// Title of the task the notification is about.
    pub task_title: String,
    /// Whether the task is a subtask.
    pub subtask: bool,
    /// Display name of the person who acted.
    pub actor: String,
    /// Days before the deadline, for reminders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Current deadline, formatted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Deadline before an edit, formatted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_deadline: Option<String>,
    /// Current status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Status before an edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    /// Current priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Comment verb: `added`, `updated` or `deleted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Comment or mention excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl TemplateContext {
    /// Starts a context for a task.
    #[must_use]
    pub fn for_task(task_title: impl Into<String>, subtask: bool) -> Self {
        Self {
            task_title: task_title.into(),
            subtask,
            ..Self::default()
        }
    }

    /// Sets the acting person's display name.
    #[must_use]
    pub fn actor(mut self, name: impl Into<String>) -> Self {
        self.actor = name.into();
        self
    }

    /// Sets the current deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(format_instant(deadline));
        self
    }
}

/// Formats an instant the way every template shows dates.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn template_name(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::DeadlineReminder { .. } => "deadline_reminder",
        NotificationKind::OverdueTask => "overdue_task",
        NotificationKind::TaskStatusUpdated => "task_status_updated",
        NotificationKind::DueDateChanged => "due_date_changed",
        NotificationKind::CollaboratorsChanged => "collaborators_changed",
        NotificationKind::PriorityUpdated => "priority_updated",
        NotificationKind::DescriptionUpdated => "description_updated",
        NotificationKind::NameUpdated => "name_updated",
        NotificationKind::TaskUpdated => "task_updated",
        NotificationKind::CommentsUpdated => "comments_updated",
        NotificationKind::Mention => "mention",
    }
}

/// Returns the (title, message) template pair for `kind`. Titles omit the
/// subtask prefix, which [`render`] adds.
fn templates_for(kind: NotificationKind) -> (&'static str, &'static str) {
    match kind {
        NotificationKind::DeadlineReminder { .. } => (
            "Deadline in {{ days }} day{% if days != 1 %}s{% endif %}: {{ task_title }}",
            "\"{{ task_title }}\" is due on {{ deadline }}.",
        ),
        NotificationKind::OverdueTask => (
            "Task overdue: {{ task_title }}",
            "\"{{ task_title }}\" was due on {{ deadline }} and is not done yet.",
        ),
        NotificationKind::TaskStatusUpdated => (
            "Status updated: {{ task_title }}",
            "{{ actor }} moved \"{{ task_title }}\"\
             {% if previous_status %} from {{ previous_status }}{% endif %} to {{ status }}.",
        ),
        NotificationKind::DueDateChanged => (
            "Due date changed: {{ task_title }}",
            "{{ actor }} changed the due date of \"{{ task_title }}\"\
             {% if previous_deadline %} from {{ previous_deadline }}{% endif %} to {{ deadline }}.",
        ),
        NotificationKind::CollaboratorsChanged => (
            "Collaborators changed: {{ task_title }}",
            "{{ actor }} updated the collaborators on \"{{ task_title }}\".",
        ),
        NotificationKind::PriorityUpdated => (
            "Priority updated: {{ task_title }}",
            "{{ actor }} set the priority of \"{{ task_title }}\" to {{ priority }}.",
        ),
        NotificationKind::DescriptionUpdated => (
            "Description updated: {{ task_title }}",
            "{{ actor }} edited the description of \"{{ task_title }}\".",
        ),
        NotificationKind::NameUpdated => (
            "Task name updated: {{ task_title }}",
            "{{ actor }} renamed a task to \"{{ task_title }}\".",
        ),
        NotificationKind::TaskUpdated => (
            "Task updated: {{ task_title }}",
            "{{ actor }} updated \"{{ task_title }}\".",
        ),
        NotificationKind::CommentsUpdated => (
            "Comments updated: {{ task_title }}",
            "{% if action == 'added' %}New comment added{% else %}Comment {{ action }}{% endif %} \
             by {{ actor }}{% if excerpt %}: {{ excerpt }}{% endif %}",
        ),
        NotificationKind::Mention => (
            "You were mentioned in: {{ task_title }}",
            "{{ actor }} mentioned you{% if excerpt %}: {{ excerpt }}{% endif %}",
        ),
    }
}

/// Renders the title and message for `kind`.
///
/// # Errors
///
/// Returns [`NotificationDomainError::Template`] when rendering fails.
pub fn render(
    kind: NotificationKind,
    context: &TemplateContext,
) -> Result<RenderedContent, NotificationDomainError> {
    let name = template_name(kind);
    let (title, message) = templates_for(kind);
    let environment = Environment::new();
    let render_one = |template: &str| {
        environment
            .render_str(template, context)
            .map_err(|error| NotificationDomainError::Template {
                name: name.to_owned(),
                reason: error.to_string(),
            })
    };

    Ok(RenderedContent {
        title: fit_title(render_one(&format!("{SUBTASK_PREFIX}{title}"))?),
        message: render_one(message)?,
    })
}

fn fit_title(title: String) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title;
    }
    let mut fitted: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
    fitted.push('…');
    fitted
}
