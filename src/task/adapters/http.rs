//! HTTP adapter forwarding task changes to a remote notification service.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::task::ports::{EventSinkError, TaskChange, TaskEventSink};

/// Path appended to the base URL for task change events.
const TASK_CHANGED_PATH: &str = "/api/events/task-changed";

/// Posts task changes as JSON to a sibling service.
#[derive(Debug, Clone)]
pub struct HttpTaskEventSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTaskEventSink {
    /// Creates a sink posting to `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::Unavailable`] when the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EventSinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EventSinkError::Unavailable(err.to_string()))?;
        Ok(Self {
            endpoint: format!("{}{TASK_CHANGED_PATH}", base_url.trim_end_matches('/')),
            client,
        })
    }

    /// Builds a sink from `event_sink_url`, or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::Unavailable`] when the HTTP client cannot
    /// be built.
    pub fn from_config(config: &EngineConfig) -> Result<Option<Self>, EventSinkError> {
        config
            .event_sink_url
            .as_deref()
            .map(|url| Self::new(url, config.notifier_timeout()))
            .transpose()
    }

    /// Returns the full URL events are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn payload(change: &TaskChange) -> serde_json::Value {
    let changed_fields: Vec<&str> = change
        .changed_fields
        .iter()
        .map(|field| field.as_str())
        .collect();
    json!({
        "task_id": change.task.id(),
        "title": change.task.title().as_str(),
        "actor_id": change.actor,
        "changed_fields": changed_fields,
        "status": change.task.status().as_str(),
        "previous_status": change.previous_status.map(|status| status.as_str()),
        "deadline": change.task.deadline(),
        "previous_deadline": change.previous_deadline,
    })
}

#[async_trait]
impl TaskEventSink for HttpTaskEventSink {
    async fn task_changed(&self, change: &TaskChange) -> Result<(), EventSinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload(change))
            .send()
            .await
            .map_err(|err| EventSinkError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EventSinkError::Unavailable(format!(
                "{} responded with {status}",
                self.endpoint
            )));
        }
        Ok(())
    }
}
