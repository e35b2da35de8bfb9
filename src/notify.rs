//! # Notifications
//!
//! Best-effort, fire-and-forget delivery of the terminal run status to the
//! configured sinks (chat webhooks, the log). Notification is observability,
//! not a correctness gate: delivery failures are swallowed and logged, never
//! propagated, and exactly one notification goes out per run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::state_machine::RunStatus;

/// Terminal status message for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub run_id: String,
    pub status: RunStatus,
    pub summary: String,
    pub sent_at: DateTime<Utc>,
}

/// One delivery target
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<(), String>;
}

/// JSON POST to a chat-style webhook
pub struct WebhookSink {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("webhook returned {}", response.status()))
        }
    }
}

/// Sink that writes the notification to the structured log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), String> {
        info!(
            run_id = %notification.run_id,
            status = %notification.status,
            "📣 {}",
            notification.summary
        );
        Ok(())
    }
}

/// Fan-out notifier over the configured sinks
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
    notified: Mutex<HashSet<String>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Deliver the terminal status to every sink, swallowing failures.
    /// A run that was already notified is skipped.
    pub async fn notify(&self, run_id: &str, status: RunStatus, summary: impl Into<String>) {
        if !self.notified.lock().insert(run_id.to_string()) {
            warn!(run_id = %run_id, "Notification already sent for run, skipping");
            return;
        }

        let notification = Notification {
            run_id: run_id.to_string(),
            status,
            summary: summary.into(),
            sent_at: Utc::now(),
        };

        let deliveries = self.sinks.iter().map(|sink| {
            let notification = &notification;
            async move { (sink.name().to_string(), sink.deliver(notification).await) }
        });

        for (sink, result) in join_all(deliveries).await {
            if let Err(message) = result {
                // Observability failures never fail the run
                warn!(
                    run_id = %notification.run_id,
                    sink = %sink,
                    error = %message,
                    "Notification delivery failed"
                );
            }
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}
