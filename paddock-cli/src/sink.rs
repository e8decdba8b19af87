//! `NotificationSink` implementations available to the CLI: a
//! tracing-backed default, and webhook delivery for configured
//! `post_run.notifications` endpoints.

use paddock_contracts::{NotificationEvent, NotificationSink};
use tracing::{info, warn};

/// Always logs every event at `info` level. Used as the baseline sink
/// regardless of configuration, mirroring the teacher's habit of
/// logging domain events even when an external sink is also wired up.
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    async fn emit(&self, event: &NotificationEvent) {
        match event {
            NotificationEvent::PerFileLinked {
                source,
                destination,
                sport_id,
            } => info!(sport_id = %sport_id, source = %source, destination = %destination, "linked"),
            NotificationEvent::PassSummary(summary) => {
                info!(linked = summary.linked, "pass summary")
            }
            NotificationEvent::RefreshRequested => info!("refresh requested"),
        }
    }
}

/// Posts each event as JSON to every configured webhook URL,
/// best-effort (delivery failure is logged, never propagated).
pub struct WebhookNotificationSink {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookNotificationSink {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }
}

impl NotificationSink for WebhookNotificationSink {
    async fn emit(&self, event: &NotificationEvent) {
        for url in &self.urls {
            if let Err(e) = self.client.post(url).json(event).send().await {
                warn!(url = %url, error = %e, "notification webhook delivery failed");
            }
        }
    }
}

/// Fans an event out to both the tracing sink and every webhook sink.
pub struct CompositeNotificationSink {
    tracing: TracingNotificationSink,
    webhook: WebhookNotificationSink,
}

impl CompositeNotificationSink {
    pub fn new(webhook_urls: Vec<String>) -> Self {
        Self {
            tracing: TracingNotificationSink,
            webhook: WebhookNotificationSink::new(webhook_urls),
        }
    }
}

impl NotificationSink for CompositeNotificationSink {
    async fn emit(&self, event: &NotificationEvent) {
        self.tracing.emit(event).await;
        self.webhook.emit(event).await;
    }
}
