//! `RefreshTrigger` implementation: fires a webhook the downstream
//! library server listens on, carrying the pass summary as context.

use paddock_contracts::{PassSummary, RefreshTrigger};

pub struct WebhookRefreshTrigger {
    client: reqwest::Client,
    url: String,
}

impl WebhookRefreshTrigger {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

impl RefreshTrigger for WebhookRefreshTrigger {
    async fn trigger(&self, summary: &PassSummary) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(summary)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("refresh webhook returned {}", response.status()))
        }
    }
}

/// Unifies the "no `refresh_trigger` configured" and "webhook
/// configured" cases behind one concrete type, so `main` doesn't need
/// `dyn RefreshTrigger` (the trait's async-fn-in-trait signature isn't
/// object-safe without boxing its returned future).
pub enum OptionalRefreshTrigger {
    Webhook(WebhookRefreshTrigger),
    None,
}

impl OptionalRefreshTrigger {
    pub fn from_config(url: Option<String>) -> Self {
        match url {
            Some(url) => Self::Webhook(WebhookRefreshTrigger::new(url)),
            None => Self::None,
        }
    }
}

impl RefreshTrigger for OptionalRefreshTrigger {
    async fn trigger(&self, summary: &PassSummary) -> Result<(), String> {
        match self {
            Self::Webhook(t) => t.trigger(summary).await,
            Self::None => Ok(()),
        }
    }
}
