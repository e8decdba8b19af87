//! Default `MetadataProvider`: a thin `reqwest` client against a
//! configurable sports-metadata backend, grounded on `ferrex-core`'s
//! provider-struct-with-client shape (`tmdb_api_provider.rs`), but using
//! `reqwest` directly since no real "sports TMDB" client crate exists in
//! the ecosystem.

use std::time::Duration;

use paddock_contracts::{MetadataProvider, ProviderError, RawMetadata};
use tracing::{debug, warn};

use paddock_contracts::RetryPolicy;

pub struct HttpMetadataProvider {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    deadline: Duration,
}

impl HttpMetadataProvider {
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy, deadline: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry,
            deadline,
        }
    }

    async fn fetch_once(&self, sport_id: &str) -> Result<RawMetadata, ProviderError> {
        let url = format!("{}/sports/{}", self.base_url.trim_end_matches('/'), sport_id);
        let response = tokio::time::timeout(self.deadline, self.client.get(&url).send())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::TransientNetwork(e.to_string())
                }
            })?;

        match response.status() {
            status if status.is_success() => response
                .json::<RawMetadata>()
                .await
                .map_err(|e| ProviderError::Malformed(e.to_string())),
            status if status.as_u16() == 404 => Err(ProviderError::NotFound),
            status if status.as_u16() == 401 || status.as_u16() == 403 => {
                Err(ProviderError::AuthFailure)
            }
            status if status.as_u16() == 429 => Err(ProviderError::RateLimited),
            status if status.is_server_error() => {
                Err(ProviderError::TransientNetwork(format!("status {status}")))
            }
            status => Err(ProviderError::Malformed(format!("unexpected status {status}"))),
        }
    }
}

impl MetadataProvider for HttpMetadataProvider {
    async fn fetch(&self, sport_id: &str) -> Result<RawMetadata, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(sport_id).await {
                Ok(payload) => return Ok(payload),
                Err(err) if err.is_retriable() && attempt + 1 < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for_attempt(attempt);
                    warn!(sport_id, attempt, ?backoff, %err, "retrying metadata fetch");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(sport_id, %err, "metadata fetch terminal");
                    return Err(err);
                }
            }
        }
    }
}
