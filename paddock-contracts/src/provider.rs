use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw, unnormalized metadata as returned by a backend for one sport.
/// Shape mirrors spec.md §6's provider contract field-for-field; it is
/// turned into a `paddock_model::Show` by `MetadataNormalizer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMetadata {
    pub show: RawShow,
    pub seasons: Vec<RawSeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawShow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSeason {
    pub key: String,
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub round: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub episodes: Vec<RawEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEpisode {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub originally_available: Option<String>,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Errors a provider fetch can surface. `RateLimited` and
/// `TransientNetwork` are retriable within a single fetch (see
/// `RetryPolicy`); `NotFound` and `AuthFailure` are terminal for that
/// sport.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited")]
    RateLimited,
    #[error("transient network error: {0}")]
    TransientNetwork(String),
    #[error("sport not found upstream")]
    NotFound,
    #[error("authentication failed")]
    AuthFailure,
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientNetwork(_))
    }
}

/// Fetches raw per-sport metadata from a configured backend.
///
/// Implementations own retry-within-a-fetch only (bounded by whatever
/// `RetryPolicy` they're constructed with); acceptance of stale results
/// across fetches is `MetadataStore`'s concern, not the provider's.
pub trait MetadataProvider: Send + Sync {
    fn fetch(
        &self,
        sport_id: &str,
    ) -> impl std::future::Future<Output = Result<RawMetadata, ProviderError>> + Send;
}
