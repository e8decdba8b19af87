//! On-disk metadata cache, grounded on `ferrex-core`'s
//! `infra/cache/media_store.rs`: a thin typed wrapper over `cacache`
//! operated in hash-addressed mode so every read is integrity-checked
//! against the stored digest. A small JSON sidecar index tracks
//! `{fingerprint, fetched_at, integrity}` so TTL/staleness can be
//! evaluated without an extra `cacache` index lookup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cacache::Integrity;
use chrono::{DateTime, Utc};
use paddock_contracts::{MetadataProvider, ProviderError, RawMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MetadataError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    fingerprint: String,
    fetched_at: DateTime<Utc>,
    integrity: String,
}

/// A fetched payload plus whether the serving store considers it stale.
#[derive(Debug, Clone)]
pub enum ServeResult {
    Fresh(RawMetadata),
    /// Served from a stale entry because the provider was unreachable.
    Stale(RawMetadata),
}

impl ServeResult {
    pub fn into_inner(self) -> RawMetadata {
        match self {
            Self::Fresh(m) | Self::Stale(m) => m,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

pub struct MetadataStore {
    blob_root: PathBuf,
    index_dir: PathBuf,
    ttl: Duration,
}

impl MetadataStore {
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            blob_root: cache_dir.join("metadata").join("blobs"),
            index_dir: cache_dir.join("metadata").join("index"),
            ttl,
        }
    }

    /// Serves metadata for `sport_id`, following the §4.2 order: fresh
    /// from disk, then a provider fetch on miss/expiry, then stale
    /// acceptance if the fetch fails.
    pub async fn serve(
        &self,
        sport_id: &str,
        fingerprint: &str,
        provider: &impl MetadataProvider,
    ) -> Result<ServeResult, MetadataError> {
        if let Some(entry) = self.read_index(fingerprint).await? {
            if Utc::now() - entry.fetched_at < chrono::Duration::from_std(self.ttl).unwrap_or_default()
            {
                debug!(sport_id, fingerprint, "metadata cache hit (fresh)");
                let payload = self.read_blob(&entry).await?;
                return Ok(ServeResult::Fresh(payload));
            }
        }

        match provider.fetch(sport_id).await {
            Ok(payload) => {
                self.write(fingerprint, &payload).await?;
                Ok(ServeResult::Fresh(payload))
            }
            Err(err) => {
                if let Some(entry) = self.read_index(fingerprint).await? {
                    warn!(sport_id, %err, "provider fetch failed, serving stale metadata");
                    let payload = self.read_blob(&entry).await?;
                    return Ok(ServeResult::Stale(payload));
                }
                Err(self.unavailable(sport_id, err))
            }
        }
    }

    async fn write(&self, fingerprint: &str, payload: &RawMetadata) -> Result<(), MetadataError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| MetadataError::Cache(format!("encode failed: {e}")))?;

        tokio::fs::create_dir_all(&self.blob_root)
            .await
            .map_err(|e| MetadataError::Cache(e.to_string()))?;
        let integrity = cacache::write_hash(&self.blob_root, &bytes)
            .await
            .map_err(|e| MetadataError::Cache(format!("cacache write_hash: {e}")))?;

        let entry = IndexEntry {
            fingerprint: fingerprint.to_string(),
            fetched_at: Utc::now(),
            integrity: integrity.to_string(),
        };
        self.write_index_atomic(fingerprint, &entry).await
    }

    async fn read_blob(&self, entry: &IndexEntry) -> Result<RawMetadata, MetadataError> {
        let integrity: Integrity = entry
            .integrity
            .parse()
            .map_err(|e| MetadataError::Cache(format!("corrupt integrity record: {e}")))?;
        let bytes = cacache::read_hash(&self.blob_root, &integrity)
            .await
            .map_err(|e| MetadataError::Cache(format!("cacache read_hash: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| MetadataError::Cache(format!("decode failed: {e}")))
    }

    async fn read_index(&self, fingerprint: &str) -> Result<Option<IndexEntry>, MetadataError> {
        let path = self.index_path(fingerprint);
        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entry) => Ok(Some(entry)),
                Err(e) => {
                    warn!(%e, path = %path.display(), "corrupt metadata index entry, treating as miss");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MetadataError::Cache(e.to_string())),
        }
    }

    /// Writes the index entry to a sibling temp file and renames it into
    /// place, so readers never observe a partially written entry
    /// (spec.md §4.2 atomicity invariant).
    async fn write_index_atomic(
        &self,
        fingerprint: &str,
        entry: &IndexEntry,
    ) -> Result<(), MetadataError> {
        tokio::fs::create_dir_all(&self.index_dir)
            .await
            .map_err(|e| MetadataError::Cache(e.to_string()))?;
        let final_path = self.index_path(fingerprint);
        let tmp_path = self.index_dir.join(format!("{fingerprint}.{}.tmp", uuid::Uuid::new_v4()));

        let bytes = serde_json::to_vec(entry)
            .map_err(|e| MetadataError::Cache(format!("encode failed: {e}")))?;
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| MetadataError::Cache(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| MetadataError::Cache(e.to_string()))?;
        Ok(())
    }

    fn index_path(&self, fingerprint: &str) -> PathBuf {
        self.index_dir.join(format!("{fingerprint}.json"))
    }

    fn unavailable(&self, sport_id: &str, err: ProviderError) -> MetadataError {
        debug!(sport_id, %err, "no cached metadata available");
        MetadataError::MetadataUnavailable(sport_id.to_string())
    }
}

/// Re-digests cached payload bytes and compares against the stored
/// integrity, as required by the testable property in spec.md §8. Used
/// by tests and by trace diagnostics.
pub async fn verify_integrity(blob_root: &Path, integrity: &Integrity) -> bool {
    cacache::read_hash(blob_root, integrity).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_contracts::{RawEpisode, RawSeason, RawShow};

    struct StubProvider {
        payload: RawMetadata,
        fail: std::sync::atomic::AtomicBool,
    }

    impl MetadataProvider for StubProvider {
        async fn fetch(&self, _sport_id: &str) -> Result<RawMetadata, ProviderError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                Err(ProviderError::TransientNetwork("down".into()))
            } else {
                Ok(self.payload.clone())
            }
        }
    }

    fn sample() -> RawMetadata {
        RawMetadata {
            show: RawShow {
                id: "formula1".into(),
                title: "Formula 1".into(),
                aliases: vec![],
            },
            seasons: vec![RawSeason {
                key: "2025".into(),
                number: 1,
                title: "2025".into(),
                round: Some(1),
                year: Some(2025),
                aliases: vec![],
                episodes: vec![RawEpisode {
                    number: 1,
                    title: "Race".into(),
                    summary: None,
                    originally_available: None,
                    aliases: vec![],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn miss_then_fetch_then_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path(), Duration::from_secs(3600));
        let provider = StubProvider {
            payload: sample(),
            fail: std::sync::atomic::AtomicBool::new(false),
        };

        let result = store.serve("formula1", "fp1", &provider).await.unwrap();
        assert!(matches!(result, ServeResult::Fresh(_)));

        let result = store.serve("formula1", "fp1", &provider).await.unwrap();
        assert!(matches!(result, ServeResult::Fresh(_)));
    }

    #[tokio::test]
    async fn stale_accept_when_provider_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path(), Duration::from_millis(1));
        let provider = StubProvider {
            payload: sample(),
            fail: std::sync::atomic::AtomicBool::new(false),
        };
        store.serve("formula1", "fp1", &provider).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        provider.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        let result = store.serve("formula1", "fp1", &provider).await.unwrap();
        assert!(result.is_stale());
    }

    #[tokio::test]
    async fn miss_with_no_cache_and_failing_provider_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path(), Duration::from_secs(3600));
        let provider = StubProvider {
            payload: sample(),
            fail: std::sync::atomic::AtomicBool::new(true),
        };
        let err = store.serve("formula1", "fp1", &provider).await.unwrap_err();
        assert!(matches!(err, MetadataError::MetadataUnavailable(_)));
    }
}
