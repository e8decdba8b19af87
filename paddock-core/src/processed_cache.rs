//! Durable `source_fingerprint -> ProcessedRecord` store used to skip
//! sources a prior pass already linked (spec.md §4.10). A thin typed
//! facade over `cacache`, in the same style as `ferrex-core`'s
//! `ImageBlobStore`, keyed by fingerprint instead of content hash.

use std::path::PathBuf;
use std::sync::Mutex;

use paddock_model::ProcessedRecord;

use crate::error::CacheError;

const KEY_PREFIX: &str = "paddock/processed/v1/";

fn key_for(source_fingerprint: &str) -> String {
    format!("{KEY_PREFIX}{source_fingerprint}")
}

/// Staged writes accumulate in memory and are only persisted when
/// `commit` is called, so a pass that's cancelled mid-run leaves the
/// cache exactly as it was before the pass started.
pub struct ProcessedCache {
    root: PathBuf,
    pending: Mutex<Vec<ProcessedRecord>>,
}

impl ProcessedCache {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Looks up a stored record. A corrupted entry (failed integrity
    /// check or undeserializable JSON) is treated as a cache miss; the
    /// caller logs and reprocesses rather than failing the pass.
    pub async fn get(&self, source_fingerprint: &str) -> Option<ProcessedRecord> {
        let key = key_for(source_fingerprint);
        match cacache::read(&self.root, &key).await {
            Ok(bytes) => match serde_json::from_slice::<ProcessedRecord>(&bytes) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(fingerprint = source_fingerprint, error = %e, "processed cache entry is corrupt, treating as miss");
                    None
                }
            },
            Err(cacache::Error::EntryNotFound(_, _)) => None,
            Err(e) => {
                tracing::warn!(fingerprint = source_fingerprint, error = %e, "processed cache read failed, treating as miss");
                None
            }
        }
    }

    /// True when `source_fingerprint` has already produced
    /// `destination_path` and the caller hasn't forced a reprocess.
    pub async fn should_skip(
        &self,
        source_fingerprint: &str,
        destination_path: &str,
        force_reprocess: bool,
    ) -> bool {
        if force_reprocess {
            return false;
        }
        match self.get(source_fingerprint).await {
            Some(record) => record.destination_path == destination_path,
            None => false,
        }
    }

    /// Queues a record for the next `commit`. Does not touch disk.
    pub fn stage(&self, record: ProcessedRecord) {
        self.pending.lock().expect("processed cache lock poisoned").push(record);
    }

    /// Persists every staged record. `cacache::write` is atomic per
    /// key; committing the whole batch here (rather than as each
    /// record is produced) keeps a cancelled pass from leaving a
    /// partially-applied cache.
    pub async fn commit(&self) -> Result<usize, CacheError> {
        let records = std::mem::take(&mut *self.pending.lock().expect("processed cache lock poisoned"));
        let count = records.len();
        for record in records {
            let key = key_for(&record.source_fingerprint);
            let bytes = serde_json::to_vec(&record)?;
            cacache::write(&self.root, &key, bytes)
                .await
                .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;
        }
        Ok(count)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("processed cache lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use paddock_model::{CompiledPatternId, LinkMode};

    fn record(fingerprint: &str, destination: &str) -> ProcessedRecord {
        ProcessedRecord {
            source_fingerprint: fingerprint.to_string(),
            destination_path: destination.to_string(),
            link_mode: LinkMode::Hardlink,
            pattern_id: CompiledPatternId::new("f1-round"),
            priority: 10,
            fuzzy_session: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn miss_before_any_commit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path().to_path_buf());
        assert!(cache.get("abc123").await.is_none());
    }

    #[tokio::test]
    async fn staged_records_are_invisible_until_committed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path().to_path_buf());
        cache.stage(record("abc123", "/media/sports/race.mkv"));
        assert!(cache.get("abc123").await.is_none());

        cache.commit().await.unwrap();
        let stored = cache.get("abc123").await.unwrap();
        assert_eq!(stored.destination_path, "/media/sports/race.mkv");
    }

    #[tokio::test]
    async fn should_skip_matches_fingerprint_and_destination() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ProcessedCache::new(dir.path().to_path_buf());
        cache.stage(record("abc123", "/media/sports/race.mkv"));
        cache.commit().await.unwrap();

        assert!(cache.should_skip("abc123", "/media/sports/race.mkv", false).await);
        assert!(!cache.should_skip("abc123", "/media/sports/other.mkv", false).await);
        assert!(!cache.should_skip("abc123", "/media/sports/race.mkv", true).await);
        assert!(!cache.should_skip("unknown", "/media/sports/race.mkv", false).await);
    }
}
