//! Content-addressed digests used as cache and change-detection keys
//! (spec.md §4.1). SHA-256, rendered as lowercase hex.

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::FingerprintError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Digests arbitrary UTF-8 text. No I/O, cannot fail.
pub fn digest_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex(&hasher.finalize())
}

/// Digests file content, streamed in fixed-size chunks so large media
/// files never need to be buffered whole.
pub async fn digest_file(path: &std::path::Path) -> Result<String, FingerprintError> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FingerprintError::NotFound(path.display().to_string())
        } else {
            FingerprintError::Unreadable(format!("{}: {e}", path.display()))
        }
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| FingerprintError::Unreadable(format!("{}: {e}", path.display())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String cannot fail");
    }
    out
}

/// Stable request fingerprint for a metadata fetch, derived from the
/// sport slug and any selector parameters (spec.md §4.2).
pub fn request_fingerprint(sport_id: &str, params: &[(&str, &str)]) -> String {
    let mut parts = vec![sport_id.to_string()];
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    for (k, v) in sorted {
        parts.push(format!("{k}={v}"));
    }
    digest_text(&parts.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_text_is_fixed_width_lowercase_hex() {
        let d = digest_text("formula1");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_text_is_deterministic() {
        assert_eq!(digest_text("nba"), digest_text("nba"));
        assert_ne!(digest_text("nba"), digest_text("nhl"));
    }

    #[test]
    fn request_fingerprint_is_order_independent_over_params() {
        let a = request_fingerprint("nba", &[("season", "2025"), ("round", "1")]);
        let b = request_fingerprint("nba", &[("round", "1"), ("season", "2025")]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn digest_file_missing_is_not_found() {
        let err = digest_file(std::path::Path::new("/nonexistent/paddock-test"))
            .await
            .unwrap_err();
        assert!(matches!(err, FingerprintError::NotFound(_)));
    }

    #[tokio::test]
    async fn digest_file_matches_digest_text_for_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let from_file = digest_file(&path).await.unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"hello");
        assert_eq!(from_file, hex(&hasher.finalize()));
    }
}
