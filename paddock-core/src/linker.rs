//! Materializes a match as a hardlink, copy, or symlink (spec.md §4.9).
//! Grounded on `ferrex-core`'s atomic rename-into-place convention
//! (already used by `MetadataStore::write_index_atomic`), generalized
//! to file payloads instead of JSON index entries.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use paddock_model::LinkMode;
use uuid::Uuid;

use crate::error::LinkError;
use crate::fingerprint;

/// Linux `EXDEV`: "Invalid cross-device link", returned by `link(2)`
/// when source and destination are on different filesystems.
const EXDEV: i32 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyLinked,
    Replaced,
}

/// What the incoming and the currently-recorded match bring to the
/// overwrite decision (spec.md §4.9 specificity, spec.md GLOSSARY
/// "Specificity": lower pattern priority and exact, non-fuzzy session
/// tokens both increase specificity).
#[derive(Debug, Clone, Copy)]
pub struct Specificity {
    pub priority: i32,
    pub fuzzy_session: bool,
}

/// True when `incoming` is strictly more specific than `existing`:
/// priority is compared first (lower wins); when priority ties, an
/// exact session-token match outranks a fuzzy one.
fn is_more_specific(incoming: Specificity, existing: Specificity) -> bool {
    if incoming.priority != existing.priority {
        return incoming.priority < existing.priority;
    }
    existing.fuzzy_session && !incoming.fuzzy_session
}

/// Performs `mode` from `source` to `destination`.
///
/// `incoming` is the specificity of the match producing this link;
/// `existing`, when known (from `ProcessedCache`), is the specificity of
/// whatever currently occupies `destination`. When `existing` is `None`
/// the destination wasn't produced by paddock and is never overwritten.
pub async fn link(
    source: &Path,
    destination: &Path,
    mode: LinkMode,
    allow_cross_device_fallback: bool,
    incoming: Specificity,
    existing: Option<Specificity>,
) -> Result<LinkOutcome, LinkError> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::symlink_metadata(destination).await {
        Ok(existing_meta) => {
            if same_content(source, destination, &existing_meta, mode).await? {
                return Ok(LinkOutcome::AlreadyLinked);
            }
            let should_replace = match existing {
                Some(existing) => is_more_specific(incoming, existing),
                None => false,
            };
            if !should_replace {
                return Err(LinkError::DestinationConflict(
                    destination.display().to_string(),
                ));
            }
            replace_atomically(source, destination, mode, allow_cross_device_fallback).await?;
            Ok(LinkOutcome::Replaced)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            create_new(source, destination, mode, allow_cross_device_fallback).await?;
            Ok(LinkOutcome::Created)
        }
        Err(e) => Err(LinkError::Io(e)),
    }
}

async fn same_content(
    source: &Path,
    destination: &Path,
    existing_meta: &std::fs::Metadata,
    mode: LinkMode,
) -> Result<bool, LinkError> {
    match mode {
        LinkMode::Hardlink => {
            let source_meta = tokio::fs::metadata(source).await.map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    LinkError::SourceVanished(source.display().to_string())
                } else {
                    LinkError::Io(e)
                }
            })?;
            Ok(source_meta.dev() == existing_meta.dev() && source_meta.ino() == existing_meta.ino())
        }
        LinkMode::Copy | LinkMode::Symlink => {
            if !destination.exists() {
                return Ok(false);
            }
            let source_digest = fingerprint::digest_file(source)
                .await
                .map_err(|_| LinkError::SourceVanished(source.display().to_string()))?;
            let dest_digest = fingerprint::digest_file(destination)
                .await
                .unwrap_or_default();
            Ok(source_digest == dest_digest)
        }
    }
}

async fn create_new(
    source: &Path,
    destination: &Path,
    mode: LinkMode,
    allow_cross_device_fallback: bool,
) -> Result<(), LinkError> {
    match mode {
        LinkMode::Hardlink => match tokio::fs::hard_link(source, destination).await {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(EXDEV) => {
                if allow_cross_device_fallback {
                    copy_atomically(source, destination).await
                } else {
                    Err(LinkError::CrossDeviceLink(destination.display().to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LinkError::SourceVanished(source.display().to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(LinkError::PermissionDenied(destination.display().to_string()))
            }
            Err(e) => Err(LinkError::Io(e)),
        },
        LinkMode::Copy => copy_atomically(source, destination).await,
        LinkMode::Symlink => tokio::fs::symlink(source, destination).await.map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                LinkError::PermissionDenied(destination.display().to_string())
            } else {
                LinkError::Io(e)
            }
        }),
    }
}

async fn replace_atomically(
    source: &Path,
    destination: &Path,
    mode: LinkMode,
    allow_cross_device_fallback: bool,
) -> Result<(), LinkError> {
    tokio::fs::remove_file(destination).await.ok();
    create_new(source, destination, mode, allow_cross_device_fallback).await
}

/// Copies `source` into a sibling temp file, then renames into place so
/// no partial file is ever visible at `destination`.
async fn copy_atomically(source: &Path, destination: &Path) -> Result<(), LinkError> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    let tmp = parent.join(format!(".paddock-{}.tmp", Uuid::new_v4()));
    tokio::fs::copy(source, &tmp).await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LinkError::SourceVanished(source.display().to_string())
        } else {
            LinkError::Io(e)
        }
    })?;
    tokio::fs::rename(&tmp, destination).await?;
    Ok(())
}

/// Absolute sibling-temp-file path for the atomic-copy convention
/// above, exposed so callers (and tests) can assert no temp file is
/// left behind after a pass.
pub fn temp_path_pattern(destination_dir: &Path) -> PathBuf {
    destination_dir.join(".paddock-*.tmp")
}
