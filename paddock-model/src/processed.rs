use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::CompiledPatternId;

/// The filesystem action taken for a matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    Hardlink,
    Copy,
    Symlink,
}

/// A durable record of an already-processed source, used by
/// `ProcessedCache` to suppress duplicate work across passes and by the
/// `Linker` to decide whether a later, competing match may overwrite
/// this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub source_fingerprint: String,
    pub destination_path: String,
    pub link_mode: LinkMode,
    pub pattern_id: CompiledPatternId,
    /// The pattern priority (lower wins) that produced this record, or
    /// the structured-pass sentinel when no declared rule backs it.
    pub priority: i32,
    /// Whether episode resolution fell back to a fuzzy session-token
    /// match rather than an exact one (spec.md §4.9 specificity).
    pub fuzzy_session: bool,
    pub created_at: DateTime<Utc>,
}
