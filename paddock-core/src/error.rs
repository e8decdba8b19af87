use thiserror::Error;

/// Errors surfaced by `FileFingerprint` (spec.md §4.1).
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file unreadable: {0}")]
    Unreadable(String),
}

/// Errors surfaced by `MetadataStore`/`MetadataNormalizer` (spec.md §4.2,
/// §4.4).
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata unavailable for sport '{0}'")]
    MetadataUnavailable(String),
    #[error("normalization failed for sport '{0}': {1}")]
    NormalizationFailed(String, String),
    #[error("cache I/O error: {0}")]
    Cache(String),
}

/// Errors surfaced by `PatternCompiler` (spec.md §4.5).
#[derive(Debug, Error)]
pub enum PatternCompileError {
    #[error("invalid regex in rule '{rule_id}': {source}")]
    InvalidRegex {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule '{rule_id}' selector references unknown capture group '{group}'")]
    UnknownCaptureGroup { rule_id: String, group: String },
    #[error("rule '{rule_id}' uses week selector but sport metadata has no weekly index")]
    MissingWeeklyIndex { rule_id: String },
}

/// Failure kinds for `MatchingEngine` (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no pattern matched")]
    NoPatternMatched,
    #[error("season not found")]
    SeasonNotFound,
    #[error("episode not found")]
    EpisodeNotFound,
    #[error("ambiguous match")]
    Ambiguous,
    #[error("sport disabled")]
    SportDisabled,
    #[error("ignored by filter")]
    IgnoredByFilter,
}

/// Errors surfaced by `DestinationBuilder` (spec.md §4.8).
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("template references missing key '{0}'")]
    TemplateError(String),
    #[error("rendered path is unsafe: {0}")]
    UnsafePath(String),
    #[error("rendered name too long: {0}")]
    NameTooLong(String),
}

/// Errors surfaced by `Linker` (spec.md §4.9).
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("destination conflict at {0}")]
    DestinationConflict(String),
    #[error("cross-device link not permitted: {0}")]
    CrossDeviceLink(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("source vanished: {0}")]
    SourceVanished(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by `ProcessedCache` (spec.md §4.10).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors surfaced by `Watcher` (spec.md §4.11).
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch path {path}: {source}")]
    Setup {
        path: String,
        #[source]
        source: notify::Error,
    },
}

/// Runtime-level error kinds that apply across the processor
/// (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("cancelled")]
    Cancelled,
    #[error("timeout")]
    Timeout,
}
