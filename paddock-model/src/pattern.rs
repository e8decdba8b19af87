use serde::{Deserialize, Serialize};

/// How a pattern rule resolves the season for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonSelectorMode {
    /// Match the captured round number against `Season::effective_round`.
    Round,
    /// Match the captured value against `Season::key` directly.
    Key,
    /// Match the captured value against `Season::title` (case-insensitive).
    Title,
    /// Positional: the Nth season in declaration order.
    Sequential,
    /// Match a captured week index against a season-scoped weekly index.
    Week,
    /// Combine captured groups through `value_template` into a date and
    /// select the season containing an episode with an equal
    /// `originally_available`.
    Date,
}

/// Declarative season resolution for one pattern rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSelector {
    pub mode: SeasonSelectorMode,
    /// Name of the regex capture group carrying the primary value
    /// (ignored for `Sequential`).
    pub group: Option<String>,
    /// For `Date`: a template like `"{y}-{m:02}-{d:02}"` combining named
    /// capture groups into an ISO date string.
    pub value_template: Option<String>,
}

/// How a pattern rule resolves the episode within the selected season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeSelectorMode {
    /// The capture group is the episode number directly.
    Direct,
    /// The capture group is looked up against session aliases (exact,
    /// then fuzzy >= 0.85).
    SessionAlias,
}

/// Declarative episode resolution for one pattern rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSelector {
    pub mode: EpisodeSelectorMode,
    pub group: String,
    /// When the primary resolution fails, fall back to matching the
    /// capture against episode titles.
    pub allow_title_fallback: bool,
}

/// A declarative, pre-compilation pattern rule as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub id: String,
    pub regex: String,
    pub description: String,
    /// Lower priority wins when two patterns would otherwise both match.
    pub priority: i32,
    pub season_selector: SeasonSelector,
    pub episode_selector: EpisodeSelector,
    #[serde(default)]
    pub session_aliases: Vec<SessionAlias>,
    #[serde(default)]
    pub destination_overrides: Option<DestinationOverrides>,
}

/// A single alias mapping a pattern-local token to a canonical session
/// name, injected into the sport's `SessionLookupIndex` at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAlias {
    pub alias: String,
    pub canonical: String,
}

/// Per-pattern overrides for the destination templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DestinationOverrides {
    pub root_folder: Option<String>,
    pub season_folder: Option<String>,
    pub filename: Option<String>,
}

/// Opaque identity for a pattern after compilation, carried through match
/// results and `ProcessedRecord` for overwrite-priority comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompiledPatternId(pub String);

impl CompiledPatternId {
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self(rule_id.into())
    }
}
