use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The filesystem action a successful match is materialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    #[default]
    Hardlink,
    Copy,
    Symlink,
}

/// Top-level configuration document (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub source_dir: Option<PathBuf>,
    pub destination_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub skip_existing: bool,
    #[serde(default)]
    pub link_mode: LinkMode,
    #[serde(default)]
    pub allow_cross_device_fallback: bool,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub sports: Vec<SportConfig>,

    #[serde(default)]
    pub post_run: PostRunConfig,

    #[serde(default)]
    pub min_file_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval: u64,
}

fn default_debounce_seconds() -> u64 {
    5
}

fn default_reconcile_interval() -> u64 {
    900
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SportConfig {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub show_ref: String,
    #[serde(default)]
    pub source_globs: Vec<String>,
    #[serde(default)]
    pub source_extensions: Vec<String>,
    pub pattern_sets: Vec<PatternRuleConfig>,
    #[serde(default)]
    pub allow_unmatched: bool,
    #[serde(default)]
    pub team_alias_map: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub variants: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Mirrors `paddock_model::pattern::PatternRule` but as read from the
/// config file, before regex compilation and group validation (which
/// `PatternCompiler` performs in `paddock-core`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PatternRuleConfig {
    pub id: String,
    pub regex: String,
    #[serde(default)]
    pub description: String,
    pub priority: i32,
    pub season_selector: paddock_model::SeasonSelector,
    pub episode_selector: paddock_model::EpisodeSelector,
    #[serde(default)]
    pub session_aliases: Vec<paddock_model::pattern::SessionAlias>,
    #[serde(default)]
    pub destination_overrides: Option<paddock_model::pattern::DestinationOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PostRunConfig {
    pub refresh_trigger: Option<String>,
    #[serde(default)]
    pub notifications: Vec<String>,
    #[serde(default)]
    pub traces_enabled: bool,
}
