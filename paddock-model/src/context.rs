use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fully resolved dictionary passed to destination templates.
///
/// Keys match spec.md §6 exactly; `captures` holds any named regex
/// capture group produced by the matching pattern, merged in at render
/// time alongside the fixed keys below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchContext {
    pub sport_id: String,
    pub sport_name: String,

    pub show_title: String,
    pub show_display_title: String,

    pub season_title: String,
    pub season_number: u32,
    pub season_round: u32,
    pub season_year: Option<i32>,

    pub episode_title: String,
    pub episode_number: u32,
    pub episode_display_number: String,
    pub episode_summary: Option<String>,
    pub episode_originally_available: Option<String>,

    pub source_filename: String,
    pub source_stem: String,
    pub extension: String,
    pub suffix: String,
    pub relative_source: String,

    pub captures: BTreeMap<String, String>,
}

impl MatchContext {
    /// Look up a template key, checking the fixed fields first and
    /// falling back to captured regex groups.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "sport_id" => Some(self.sport_id.clone()),
            "sport_name" => Some(self.sport_name.clone()),
            "show_title" => Some(self.show_title.clone()),
            "show_display_title" => Some(self.show_display_title.clone()),
            "season_title" => Some(self.season_title.clone()),
            "season_number" => Some(self.season_number.to_string()),
            "season_round" => Some(self.season_round.to_string()),
            "season_year" => self.season_year.map(|y| y.to_string()),
            "episode_title" => Some(self.episode_title.clone()),
            "episode_number" => Some(self.episode_number.to_string()),
            "episode_display_number" => Some(self.episode_display_number.clone()),
            "episode_summary" => self.episode_summary.clone(),
            "episode_originally_available" => {
                self.episode_originally_available.clone()
            }
            "source_filename" => Some(self.source_filename.clone()),
            "source_stem" => Some(self.source_stem.clone()),
            "extension" => Some(self.extension.clone()),
            "suffix" => Some(self.suffix.clone()),
            "relative_source" => Some(self.relative_source.clone()),
            other => self.captures.get(other).cloned(),
        }
    }
}
