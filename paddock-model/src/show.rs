use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pattern::PatternRule;

/// A sport's canonical show: the top of the Show/Season/Episode hierarchy.
///
/// `display_title` preserves the source's original casing (acronyms like
/// "NTT" must never be title-cased); `title` is the normalized form used
/// for lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    pub title: String,
    pub display_title: String,
    pub aliases: Vec<String>,
    pub seasons: Vec<Season>,
}

impl Show {
    /// Case-folded, deduplicated alias set, including the title itself.
    pub fn alias_set(&self) -> HashSet<String> {
        let mut set: HashSet<String> = self
            .aliases
            .iter()
            .map(|a| a.to_lowercase())
            .collect();
        set.insert(self.title.to_lowercase());
        set
    }

    pub fn season(&self, number: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.number == number)
    }
}

/// A season within a `Show`. `number` is the canonical season index;
/// `round_number` is the sport-specific round when distinct from `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub key: String,
    pub number: u32,
    pub title: String,
    pub round_number: Option<u32>,
    pub year: Option<i32>,
    pub aliases: Vec<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    /// `round_number` when the source supplied one, otherwise `number`.
    pub fn effective_round(&self) -> u32 {
        self.round_number.unwrap_or(self.number)
    }

    pub fn episode(&self, number: u32) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.number == number)
    }

    /// Episodes whose `originally_available` date falls on `date`.
    pub fn episodes_on(&self, date: NaiveDate) -> impl Iterator<Item = &Episode> {
        self.episodes
            .iter()
            .filter(move |e| e.originally_available == Some(date))
    }
}

/// An episode (or session) within a `Season`.
///
/// `display_number` may differ from `number` for league-specific
/// formatting (e.g. a numeric `number` but a textual `display_number`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub display_number: String,
    pub title: String,
    pub summary: Option<String>,
    pub originally_available: Option<NaiveDate>,
    /// Sport-specific weekly index, when the `week` season selector mode
    /// is in use; `None` when the sport's metadata does not carry one.
    pub week: Option<u32>,
    pub aliases: Vec<String>,
    /// Case-folded union of title, aliases, and pattern-injected session
    /// aliases. Never contains empty strings (normalizer invariant).
    pub session_tokens: Vec<String>,
}

/// An immutable, per-pass snapshot of everything needed to match files for
/// one sport: its show tree, compiled patterns (kept opaque here; the
/// compiled regex lives in `paddock-core`), and the metadata fingerprint
/// used to decide whether patterns must be recompiled.
#[derive(Debug, Clone)]
pub struct SportRuntime {
    pub sport_id: String,
    pub show: Show,
    pub rules: Vec<PatternRule>,
    pub metadata_fingerprint: String,
}

impl SportRuntime {
    /// Rules sorted ascending by priority (lower wins), as the matching
    /// engine requires.
    pub fn rules_by_priority(&self) -> Vec<&PatternRule> {
        let mut rules: Vec<&PatternRule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.priority);
        rules
    }
}
