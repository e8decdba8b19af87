//! Converts `RawMetadata` into the canonical `Show`/`Season`/`Episode`
//! model (spec.md §4.4), grounded on `ferrex-core`'s preference for
//! small, focused free functions over a stateful "normalizer object".

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use paddock_contracts::{RawEpisode, RawMetadata, RawSeason};
use paddock_model::{Episode, Season, Show};

use crate::error::MetadataError;

/// Normalizes one sport's raw metadata into a `Show`.
///
/// Invariants enforced here (spec.md §4.4): every season has
/// `number >= 0` (guaranteed by `u32`); episode numbers are unique
/// within a season; `session_tokens` never contains an empty string.
pub fn normalize(sport_id: &str, raw: RawMetadata) -> Result<Show, MetadataError> {
    let display_title = raw.show.title.clone();
    let title = normalize_title(&raw.show.title);

    let mut seasons = Vec::with_capacity(raw.seasons.len());
    for raw_season in raw.seasons {
        seasons.push(normalize_season(sport_id, raw_season)?);
    }

    Ok(Show {
        id: raw.show.id,
        title,
        display_title,
        aliases: dedup_fold(&raw.show.aliases),
        seasons,
    })
}

fn normalize_season(sport_id: &str, raw: RawSeason) -> Result<Season, MetadataError> {
    let mut seen_numbers = HashSet::new();
    let mut episodes = Vec::with_capacity(raw.episodes.len());
    for raw_episode in raw.episodes {
        if !seen_numbers.insert(raw_episode.number) {
            return Err(MetadataError::NormalizationFailed(
                sport_id.to_string(),
                format!(
                    "duplicate episode number {} in season {}",
                    raw_episode.number, raw.number
                ),
            ));
        }
        episodes.push(normalize_episode(sport_id, raw_episode)?);
    }

    Ok(Season {
        key: raw.key,
        number: raw.number,
        title: normalize_title(&raw.title),
        round_number: raw.round,
        year: raw.year,
        aliases: dedup_fold(&raw.aliases),
        episodes,
    })
}

fn normalize_episode(sport_id: &str, raw: RawEpisode) -> Result<Episode, MetadataError> {
    let originally_available = match raw.originally_available {
        Some(ref s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            MetadataError::NormalizationFailed(
                sport_id.to_string(),
                format!("invalid originally_available '{s}': {e}"),
            )
        })?),
        None => None,
    };

    let aliases = dedup_fold(&raw.aliases);
    let session_tokens = build_session_tokens(&raw.title, &aliases, &[]);

    Ok(Episode {
        number: raw.number,
        display_number: raw.number.to_string(),
        title: raw.title,
        summary: raw.summary,
        originally_available,
        week: raw.week,
        aliases,
        session_tokens,
    })
}

/// The union of the episode title, its aliases, and any
/// pattern-injected session aliases, case-folded and with empty strings
/// dropped.
pub fn build_session_tokens(
    title: &str,
    aliases: &[String],
    injected: &[String],
) -> Vec<String> {
    let mut set: HashSet<String> = HashSet::new();
    for token in std::iter::once(title)
        .chain(aliases.iter().map(String::as_str))
        .chain(injected.iter().map(String::as_str))
    {
        let folded = token.trim().to_lowercase();
        if !folded.is_empty() {
            set.insert(folded);
        }
    }
    let mut tokens: Vec<String> = set.into_iter().collect();
    tokens.sort();
    tokens
}

fn dedup_fold(aliases: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for alias in aliases {
        let folded = alias.trim().to_lowercase();
        if !folded.is_empty() && seen.insert(folded.clone()) {
            out.push(folded);
        }
    }
    out
}

/// Title-cases lower-case tokens while preserving tokens that arrive
/// fully upper-case (acronyms like "NTT" must never be title-cased).
pub fn normalize_title(title: &str) -> String {
    title
        .split(' ')
        .map(normalize_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_token(token: &str) -> String {
    let has_alpha = token.chars().any(|c| c.is_alphabetic());
    let is_fully_upper = has_alpha && token.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase());
    if !has_alpha || is_fully_upper {
        return token.to_string();
    }
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Case-folded mapping from alias to canonical entity, built for a
/// normalized `Show` and any configured team alias overrides (used by
/// `StructuredParser` for team-name normalization).
#[derive(Debug, Clone, Default)]
pub struct AliasLookup(HashMap<String, String>);

impl AliasLookup {
    pub fn build(show: &Show, team_alias_map: &BTreeMap<String, String>) -> Self {
        let mut map = HashMap::new();
        map.insert(show.title.to_lowercase(), show.title.clone());
        for alias in &show.aliases {
            map.insert(alias.clone(), show.title.clone());
        }
        for season in &show.seasons {
            map.insert(season.title.to_lowercase(), season.title.clone());
            for alias in &season.aliases {
                map.insert(alias.clone(), season.title.clone());
            }
        }
        for (alias, canonical) in team_alias_map {
            map.insert(alias.to_lowercase(), canonical.clone());
        }
        Self(map)
    }

    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.0.get(&token.to_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_casing_is_preserved() {
        assert_eq!(normalize_title("NTT IndyCar Series"), "NTT Indycar Series");
        assert_eq!(normalize_title("nba regular season"), "Nba Regular Season");
    }

    #[test]
    fn session_tokens_drop_empty_and_duplicate_entries() {
        let tokens = build_session_tokens("Race", &["".to_string(), "RACE".to_string()], &[]);
        assert_eq!(tokens, vec!["race".to_string()]);
    }

    #[test]
    fn normalize_is_a_fixed_point() {
        let raw = RawMetadata {
            show: paddock_contracts::RawShow {
                id: "f1".into(),
                title: "Formula 1".into(),
                aliases: vec![],
            },
            seasons: vec![],
        };
        let first = normalize("f1", raw.clone()).unwrap();
        let re_raw = paddock_contracts::RawMetadata {
            show: paddock_contracts::RawShow {
                id: first.id.clone(),
                title: first.title.clone(),
                aliases: first.aliases.clone(),
            },
            seasons: vec![],
        };
        let second = normalize("f1", re_raw).unwrap();
        assert_eq!(first.title, second.title);
        assert_eq!(first.aliases, second.aliases);
    }

    #[test]
    fn duplicate_episode_numbers_are_rejected() {
        let raw = RawMetadata {
            show: paddock_contracts::RawShow {
                id: "f1".into(),
                title: "Formula 1".into(),
                aliases: vec![],
            },
            seasons: vec![RawSeason {
                key: "s1".into(),
                number: 1,
                title: "Monaco".into(),
                round: Some(5),
                year: Some(2025),
                aliases: vec![],
                episodes: vec![
                    RawEpisode {
                        number: 1,
                        title: "Race".into(),
                        summary: None,
                        originally_available: None,
                        week: None,
                        aliases: vec![],
                    },
                    RawEpisode {
                        number: 1,
                        title: "Race 2".into(),
                        summary: None,
                        originally_available: None,
                        week: None,
                        aliases: vec![],
                    },
                ],
            }],
        };
        assert!(normalize("f1", raw).is_err());
    }
}
