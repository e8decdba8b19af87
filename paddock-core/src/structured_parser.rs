//! Heuristic parser used by `MatchingEngine`'s structured pass when no
//! pattern matches (spec.md §4.6), grounded on `ferrex-core`'s
//! `TvParser::episode_patterns`/`date_patterns` table-of-regexes idiom.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::metadata::normalizer::AliasLookup;
use crate::pattern::SessionLookupIndex;

/// The heuristic extraction of a non-canonical filename: whatever signal
/// could be recovered. Absence of a field is not an error; `parse`
/// returns `None` only when nothing useful was found at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredName {
    pub teams: Vec<String>,
    pub date: Option<NaiveDate>,
    pub round: Option<u32>,
    pub week: Option<u32>,
    pub session: Option<String>,
    /// True when `session` was recovered via `SessionLookupIndex::fuzzy_match`
    /// rather than an exact `get_direct` hit (spec.md §4.9 specificity).
    pub session_fuzzy: bool,
    pub year: Option<i32>,
}

fn round_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:round|rd)\s*\.?\s*(\d{1,2})").unwrap())
}

fn week_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:week|wk)\s*\.?\s*(\d{1,2})").unwrap())
}

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(19|20)(\d{2})(?:\D|$)").unwrap())
}

fn date_ymd_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})[\-\._](\d{1,2})[\-\._](\d{1,2})").unwrap())
}

fn date_mdy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})[\-\._](\d{1,2})[\-\._](\d{4})").unwrap())
}

/// `DD MM` with no year in the match itself (the year is recovered
/// separately, from a standalone four-digit token elsewhere in the name).
fn date_dm_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)(\d{1,2})\s+(\d{1,2})(?:\s|$)").unwrap())
}

fn teams_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.*?)\s*(?:vs\.?|@)\s*(.*)$").unwrap())
}

/// Parses `stem` for date/round/week/team/session signal. `alias_lookup`
/// normalizes team tokens via the sport's configured aliases;
/// `session_index` recognizes the trailing session token after teams and
/// dates are stripped out.
pub fn parse(
    stem: &str,
    alias_lookup: &AliasLookup,
    session_index: &SessionLookupIndex,
) -> Option<StructuredName> {
    let mut result = StructuredName::default();
    let mut remainder = stem.to_string();

    if let Some(caps) = teams_pattern().captures(stem) {
        let left = caps.get(1).unwrap().as_str();
        let right = caps.get(2).unwrap().as_str();
        let left_team = extract_trailing_token(left, alias_lookup);
        if let Some(team) = left_team {
            result.teams.push(team);
        }
        let right_team = extract_leading_token(right, alias_lookup);
        if let Some(team) = right_team {
            result.teams.push(team);
        }
        remainder = right.to_string();
    }

    let standalone_year = year_pattern()
        .captures(stem)
        .and_then(|c| format!("{}{}", &c[1], &c[2]).parse::<i32>().ok());
    result.year = standalone_year;

    result.date = extract_date(stem, standalone_year);
    result.round = round_pattern()
        .captures(stem)
        .and_then(|c| c[1].parse().ok());
    result.week = week_pattern()
        .captures(stem)
        .and_then(|c| c[1].parse().ok());

    let (session, session_fuzzy) = match extract_session(&remainder, session_index) {
        Some((canonical, fuzzy)) => (Some(canonical), fuzzy),
        None => (None, false),
    };
    result.session = session;
    result.session_fuzzy = session_fuzzy;

    let has_signal = !result.teams.is_empty()
        || result.date.is_some()
        || result.round.is_some()
        || result.week.is_some()
        || result.session.is_some();

    has_signal.then_some(result)
}

/// Prefers `DD MM` when a standalone four-digit year exists elsewhere in
/// the name; otherwise tries `YYYY-MM-DD`, then `MM-DD-YYYY`.
fn extract_date(stem: &str, standalone_year: Option<i32>) -> Option<NaiveDate> {
    if standalone_year.is_some() {
        if let Some(caps) = date_dm_pattern().captures(stem) {
            let day: u32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            if let Some(year) = standalone_year {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    return Some(date);
                }
            }
        }
    }

    if let Some(caps) = date_ymd_pattern().captures(stem) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = date_mdy_pattern().captures(stem) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}

fn tokens(segment: &str) -> Vec<&str> {
    segment
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '.')
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_trailing_token(segment: &str, alias_lookup: &AliasLookup) -> Option<String> {
    tokens(segment)
        .into_iter()
        .rev()
        .find_map(|tok| alias_lookup.resolve(tok).map(str::to_string))
        .or_else(|| alias_lookup.resolve(segment.trim()).map(str::to_string))
}

fn extract_leading_token(segment: &str, alias_lookup: &AliasLookup) -> Option<String> {
    tokens(segment)
        .into_iter()
        .find_map(|tok| alias_lookup.resolve(tok).map(str::to_string))
        .or_else(|| alias_lookup.resolve(segment.trim()).map(str::to_string))
}

/// Returns the recovered session token and whether it was an exact
/// (`get_direct`) hit (`false`) or a fuzzy fallback (`true`).
fn extract_session(remainder: &str, session_index: &SessionLookupIndex) -> Option<(String, bool)> {
    for token in remainder.split_whitespace() {
        if let Some(canonical) = session_index.get_direct(token) {
            return Some((canonical.to_string(), false));
        }
    }
    if let Some((canonical, _)) = session_index.fuzzy_match(remainder.trim()) {
        return Some((canonical.to_string(), true));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn session_index() -> SessionLookupIndex {
        let mut index = SessionLookupIndex::new();
        for s in ["Race", "Qualifying", "Sprint"] {
            index.add(s, s);
        }
        index
    }

    fn alias_lookup() -> AliasLookup {
        let show = paddock_model::Show {
            id: "nba".into(),
            title: "NBA".into(),
            display_title: "NBA".into(),
            aliases: vec![],
            seasons: vec![],
        };
        let mut map = BTreeMap::new();
        map.insert("pacers".to_string(), "Indiana Pacers".to_string());
        map.insert("celtics".to_string(), "Boston Celtics".to_string());
        AliasLookup::build(&show, &map)
    }

    #[test]
    fn extracts_round_token() {
        let parsed = parse("Formula 1 Round 5 Monaco Race", &alias_lookup(), &session_index()).unwrap();
        assert_eq!(parsed.round, Some(5));
        assert_eq!(parsed.session, Some("Race".to_string()));
    }

    #[test]
    fn extracts_week_token() {
        let parsed = parse("NFL Week 12 Game", &alias_lookup(), &session_index()).unwrap();
        assert_eq!(parsed.week, Some(12));
    }

    #[test]
    fn prefers_dm_date_when_standalone_year_present() {
        let parsed = parse("NBA RS 2025 Indiana Pacers vs Boston Celtics 22 12", &alias_lookup(), &session_index()).unwrap();
        assert_eq!(parsed.date, Some(NaiveDate::from_ymd_opt(2025, 12, 22).unwrap()));
        assert_eq!(parsed.year, Some(2025));
    }

    #[test]
    fn extracts_ymd_date_without_standalone_year() {
        let parsed = parse("NHL-2025-11-22_NJD@PHI", &alias_lookup(), &session_index()).unwrap();
        assert_eq!(parsed.date, Some(NaiveDate::from_ymd_opt(2025, 11, 22).unwrap()));
    }

    #[test]
    fn extracts_hyphenated_teams_around_at_separator() {
        let mut map = BTreeMap::new();
        map.insert("njd".to_string(), "New Jersey Devils".to_string());
        map.insert("phi".to_string(), "Philadelphia Flyers".to_string());
        let show = paddock_model::Show {
            id: "nhl".into(),
            title: "NHL".into(),
            display_title: "NHL".into(),
            aliases: vec![],
            seasons: vec![],
        };
        let lookup = AliasLookup::build(&show, &map);
        let parsed = parse("NHL-2025-11-22_NJD@PHI", &lookup, &session_index()).unwrap();
        assert_eq!(
            parsed.teams,
            vec!["New Jersey Devils".to_string(), "Philadelphia Flyers".to_string()]
        );
    }

    #[test]
    fn returns_none_without_any_signal() {
        assert_eq!(parse("random nondescript file", &alias_lookup(), &session_index()), None);
    }
}
