//! Deterministic filename-to-episode resolution (spec.md §4.7): pattern
//! pass, structured fallback, then a motorsport fuzzy-location fallback.
//! Grounded on `ferrex-core::tv_parser::TvParser::parse_episode_info`'s
//! ordered-pass structure, generalized from a fixed pattern table to
//! sport-configured `CompiledPattern`s.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;

use paddock_config::SportConfig;
use paddock_model::{
    CompiledPatternId, Episode, EpisodeSelectorMode, MatchContext, Season, SeasonSelectorMode,
    Show, SportRuntime,
};

use crate::error::MatchError;
use crate::metadata::normalizer::AliasLookup;
use crate::pattern::{session_index::similarity, CompiledPattern, SessionLookupIndex};
use crate::structured_parser::{self, StructuredName};

use super::filter::SourceFilter;

/// A successful resolution: the rendered context plus which pattern (if
/// any) produced it. `score` is populated for the structured and
/// fuzzy-location passes; direct pattern matches carry no score.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub context: MatchContext,
    pub pattern_id: Option<CompiledPatternId>,
    pub score: Option<f64>,
    /// True when episode resolution fell back to a fuzzy session-token
    /// match rather than an exact one (spec.md §4.9 specificity).
    pub fuzzy_session: bool,
}

/// Everything the matching engine needs for one sport, built once per
/// pass (spec.md §5: `SportRuntime` is an immutable per-pass snapshot).
pub struct SportMatcher<'a> {
    pub runtime: &'a SportRuntime,
    pub compiled: &'a [CompiledPattern],
    pub config: &'a SportConfig,
    pub filter: &'a SourceFilter,
    pub alias_lookup: &'a AliasLookup,
    pub session_index: &'a SessionLookupIndex,
}

impl<'a> SportMatcher<'a> {
    pub fn match_file(&self, relative_path: &Path) -> Result<MatchOutcome, MatchError> {
        if !self.config.enabled {
            return Err(MatchError::SportDisabled);
        }
        if !self.filter.matches(relative_path) {
            return Err(MatchError::IgnoredByFilter);
        }

        let stem = relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        if let Some(outcome) = self.try_pattern_pass(relative_path, stem)? {
            return Ok(outcome);
        }

        self.try_structured_pass(relative_path, stem)
    }

    fn try_pattern_pass(
        &self,
        relative_path: &Path,
        stem: &str,
    ) -> Result<Option<MatchOutcome>, MatchError> {
        let mut sorted: Vec<&CompiledPattern> = self.compiled.iter().collect();
        sorted.sort_by_key(|c| c.rule.priority);

        for compiled in sorted {
            let Some(captures) = compiled.regex.captures(stem) else {
                continue;
            };

            let season = match resolve_season_by_selector(&compiled.rule.season_selector, &captures, &self.runtime.show) {
                Some(season) => season,
                None => continue,
            };

            let (episode, fuzzy_session) = match resolve_episode_by_selector(
                &compiled.rule.episode_selector,
                &captures,
                season,
                &compiled.session_index,
            ) {
                Some(resolved) => resolved,
                None => continue,
            };

            let mut capture_map = BTreeMap::new();
            for name in captures_names(&compiled.regex) {
                if let Some(m) = captures.name(name) {
                    capture_map.insert(name.to_string(), m.as_str().to_string());
                }
            }

            let context = build_context(
                &self.runtime.sport_id,
                &self.runtime.show,
                season,
                episode,
                relative_path,
                capture_map,
            );

            return Ok(Some(MatchOutcome {
                context,
                pattern_id: Some(CompiledPatternId::new(compiled.rule.id.clone())),
                score: None,
                fuzzy_session,
            }));
        }

        Ok(None)
    }

    fn try_structured_pass(
        &self,
        relative_path: &Path,
        stem: &str,
    ) -> Result<MatchOutcome, MatchError> {
        let Some(parsed) = structured_parser::parse(stem, self.alias_lookup, self.session_index) else {
            return Err(MatchError::NoPatternMatched);
        };

        let season = self
            .resolve_season_for_structured(&parsed, stem)
            .ok_or(MatchError::SeasonNotFound)?;

        let mut best: Option<(&Episode, f64)> = None;
        for episode in &season.episodes {
            let score = score_candidate(&parsed, episode, &self.config.team_alias_map);
            if score < 0.6 {
                continue;
            }
            best = match best {
                Some((current, current_score)) if tie_break(current_score, current, score, episode) => {
                    Some((current, current_score))
                }
                _ => Some((episode, score)),
            };
        }

        let (episode, score) = best.ok_or(MatchError::EpisodeNotFound)?;

        let context = build_context(
            &self.runtime.sport_id,
            &self.runtime.show,
            season,
            episode,
            relative_path,
            BTreeMap::new(),
        );

        Ok(MatchOutcome {
            context,
            pattern_id: None,
            score: Some(score),
            fuzzy_session: parsed.session.is_none() || parsed.session_fuzzy,
        })
    }

    /// Derives the season via round, then week, then date, in that
    /// order (spec.md §4.7 step 3); falls back to fuzzy-location
    /// matching when a round is known but several seasons share it.
    fn resolve_season_for_structured(&self, parsed: &StructuredName, stem: &str) -> Option<&Season> {
        if let Some(round) = parsed.round {
            let candidates: Vec<&Season> = self
                .runtime
                .show
                .seasons
                .iter()
                .filter(|s| s.effective_round() == round)
                .collect();
            match candidates.len() {
                0 => {}
                1 => return Some(candidates[0]),
                _ => return resolve_season_fuzzy_location(&candidates, stem),
            }
        }
        if let Some(week) = parsed.week {
            if let Some(season) = self
                .runtime
                .show
                .seasons
                .iter()
                .find(|s| s.episodes.iter().any(|e| e.week == Some(week)))
            {
                return Some(season);
            }
        }
        if let Some(date) = parsed.date {
            return self
                .runtime
                .show
                .seasons
                .iter()
                .find(|s| s.episodes_on(date).next().is_some());
        }
        None
    }
}

/// Picks among equally-eligible candidates: lowest episode number, then
/// lowest season number (the open question's resolved tie-break).
fn tie_break(current_score: f64, current: &Episode, score: f64, episode: &Episode) -> bool {
    if score > current_score {
        return false;
    }
    if score < current_score {
        return true;
    }
    current.number <= episode.number
}

fn score_candidate(
    structured: &StructuredName,
    episode: &Episode,
    team_alias_map: &BTreeMap<String, String>,
) -> f64 {
    let mut score = 0.0;

    if structured.teams.len() == 2 {
        let episode_teams = teams_in_episode(episode, team_alias_map);
        let structured_teams: BTreeSet<String> = structured.teams.iter().cloned().collect();
        if episode_teams != structured_teams {
            return 0.0;
        }
        score += 0.55;
    }

    if let (Some(sd), Some(ed)) = (structured.date, episode.originally_available) {
        if date_diff_days(sd, ed) <= 2 {
            score += 0.4;
        }
    }

    if let Some(session) = &structured.session {
        let folded = session.to_lowercase();
        if episode.session_tokens.iter().any(|t| *t == folded) {
            score += 0.2;
        } else if episode
            .session_tokens
            .iter()
            .any(|t| similarity(t, &folded) >= 0.85)
        {
            score += 0.1;
        }
    }

    score
}

fn date_diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

fn teams_in_episode(episode: &Episode, team_alias_map: &BTreeMap<String, String>) -> BTreeSet<String> {
    let mut teams = BTreeSet::new();
    let haystack = std::iter::once(episode.title.as_str()).chain(episode.aliases.iter().map(String::as_str));
    for text in haystack {
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let folded = token.to_lowercase();
            if let Some(canonical) = team_alias_map.get(&folded) {
                teams.insert(canonical.clone());
            }
        }
    }
    teams
}

/// When a round resolves to several seasons (e.g. sprint and feature
/// events sharing a round number), fuzzy-matches the filename stem
/// against each candidate's title/location text.
fn resolve_season_fuzzy_location<'a>(candidates: &[&'a Season], stem: &str) -> Option<&'a Season> {
    let folded_stem = stem.to_lowercase();
    let mut best: Option<(&Season, f64)> = None;
    for season in candidates {
        let mut season_score = 0.0_f64;
        for token in folded_stem.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let score = similarity(token, &season.title.to_lowercase());
            if score > season_score {
                season_score = score;
            }
        }
        best = match best {
            Some((current, current_score)) if current_score >= season_score => Some((current, current_score)),
            _ => Some((season, season_score)),
        };
    }
    best.filter(|(_, score)| *score >= 0.85).map(|(s, _)| s)
}

fn resolve_season_by_selector<'a>(
    selector: &paddock_model::SeasonSelector,
    captures: &regex::Captures,
    show: &'a Show,
) -> Option<&'a Season> {
    match selector.mode {
        SeasonSelectorMode::Round => {
            let group = selector.group.as_deref()?;
            let round: u32 = captures.name(group)?.as_str().parse().ok()?;
            show.seasons.iter().find(|s| s.effective_round() == round)
        }
        SeasonSelectorMode::Key => {
            let group = selector.group.as_deref()?;
            let key = captures.name(group)?.as_str();
            show.seasons.iter().find(|s| s.key == key)
        }
        SeasonSelectorMode::Title => {
            let group = selector.group.as_deref()?;
            let title = captures.name(group)?.as_str().to_lowercase();
            show.seasons
                .iter()
                .find(|s| s.title.to_lowercase() == title)
        }
        SeasonSelectorMode::Sequential => show.seasons.first(),
        SeasonSelectorMode::Week => {
            let group = selector.group.as_deref()?;
            let week: u32 = captures.name(group)?.as_str().parse().ok()?;
            show.seasons
                .iter()
                .find(|s| s.episodes.iter().any(|e| e.week == Some(week)))
        }
        SeasonSelectorMode::Date => {
            let template = selector.value_template.as_deref()?;
            let date = render_date_template(template, captures)?;
            show.seasons
                .iter()
                .find(|s| s.episodes_on(date).next().is_some())
        }
    }
}

fn render_date_template(template: &str, captures: &regex::Captures) -> Option<NaiveDate> {
    let mut rendered = String::new();
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            let end = template[i..].find('}')?;
            let inner = &template[i + 1..i + end];
            let name = inner.split(':').next().unwrap_or(inner);
            rendered.push_str(captures.name(name)?.as_str());
            while let Some((j, _)) = chars.peek() {
                if *j > i + end {
                    break;
                }
                chars.next();
            }
        } else {
            rendered.push(c);
        }
    }
    NaiveDate::parse_from_str(&rendered, "%Y-%m-%d").ok()
}

/// Resolves the episode plus whether the resolution was exact (`false`)
/// or fell back to a fuzzy session-token match or the title fallback
/// (`true`) — the specificity signal spec.md §4.9 uses for overwrites.
fn resolve_episode_by_selector<'a>(
    selector: &paddock_model::EpisodeSelector,
    captures: &regex::Captures,
    season: &'a Season,
    session_index: &SessionLookupIndex,
) -> Option<(&'a Episode, bool)> {
    let raw = captures.name(&selector.group)?.as_str();

    let resolved = match selector.mode {
        EpisodeSelectorMode::Direct => {
            let number: u32 = raw.parse().ok()?;
            season.episode(number).map(|e| (e, false))
        }
        EpisodeSelectorMode::SessionAlias => {
            let (display_number, fuzzy) = session_index
                .get_direct(raw)
                .map(|c| (c.to_string(), false))
                .or_else(|| session_index.fuzzy_match(raw).map(|(c, _)| (c.to_string(), true)))?;
            season
                .episodes
                .iter()
                .find(|e| e.display_number == display_number)
                .map(|e| (e, fuzzy))
        }
    };

    resolved.or_else(|| {
        if selector.allow_title_fallback {
            let folded = raw.to_lowercase();
            season
                .episodes
                .iter()
                .find(|e| e.title.to_lowercase() == folded)
                .map(|e| (e, true))
        } else {
            None
        }
    })
}

fn captures_names(regex: &regex::Regex) -> Vec<&str> {
    regex.capture_names().flatten().collect()
}

fn build_context(
    sport_id: &str,
    show: &Show,
    season: &Season,
    episode: &Episode,
    relative_path: &Path,
    captures: BTreeMap<String, String>,
) -> MatchContext {
    let source_filename = relative_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let source_stem = relative_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let extension = relative_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    MatchContext {
        sport_id: sport_id.to_string(),
        sport_name: show.display_title.clone(),
        show_title: show.title.clone(),
        show_display_title: show.display_title.clone(),
        season_title: season.title.clone(),
        season_number: season.number,
        season_round: season.effective_round(),
        season_year: season.year,
        episode_title: episode.title.clone(),
        episode_number: episode.number,
        episode_display_number: episode.display_number.clone(),
        episode_summary: episode.summary.clone(),
        episode_originally_available: episode.originally_available.map(|d| d.to_string()),
        source_filename,
        source_stem,
        extension,
        suffix: String::new(),
        relative_source: relative_path.to_string_lossy().to_string(),
        captures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_model::{Episode, EpisodeSelector, PatternRule, Season, SeasonSelector, Show};
    use regex::RegexBuilder;

    fn f1_show() -> Show {
        Show {
            id: "f1".into(),
            title: "Formula 1".into(),
            display_title: "Formula 1".into(),
            aliases: vec![],
            seasons: vec![Season {
                key: "2025-05".into(),
                number: 5,
                title: "Monaco Grand Prix".into(),
                round_number: Some(5),
                year: Some(2025),
                aliases: vec![],
                episodes: vec![
                    Episode {
                        number: 6,
                        display_number: "6".into(),
                        title: "Race".into(),
                        summary: None,
                        originally_available: None,
                        week: None,
                        aliases: vec![],
                        session_tokens: vec!["race".into()],
                    },
                    Episode {
                        number: 4,
                        display_number: "4".into(),
                        title: "Qualifying".into(),
                        summary: None,
                        originally_available: None,
                        week: None,
                        aliases: vec![],
                        session_tokens: vec!["qualifying".into()],
                    },
                ],
            }],
        }
    }

    #[test]
    fn round_based_pattern_match_resolves_session_capture() {
        let regex = RegexBuilder::new(r"Round(?P<round>\d+).*?(?P<session>Race|Qualifying)")
            .case_insensitive(true)
            .build()
            .unwrap();
        let mut session_index = SessionLookupIndex::new();
        session_index.add("race", "6");
        session_index.add("qualifying", "4");

        let compiled = CompiledPattern {
            rule: PatternRule {
                id: "f1-round".into(),
                regex: regex.as_str().to_string(),
                description: String::new(),
                priority: 10,
                season_selector: SeasonSelector {
                    mode: SeasonSelectorMode::Round,
                    group: Some("round".into()),
                    value_template: None,
                },
                episode_selector: EpisodeSelector {
                    mode: EpisodeSelectorMode::SessionAlias,
                    group: "session".into(),
                    allow_title_fallback: false,
                },
                session_aliases: vec![],
                destination_overrides: None,
            },
            regex,
            session_index,
        };

        let show = f1_show();
        let runtime = SportRuntime {
            sport_id: "formula1_2025".into(),
            show,
            rules: vec![compiled.rule.clone()],
            metadata_fingerprint: "fp".into(),
        };
        let config = SportConfig {
            id: "formula1_2025".into(),
            enabled: true,
            show_ref: "f1".into(),
            source_globs: vec![],
            source_extensions: vec![],
            pattern_sets: vec![],
            allow_unmatched: false,
            team_alias_map: BTreeMap::new(),
            variants: vec![],
        };
        let filter = SourceFilter::new(&[], &[]).unwrap();
        let alias_lookup = AliasLookup::build(&runtime.show, &config.team_alias_map);
        let sport_index = SessionLookupIndex::new();

        let matcher = SportMatcher {
            runtime: &runtime,
            compiled: std::slice::from_ref(&compiled),
            config: &config,
            filter: &filter,
            alias_lookup: &alias_lookup,
            session_index: &sport_index,
        };

        let outcome = matcher
            .match_file(Path::new("Formula.1.2025.Round05.Monaco.Race.mkv"))
            .unwrap();
        assert_eq!(outcome.context.season_number, 5);
        assert_eq!(outcome.context.episode_number, 6);
        assert_eq!(outcome.pattern_id, Some(CompiledPatternId::new("f1-round")));
    }

    #[test]
    fn disabled_sport_is_reported() {
        let show = f1_show();
        let runtime = SportRuntime {
            sport_id: "formula1_2025".into(),
            show,
            rules: vec![],
            metadata_fingerprint: "fp".into(),
        };
        let config = SportConfig {
            id: "formula1_2025".into(),
            enabled: false,
            show_ref: "f1".into(),
            source_globs: vec![],
            source_extensions: vec![],
            pattern_sets: vec![],
            allow_unmatched: false,
            team_alias_map: BTreeMap::new(),
            variants: vec![],
        };
        let filter = SourceFilter::new(&[], &[]).unwrap();
        let alias_lookup = AliasLookup::build(&runtime.show, &config.team_alias_map);
        let sport_index = SessionLookupIndex::new();
        let matcher = SportMatcher {
            runtime: &runtime,
            compiled: &[],
            config: &config,
            filter: &filter,
            alias_lookup: &alias_lookup,
            session_index: &sport_index,
        };
        let err = matcher.match_file(Path::new("anything.mkv")).unwrap_err();
        assert_eq!(err, MatchError::SportDisabled);
    }

    #[test]
    fn two_team_mismatch_is_rejected_even_with_other_signal() {
        let mut team_alias_map = BTreeMap::new();
        team_alias_map.insert("pacers".to_string(), "Indiana Pacers".to_string());
        team_alias_map.insert("celtics".to_string(), "Boston Celtics".to_string());
        team_alias_map.insert("heat".to_string(), "Miami Heat".to_string());

        let episode = Episode {
            number: 1,
            display_number: "1".into(),
            title: "Boston Celtics at Miami Heat".into(),
            summary: None,
            originally_available: Some(NaiveDate::from_ymd_opt(2025, 12, 22).unwrap()),
            week: None,
            aliases: vec![],
            session_tokens: vec![],
        };

        let structured = StructuredName {
            teams: vec!["Indiana Pacers".to_string(), "Boston Celtics".to_string()],
            date: Some(NaiveDate::from_ymd_opt(2025, 12, 22).unwrap()),
            round: None,
            week: None,
            session: None,
            session_fuzzy: false,
            year: Some(2025),
        };

        assert_eq!(score_candidate(&structured, &episode, &team_alias_map), 0.0);
    }
}
