//! Translates declarative `PatternRule`s into immutable `CompiledPattern`s
//! (spec.md §4.5), grounded on `ferrex-core/src/tv_parser.rs`'s
//! `Vec<(&str, Regex)>` table-of-patterns idiom.

use regex::Regex;

use paddock_model::{EpisodeSelectorMode, PatternRule, SeasonSelectorMode, Show};

use crate::error::PatternCompileError;
use crate::metadata::normalizer::build_session_tokens;

use super::session_index::SessionLookupIndex;

/// An immutable, compiled pattern: the source rule, its compiled regex,
/// and a session-lookup index built from the sport's canonical and
/// alias tokens plus this rule's injected session aliases.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub rule: PatternRule,
    pub regex: Regex,
    pub session_index: SessionLookupIndex,
}

/// Compiles every rule for a sport, validating regex syntax, capture
/// group references, and selector/metadata compatibility.
pub fn compile_patterns(
    rules: &[PatternRule],
    show: &Show,
) -> Result<Vec<CompiledPattern>, PatternCompileError> {
    rules.iter().map(|rule| compile_one(rule, show)).collect()
}

fn compile_one(rule: &PatternRule, show: &Show) -> Result<CompiledPattern, PatternCompileError> {
    let regex = build_regex(rule)?;
    validate_groups(rule, &regex)?;

    if rule.season_selector.mode == SeasonSelectorMode::Week {
        validate_week_metadata(rule, show)?;
    }

    let session_index = build_session_index(rule, show);

    Ok(CompiledPattern {
        rule: rule.clone(),
        regex,
        session_index,
    })
}

fn build_regex(rule: &PatternRule) -> Result<Regex, PatternCompileError> {
    regex::RegexBuilder::new(&rule.regex)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternCompileError::InvalidRegex {
            rule_id: rule.id.clone(),
            source,
        })
}

fn validate_groups(rule: &PatternRule, regex: &Regex) -> Result<(), PatternCompileError> {
    let names: Vec<&str> = regex.capture_names().flatten().collect();
    let check = |group: &str| -> Result<(), PatternCompileError> {
        if names.contains(&group) {
            Ok(())
        } else {
            Err(PatternCompileError::UnknownCaptureGroup {
                rule_id: rule.id.clone(),
                group: group.to_string(),
            })
        }
    };

    if let Some(group) = &rule.season_selector.group {
        check(group)?;
    }
    if let Some(template) = &rule.season_selector.value_template {
        for group in template_groups(template) {
            check(&group)?;
        }
    }
    check(&rule.episode_selector.group)?;
    Ok(())
}

/// Extracts `{name}` or `{name:02}` placeholders from a `value_template`.
pub fn template_groups(template: &str) -> Vec<String> {
    let mut groups = Vec::new();
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            if let Some(end) = template[i..].find('}') {
                let inner = &template[i + 1..i + end];
                let name = inner.split(':').next().unwrap_or(inner);
                groups.push(name.to_string());
            }
        }
    }
    groups
}

fn validate_week_metadata(rule: &PatternRule, show: &Show) -> Result<(), PatternCompileError> {
    let has_any_episode = show.seasons.iter().any(|s| !s.episodes.is_empty());
    let all_weekly = show
        .seasons
        .iter()
        .flat_map(|s| &s.episodes)
        .all(|e| e.week.is_some());
    if has_any_episode && !all_weekly {
        return Err(PatternCompileError::MissingWeeklyIndex {
            rule_id: rule.id.clone(),
        });
    }
    Ok(())
}

fn build_session_index(rule: &PatternRule, show: &Show) -> SessionLookupIndex {
    let mut index = SessionLookupIndex::new();
    for season in &show.seasons {
        for episode in &season.episodes {
            let injected: Vec<String> = rule
                .session_aliases
                .iter()
                .map(|a| a.alias.clone())
                .collect();
            for token in build_session_tokens(&episode.title, &episode.aliases, &injected) {
                index.add(&token, &episode.display_number);
            }
        }
    }
    for alias in &rule.session_aliases {
        index.add(&alias.alias, &alias.canonical);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_model::{EpisodeSelector, SeasonSelector};

    fn show() -> Show {
        Show {
            id: "f1".into(),
            title: "Formula 1".into(),
            display_title: "Formula 1".into(),
            aliases: vec![],
            seasons: vec![],
        }
    }

    fn rule(regex: &str, season_group: Option<&str>, episode_group: &str) -> PatternRule {
        PatternRule {
            id: "r1".into(),
            regex: regex.into(),
            description: String::new(),
            priority: 10,
            season_selector: SeasonSelector {
                mode: SeasonSelectorMode::Round,
                group: season_group.map(str::to_string),
                value_template: None,
            },
            episode_selector: EpisodeSelector {
                mode: EpisodeSelectorMode::Direct,
                group: episode_group.to_string(),
                allow_title_fallback: false,
            },
            session_aliases: vec![],
            destination_overrides: None,
        }
    }

    #[test]
    fn compiles_a_valid_rule() {
        let rule = rule(r"Round(?P<round>\d+).*(?P<session>Race)", Some("round"), "session");
        let compiled = compile_patterns(&[rule], &show()).unwrap();
        assert_eq!(compiled.len(), 1);
    }

    #[test]
    fn rejects_unknown_capture_group() {
        let rule = rule(r"Round(?P<round>\d+)", Some("round"), "missing");
        let err = compile_patterns(&[rule], &show()).unwrap_err();
        assert!(matches!(err, PatternCompileError::UnknownCaptureGroup { .. }));
    }

    #[test]
    fn template_groups_extracts_named_placeholders() {
        let groups = template_groups("{y}-{m:02}-{d:02}");
        assert_eq!(groups, vec!["y".to_string(), "m".to_string(), "d".to_string()]);
    }

    #[test]
    fn week_mode_without_weekly_metadata_is_rejected() {
        let mut rule = rule(r"Week(?P<week>\d+).*(?P<session>Game)", Some("week"), "session");
        rule.season_selector.mode = SeasonSelectorMode::Week;
        let mut show = show();
        show.seasons.push(paddock_model::Season {
            key: "s1".into(),
            number: 1,
            title: "2025".into(),
            round_number: None,
            year: Some(2025),
            aliases: vec![],
            episodes: vec![paddock_model::Episode {
                number: 1,
                display_number: "1".into(),
                title: "Game 1".into(),
                summary: None,
                originally_available: None,
                week: None,
                aliases: vec![],
                session_tokens: vec![],
            }],
        });
        let err = compile_patterns(&[rule], &show).unwrap_err();
        assert!(matches!(err, PatternCompileError::MissingWeeklyIndex { .. }));
    }
}
