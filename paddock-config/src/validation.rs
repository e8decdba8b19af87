//! Per-field validation, in the style of `ferrex-config`'s
//! `cli::validation` module: one `validate_*` function per concern,
//! aggregated by `validate`.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown pattern set referenced: {0}")]
    UnknownPatternSet(String),
    #[error("duplicate sport id: {0}")]
    DuplicateSportId(String),
}

/// Validates a fully merged `Config`, returning every problem found
/// rather than stopping at the first (configuration errors are fatal at
/// startup, so surfacing the whole list saves a retry loop).
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    errors.extend(validate_required_paths(config).err());
    errors.extend(validate_sport_ids(config).err());
    errors.extend(validate_pattern_sets(config).err().into_iter().flatten());
    errors.extend(validate_watch(config).err());

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_required_paths(config: &Config) -> Result<(), ConfigError> {
    for (name, value) in [
        ("source_dir", &config.source_dir),
        ("destination_dir", &config.destination_dir),
        ("cache_dir", &config.cache_dir),
    ] {
        if value.is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "{name} is required"
            )));
        }
    }
    Ok(())
}

fn validate_sport_ids(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for sport in &config.sports {
        if !seen.insert(sport.id.clone()) {
            return Err(ConfigError::DuplicateSportId(sport.id.clone()));
        }
    }
    Ok(())
}

fn validate_pattern_sets(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    for sport in &config.sports {
        if sport.enabled && sport.pattern_sets.is_empty() && !sport.allow_unmatched {
            errors.push(ConfigError::UnknownPatternSet(format!(
                "sport '{}' has no pattern_sets and does not allow_unmatched",
                sport.id
            )));
        }
        let mut ids = HashSet::new();
        for rule in &sport.pattern_sets {
            if !ids.insert(rule.id.clone()) {
                errors.push(ConfigError::InvalidConfig(format!(
                    "sport '{}' has duplicate pattern rule id '{}'",
                    sport.id, rule.id
                )));
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_watch(config: &Config) -> Result<(), ConfigError> {
    if config.watch.enabled && config.watch.paths.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "watch.enabled is true but watch.paths is empty".to_string(),
        ));
    }
    if config.watch.debounce_seconds == 0 {
        return Err(ConfigError::InvalidConfig(
            "watch.debounce_seconds must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{PatternRuleConfig, SportConfig};
    use paddock_model::{EpisodeSelector, EpisodeSelectorMode, SeasonSelector, SeasonSelectorMode};

    fn base_config() -> Config {
        Config {
            source_dir: Some(PathBuf::from("/src")),
            destination_dir: Some(PathBuf::from("/dst")),
            cache_dir: Some(PathBuf::from("/cache")),
            ..Config::default()
        }
    }

    #[test]
    fn missing_required_path_is_rejected() {
        let mut config = base_config();
        config.source_dir = None;
        let errors = validate(&config).unwrap_err();
        assert!(matches!(errors[0], ConfigError::InvalidConfig(_)));
    }

    #[test]
    fn duplicate_sport_id_is_rejected() {
        let mut config = base_config();
        let sport = SportConfig {
            id: "formula1".to_string(),
            enabled: true,
            show_ref: "formula1".to_string(),
            source_globs: vec![],
            source_extensions: vec![],
            pattern_sets: vec![PatternRuleConfig {
                id: "round".to_string(),
                regex: "Round(?P<round>\\d+)".to_string(),
                description: String::new(),
                priority: 10,
                season_selector: SeasonSelector {
                    mode: SeasonSelectorMode::Round,
                    group: Some("round".to_string()),
                    value_template: None,
                },
                episode_selector: EpisodeSelector {
                    mode: EpisodeSelectorMode::SessionAlias,
                    group: "session".to_string(),
                    allow_title_fallback: false,
                },
                session_aliases: vec![],
                destination_overrides: None,
            }],
            allow_unmatched: false,
            team_alias_map: Default::default(),
            variants: vec![],
        };
        config.sports = vec![sport.clone(), sport];
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::DuplicateSportId(id) if id == "formula1")));
    }

    #[test]
    fn enabled_watch_without_paths_is_rejected() {
        let mut config = base_config();
        config.watch.enabled = true;
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidConfig(_))));
    }
}
