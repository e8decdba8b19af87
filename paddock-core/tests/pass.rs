//! Black-box coverage of `Processor::run_pass` through the public
//! crate surface only (no access to private helpers), exercising the
//! seed F1 scenario end to end plus the skip-existing and
//! destination-collision edge cases.

use std::collections::BTreeMap;
use std::sync::Mutex as StdMutex;

use paddock_config::{Config, PatternRuleConfig, PostRunConfig, SportConfig};
use paddock_contracts::notify::NullNotificationSink;
use paddock_contracts::provider::{RawEpisode, RawSeason, RawShow};
use paddock_contracts::refresh::NullRefreshTrigger;
use paddock_contracts::{MetadataProvider, ProviderError, RawMetadata};
use paddock_core::processor::Processor;
use paddock_model::{EpisodeSelector, EpisodeSelectorMode, SeasonSelector, SeasonSelectorMode};

struct StubProvider {
    shows: StdMutex<BTreeMap<String, RawMetadata>>,
}

impl MetadataProvider for StubProvider {
    async fn fetch(&self, sport_id: &str) -> Result<RawMetadata, ProviderError> {
        self.shows
            .lock()
            .unwrap()
            .get(sport_id)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

fn f1_metadata() -> RawMetadata {
    RawMetadata {
        show: RawShow {
            id: "formula1".into(),
            title: "Formula 1".into(),
            aliases: vec![],
        },
        seasons: vec![RawSeason {
            key: "2025-05".into(),
            number: 5,
            title: "Monaco Grand Prix".into(),
            round: Some(5),
            year: Some(2025),
            aliases: vec![],
            episodes: vec![RawEpisode {
                number: 6,
                title: "Race".into(),
                summary: None,
                originally_available: None,
                week: None,
                aliases: vec![],
            }],
        }],
    }
}

fn f1_sport_config() -> SportConfig {
    SportConfig {
        id: "formula1_2025".into(),
        enabled: true,
        show_ref: "formula1".into(),
        source_globs: vec![],
        source_extensions: vec!["mkv".into()],
        pattern_sets: vec![PatternRuleConfig {
            id: "f1-round".into(),
            regex: r"Round(?P<round>\d+).*?(?P<session>Race)".into(),
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
        }],
        allow_unmatched: false,
        team_alias_map: Default::default(),
        variants: vec![],
    }
}

fn provider_with(shows: BTreeMap<String, RawMetadata>) -> StubProvider {
    StubProvider {
        shows: StdMutex::new(shows),
    }
}

#[tokio::test]
async fn seed_scenario_links_to_the_exact_destination_path() {
    let source_dir = tempfile::tempdir().unwrap();
    let destination_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();

    tokio::fs::write(
        source_dir.path().join("Formula.1.2025.Round05.Monaco.Race.mkv"),
        vec![0u8; 1],
    )
    .await
    .unwrap();

    let mut shows = BTreeMap::new();
    shows.insert("formula1".to_string(), f1_metadata());

    let config = Config {
        source_dir: Some(source_dir.path().to_path_buf()),
        destination_dir: Some(destination_dir.path().to_path_buf()),
        cache_dir: Some(cache_dir.path().to_path_buf()),
        dry_run: false,
        skip_existing: true,
        link_mode: paddock_config::LinkMode::Hardlink,
        allow_cross_device_fallback: false,
        watch: Default::default(),
        sports: vec![f1_sport_config()],
        post_run: PostRunConfig::default(),
        min_file_size_bytes: Some(0),
    };

    let processor = Processor::new(config, provider_with(shows), NullNotificationSink, NullRefreshTrigger);
    let outcome = processor.run_pass().await.unwrap();

    assert_eq!(outcome.summary.linked, 1);
    assert!(outcome.sport_load_failures.is_empty());

    let expected = destination_dir
        .path()
        .join("Formula 1 2025/05 Monaco Grand Prix/Formula 1 - S05E06 - Race.mkv");
    assert!(expected.exists(), "expected destination {} to exist", expected.display());
}

#[tokio::test]
async fn a_second_pass_over_the_same_source_is_skipped() {
    let source_dir = tempfile::tempdir().unwrap();
    let destination_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();

    tokio::fs::write(
        source_dir.path().join("Formula.1.2025.Round05.Monaco.Race.mkv"),
        vec![0u8; 1],
    )
    .await
    .unwrap();

    let mut shows = BTreeMap::new();
    shows.insert("formula1".to_string(), f1_metadata());

    let config = Config {
        source_dir: Some(source_dir.path().to_path_buf()),
        destination_dir: Some(destination_dir.path().to_path_buf()),
        cache_dir: Some(cache_dir.path().to_path_buf()),
        dry_run: false,
        skip_existing: true,
        link_mode: paddock_config::LinkMode::Hardlink,
        allow_cross_device_fallback: false,
        watch: Default::default(),
        sports: vec![f1_sport_config()],
        post_run: PostRunConfig::default(),
        min_file_size_bytes: Some(0),
    };

    let processor = Processor::new(config, provider_with(shows), NullNotificationSink, NullRefreshTrigger);
    let first = processor.run_pass().await.unwrap();
    assert_eq!(first.summary.linked, 1);

    let second = processor.run_pass().await.unwrap();
    assert_eq!(second.summary.linked, 0);
    assert_eq!(*second.summary.skipped.get("formula1_2025").unwrap_or(&0), 1);
}

#[tokio::test]
async fn an_unrecognized_sport_load_failure_is_reported_without_failing_the_pass() {
    let source_dir = tempfile::tempdir().unwrap();
    let destination_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();

    let config = Config {
        source_dir: Some(source_dir.path().to_path_buf()),
        destination_dir: Some(destination_dir.path().to_path_buf()),
        cache_dir: Some(cache_dir.path().to_path_buf()),
        dry_run: false,
        skip_existing: true,
        link_mode: paddock_config::LinkMode::Hardlink,
        allow_cross_device_fallback: false,
        watch: Default::default(),
        sports: vec![f1_sport_config()],
        post_run: PostRunConfig::default(),
        min_file_size_bytes: Some(0),
    };

    let processor = Processor::new(config, provider_with(BTreeMap::new()), NullNotificationSink, NullRefreshTrigger);
    let outcome = processor.run_pass().await.unwrap();

    assert_eq!(outcome.summary.linked, 0);
    assert!(outcome.sport_load_failures.contains_key("formula1_2025"));
}
