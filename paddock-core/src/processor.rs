//! The orchestrator: one pass through discover -> load metadata ->
//! match and act -> post-run (spec.md §4.12). Grounded on
//! `ferrex-core::scanner::MediaScanner` for the walkdir-based discovery
//! shape, generalized to paddock's sport/pattern/destination pipeline.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use paddock_config::{Config, SportConfig};
use paddock_contracts::notify::SportCounters;
use paddock_contracts::{MetadataProvider, NotificationEvent, NotificationSink, PassSummary, RefreshTrigger};
use paddock_model::{CompiledPatternId, Show, SportRuntime};

use crate::destination::{build_destination, DestinationTemplates};
use crate::error::RuntimeError;
use crate::fingerprint;
use crate::linker;
use crate::matching::{MatchOutcome, SourceFilter, SportMatcher};
use crate::metadata::normalizer::AliasLookup;
use crate::metadata::{normalize, MetadataStore};
use crate::pattern::{build_show_session_index, compile_patterns, CompiledPattern, SessionLookupIndex};
use crate::processed_cache::ProcessedCache;

const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MIN_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
const SAMPLE_TOKEN: &str = "sample";
/// Sentinel priority for structured-pass matches (no declared pattern
/// rule backs them), lower precedence than any configured rule.
const STRUCTURED_MATCH_PRIORITY: i32 = i32::MAX;

/// One resolved `show_ref` for a sport: a fetched, normalized,
/// pattern-compiled runtime, plus the derived lookups `SportMatcher`
/// needs.
struct SportInstance {
    runtime: SportRuntime,
    compiled: Vec<CompiledPattern>,
    alias_lookup: AliasLookup,
    session_index: SessionLookupIndex,
}

/// A sport configuration resolved into its primary show plus any
/// variants, tried in declaration order (spec.md §4.4-4.12 `variants[]`
/// addition).
struct SportBundle {
    config: SportConfig,
    filter: SourceFilter,
    instances: Vec<SportInstance>,
}

pub struct PassOutcome {
    pub summary: PassSummary,
    pub sport_load_failures: BTreeMap<String, String>,
}

/// What happened to one discovered file. `match_and_act` returns this
/// instead of folding directly into `PassSummary` so the worker pool
/// (spec.md §5: `N_cpu` cooperating workers) can run many of them
/// concurrently; `run_pass` folds the results into `summary` on a single
/// sequential pass once each worker finishes.
enum FileOutcome {
    Unmatched,
    Skipped(String),
    Failed(String),
    Linked(String),
}

fn record_outcome(summary: &mut PassSummary, outcome: FileOutcome) {
    match outcome {
        FileOutcome::Unmatched => {}
        FileOutcome::Skipped(sport_id) => {
            *summary.skipped.entry(sport_id.clone()).or_insert(0) += 1;
            summary.per_sport.entry(sport_id).or_insert_with(SportCounters::default).skipped += 1;
        }
        FileOutcome::Failed(sport_id) => {
            *summary.failed.entry(sport_id.clone()).or_insert(0) += 1;
            summary.per_sport.entry(sport_id).or_insert_with(SportCounters::default).failed += 1;
        }
        FileOutcome::Linked(sport_id) => {
            summary.linked += 1;
            summary.per_sport.entry(sport_id).or_insert_with(SportCounters::default).linked += 1;
        }
    }
}

pub struct Processor<P, N, R> {
    config: Config,
    provider: P,
    notifier: N,
    refresh_trigger: R,
    metadata_store: MetadataStore,
    processed_cache: ProcessedCache,
    cache_dir: PathBuf,
}

impl<P, N, R> Processor<P, N, R>
where
    P: MetadataProvider,
    N: NotificationSink,
    R: RefreshTrigger,
{
    pub fn new(config: Config, provider: P, notifier: N, refresh_trigger: R) -> Self {
        let cache_dir = config
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".paddock-cache"));
        Self {
            metadata_store: MetadataStore::new(&cache_dir, DEFAULT_METADATA_TTL),
            processed_cache: ProcessedCache::new(cache_dir.join("processed")),
            config,
            provider,
            notifier,
            refresh_trigger,
            cache_dir,
        }
    }

    pub async fn run_pass(&self) -> Result<PassOutcome, RuntimeError> {
        let pass_id = Uuid::new_v4().simple().to_string();
        info!(pass_id = %pass_id, "starting pass");

        let source_dir = self
            .config
            .source_dir
            .clone()
            .ok_or(RuntimeError::Cancelled)?;
        let destination_dir = self
            .config
            .destination_dir
            .clone()
            .ok_or(RuntimeError::Cancelled)?;

        let files = discover(&source_dir, self.config.min_file_size_bytes);
        debug!(pass_id = %pass_id, discovered = files.len() as u64, "discovery complete");

        let (bundles, sport_load_failures) = self.load_sport_bundles().await;

        let mut summary = PassSummary::default();
        let link_mode: paddock_model::LinkMode = convert_link_mode(self.config.link_mode);

        // N_cpu cooperating workers (spec.md §5); destinations claimed this
        // pass are tracked in `seen_destinations` so a second file landing
        // on the same rendered path is rejected as an intra-pass collision
        // rather than handed to the Linker as an overwrite decision.
        let seen_destinations: Mutex<HashSet<PathBuf>> = Mutex::new(HashSet::new());
        let outcomes: Vec<FileOutcome> = stream::iter(files.iter())
            .map(|relative_path| {
                self.match_and_act(
                    relative_path,
                    &source_dir,
                    &destination_dir,
                    &bundles,
                    link_mode,
                    &pass_id,
                    &seen_destinations,
                )
            })
            .buffer_unordered(worker_pool_size())
            .collect()
            .await;

        for outcome in outcomes {
            record_outcome(&mut summary, outcome);
        }

        if summary.linked > 0 {
            if let Err(e) = self.refresh_trigger.trigger(&summary).await {
                warn!(pass_id = %pass_id, error = %e, "refresh trigger failed");
            } else {
                self.notifier.emit(&NotificationEvent::RefreshRequested).await;
            }
        }
        self.notifier
            .emit(&NotificationEvent::PassSummary(summary.clone()))
            .await;

        if !self.config.dry_run {
            match self.processed_cache.commit().await {
                Ok(count) => debug!(pass_id = %pass_id, committed = count as u64, "processed cache committed"),
                Err(e) => error!(pass_id = %pass_id, error = %e, "failed to commit processed cache"),
            }
        }

        info!(pass_id = %pass_id, linked = summary.linked, "pass complete");
        Ok(PassOutcome {
            summary,
            sport_load_failures,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn match_and_act(
        &self,
        relative_path: &Path,
        source_dir: &Path,
        destination_dir: &Path,
        bundles: &[SportBundle],
        link_mode: paddock_model::LinkMode,
        pass_id: &str,
        seen_destinations: &Mutex<HashSet<PathBuf>>,
    ) -> FileOutcome {
        let Some((sport_id, outcome, priority, allow_unmatched)) =
            resolve_match(relative_path, bundles)
        else {
            return FileOutcome::Unmatched;
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                if allow_unmatched {
                    return FileOutcome::Skipped(sport_id);
                }
                if self.config.post_run.traces_enabled {
                    self.write_trace(pass_id, relative_path, "no_match", None).await;
                }
                return FileOutcome::Failed(sport_id);
            }
        };

        let templates = destination_templates(bundles, &sport_id, outcome.pattern_id.as_ref());
        let destination = match build_destination(&templates, &outcome.context, destination_dir) {
            Ok(path) => path,
            Err(e) => {
                warn!(pass_id, sport_id = %sport_id, error = %e, "destination build failed");
                return FileOutcome::Failed(sport_id);
            }
        };

        // Template-rendered destinations are deduplicated against every
        // other file this pass has already claimed (spec.md §5) before the
        // Linker ever sees them.
        {
            let mut seen = seen_destinations.lock().await;
            if !seen.insert(destination.clone()) {
                warn!(pass_id, sport_id = %sport_id, destination = %destination.display(), "intra-pass destination collision");
                if self.config.post_run.traces_enabled {
                    self.write_trace(pass_id, relative_path, "destination_collision", outcome.score)
                        .await;
                }
                return FileOutcome::Failed(sport_id);
            }
        }

        let absolute_source = source_dir.join(relative_path);
        let source_fingerprint = match fingerprint::digest_file(&absolute_source).await {
            Ok(f) => f,
            Err(e) => {
                warn!(pass_id, sport_id = %sport_id, error = %e, "source vanished before linking");
                return FileOutcome::Failed(sport_id);
            }
        };

        let destination_str = destination.display().to_string();
        let should_skip = self
            .processed_cache
            .should_skip(&source_fingerprint, &destination_str, !self.config.skip_existing)
            .await;
        if should_skip {
            return FileOutcome::Skipped(sport_id);
        }

        if self.config.dry_run {
            info!(pass_id, sport_id = %sport_id, destination = %destination_str, "dry run: would link");
            return FileOutcome::Linked(sport_id);
        }

        let incoming = linker::Specificity {
            priority,
            fuzzy_session: outcome.fuzzy_session,
        };
        let existing = self
            .processed_cache
            .get(&source_fingerprint)
            .await
            .map(|record| linker::Specificity {
                priority: record.priority,
                fuzzy_session: record.fuzzy_session,
            });

        match linker::link(
            &absolute_source,
            &destination,
            link_mode,
            self.config.allow_cross_device_fallback,
            incoming,
            existing,
        )
        .await
        {
            Ok(_) => {
                self.processed_cache.stage(paddock_model::ProcessedRecord {
                    source_fingerprint,
                    destination_path: destination_str.clone(),
                    link_mode,
                    pattern_id: outcome
                        .pattern_id
                        .clone()
                        .unwrap_or_else(|| CompiledPatternId::new("structured")),
                    priority,
                    fuzzy_session: outcome.fuzzy_session,
                    created_at: chrono::Utc::now(),
                });
                self.notifier
                    .emit(&NotificationEvent::PerFileLinked {
                        source: absolute_source.display().to_string(),
                        destination: destination_str,
                        sport_id: sport_id.clone(),
                    })
                    .await;
                FileOutcome::Linked(sport_id)
            }
            Err(e) => {
                warn!(pass_id, sport_id = %sport_id, error = %e, "link failed");
                if self.config.post_run.traces_enabled {
                    self.write_trace(pass_id, relative_path, &e.to_string(), outcome.score)
                        .await;
                }
                FileOutcome::Failed(sport_id)
            }
        }
    }

    async fn write_trace(&self, pass_id: &str, relative_path: &Path, step: &str, score: Option<f64>) {
        let dir = self.cache_dir.join("traces").join(pass_id);
        if tokio::fs::create_dir_all(&dir).await.is_err() {
            return;
        }
        let file_name = relative_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");
        let path = dir.join(format!("{file_name}.json"));
        let body = serde_json::json!({
            "file": relative_path.display().to_string(),
            "failing_step": step,
            "score": score,
        });
        if let Ok(bytes) = serde_json::to_vec_pretty(&body) {
            let _ = tokio::fs::write(path, bytes).await;
        }
    }

    /// Loads every enabled sport's primary show plus variants
    /// concurrently (spec.md §5: `N_sports` cooperating loads). A sport
    /// with zero resolvable instances is recorded as a load failure and
    /// skipped for this pass; other sports are unaffected.
    async fn load_sport_bundles(&self) -> (Vec<SportBundle>, BTreeMap<String, String>) {
        let enabled: Vec<&SportConfig> = self.config.sports.iter().filter(|s| s.enabled).collect();
        let loads = enabled
            .iter()
            .map(|sport| load_one_bundle(sport, &self.provider, &self.metadata_store));
        let results = futures::future::join_all(loads).await;

        let mut bundles = Vec::new();
        let mut failures = BTreeMap::new();
        for (sport, result) in enabled.into_iter().zip(results) {
            match result {
                Ok(bundle) => bundles.push(bundle),
                Err(e) => {
                    failures.insert(sport.id.clone(), e);
                }
            }
        }
        (bundles, failures)
    }
}

fn resolve_match(
    relative_path: &Path,
    bundles: &[SportBundle],
) -> Option<(String, Result<MatchOutcome, crate::error::MatchError>, i32, bool)> {
    for bundle in bundles {
        for instance in &bundle.instances {
            let matcher = SportMatcher {
                runtime: &instance.runtime,
                compiled: &instance.compiled,
                config: &bundle.config,
                filter: &bundle.filter,
                alias_lookup: &instance.alias_lookup,
                session_index: &instance.session_index,
            };
            match matcher.match_file(relative_path) {
                Ok(outcome) => {
                    let priority = outcome
                        .pattern_id
                        .as_ref()
                        .and_then(|id| instance.runtime.rules.iter().find(|r| r.id == id.0).map(|r| r.priority))
                        .unwrap_or(STRUCTURED_MATCH_PRIORITY);
                    return Some((
                        bundle.config.id.clone(),
                        Ok(outcome),
                        priority,
                        bundle.config.allow_unmatched,
                    ));
                }
                Err(crate::error::MatchError::IgnoredByFilter) | Err(crate::error::MatchError::SportDisabled) => {
                    continue;
                }
                Err(e) => {
                    return Some((bundle.config.id.clone(), Err(e), STRUCTURED_MATCH_PRIORITY, bundle.config.allow_unmatched));
                }
            }
        }
    }
    None
}

fn destination_templates(
    bundles: &[SportBundle],
    sport_id: &str,
    pattern_id: Option<&CompiledPatternId>,
) -> DestinationTemplates {
    let overrides = pattern_id.and_then(|id| {
        bundles
            .iter()
            .find(|b| b.config.id == sport_id)
            .and_then(|b| b.instances.first())
            .and_then(|i| i.runtime.rules.iter().find(|r| r.id == id.0))
            .and_then(|r| r.destination_overrides.as_ref())
    });

    DestinationTemplates {
        root_folder: overrides
            .and_then(|o| o.root_folder.clone())
            .unwrap_or_else(|| "{show_title} {season_year}".to_string()),
        season_folder: overrides
            .and_then(|o| o.season_folder.clone())
            .unwrap_or_else(|| "{season_round:02} {season_title}".to_string()),
        filename: overrides
            .and_then(|o| o.filename.clone())
            .unwrap_or_else(|| {
                "{show_title} - S{season_number:02}E{episode_number:02} - {episode_title}".to_string()
            }),
    }
}

async fn load_one_bundle(
    sport: &SportConfig,
    provider: &impl MetadataProvider,
    metadata_store: &MetadataStore,
) -> Result<SportBundle, String> {
    let filter = SourceFilter::new(&sport.source_globs, &sport.source_extensions)
        .map_err(|e| format!("invalid source filter: {e}"))?;

    let mut show_refs = vec![sport.show_ref.clone()];
    show_refs.extend(sport.variants.iter().cloned());

    let mut instances = Vec::new();
    for show_ref in show_refs {
        match build_instance(sport, &show_ref, provider, metadata_store).await {
            Ok(instance) => instances.push(instance),
            Err(e) => warn!(sport_id = %sport.id, show_ref = %show_ref, error = %e, "show_ref load failed"),
        }
    }

    if instances.is_empty() {
        return Err(format!("no resolvable show_ref for sport '{}'", sport.id));
    }

    Ok(SportBundle {
        config: sport.clone(),
        filter,
        instances,
    })
}

async fn build_instance(
    sport: &SportConfig,
    show_ref: &str,
    provider: &impl MetadataProvider,
    metadata_store: &MetadataStore,
) -> Result<SportInstance, String> {
    let fingerprint = fingerprint::request_fingerprint(show_ref, &[]);
    let served = metadata_store
        .serve(show_ref, &fingerprint, provider)
        .await
        .map_err(|e| e.to_string())?;
    let raw = served.into_inner();

    let show: Show = normalize(show_ref, raw).map_err(|e| e.to_string())?;

    let rules: Vec<paddock_model::PatternRule> = sport
        .pattern_sets
        .iter()
        .map(|r| paddock_model::PatternRule {
            id: r.id.clone(),
            regex: r.regex.clone(),
            description: r.description.clone(),
            priority: r.priority,
            season_selector: r.season_selector.clone(),
            episode_selector: r.episode_selector.clone(),
            session_aliases: r.session_aliases.clone(),
            destination_overrides: r.destination_overrides.clone(),
        })
        .collect();

    let compiled = compile_patterns(&rules, &show).map_err(|e| e.to_string())?;
    let alias_lookup = AliasLookup::build(&show, &sport.team_alias_map);
    let session_index = build_show_session_index(&show);

    let runtime = SportRuntime {
        sport_id: sport.id.clone(),
        show,
        rules,
        metadata_fingerprint: fingerprint,
    };

    Ok(SportInstance {
        runtime,
        compiled,
        alias_lookup,
        session_index,
    })
}

/// Walks `source_dir`, dropping directories and any file tripping the
/// sample-file skip rule (spec.md §4.4-4.12 added detail). Discovery
/// order is stable: sorted lexicographically within the root (spec.md
/// §5), independent of the filesystem's native readdir order.
fn discover(source_dir: &Path, min_file_size_bytes: Option<u64>) -> Vec<PathBuf> {
    let min_size = min_file_size_bytes.unwrap_or(DEFAULT_MIN_FILE_SIZE_BYTES);
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(relative) = path.strip_prefix(source_dir).ok().map(Path::to_path_buf) else {
            continue;
        };
        if is_sample_file(&relative, entry.metadata().ok().map(|m| m.len()).unwrap_or(0), min_size) {
            debug!(path = %relative.display(), "skipping sample/undersized file");
            continue;
        }
        files.push(relative);
    }
    files.sort();
    files
}

fn is_sample_file(relative: &Path, size: u64, min_size: u64) -> bool {
    let stem_has_sample = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase().contains(SAMPLE_TOKEN))
        .unwrap_or(false);
    stem_has_sample || size < min_size
}

fn convert_link_mode(mode: paddock_config::LinkMode) -> paddock_model::LinkMode {
    match mode {
        paddock_config::LinkMode::Hardlink => paddock_model::LinkMode::Hardlink,
        paddock_config::LinkMode::Copy => paddock_model::LinkMode::Copy,
        paddock_config::LinkMode::Symlink => paddock_model::LinkMode::Symlink,
    }
}

/// Bounds match/link concurrency to the host's available parallelism
/// (spec.md §5: `N_cpu` cooperating workers, each owning a file through
/// match -> build -> link without cross-worker handoff). Used as the
/// `buffer_unordered` width in `run_pass`.
fn worker_pool_size() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
