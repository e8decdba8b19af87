//! Filesystem observer producing a coalesced stream of change signals
//! plus a forced periodic reconciliation tick (spec.md §4.11).
//! Grounded on `ferrex-core`'s `FileWatcher`: the same
//! poll-vs-debounce selection based on `/proc/mounts`, the same
//! event-to-domain-type conversion shape, generalized from per-library
//! video-file watching to configurable include/ignore globs.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, NoCache};
use tokio::sync::{mpsc, watch};

use crate::error::WatchError;

/// A coalesced batch of paths that changed during one debounce window.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub paths: Vec<PathBuf>,
}

/// What the watcher's channel can emit: a debounced batch of changes,
/// or an unconditional reconciliation tick.
#[derive(Debug, Clone)]
pub enum WatchSignal {
    Changed(ChangeBatch),
    Reconcile,
}

pub struct WatchSettings {
    pub paths: Vec<PathBuf>,
    pub include: Vec<String>,
    pub ignore: Vec<String>,
    pub debounce_seconds: u64,
    pub reconcile_interval: u64,
}

enum Backend {
    Debounced(Debouncer<RecommendedWatcher, NoCache>),
    Poll(PollWatcher),
}

/// Owns the live `notify` backend and the reconciliation timer task.
/// Dropping it (or sending on `shutdown`) tears both down.
pub struct Watcher {
    _backend: Backend,
    shutdown: watch::Sender<bool>,
}

impl Watcher {
    /// Cancels pending timers and the reconciliation task at the next
    /// safe checkpoint.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Starts watching `settings.paths`, returning the live watcher handle
/// and a receiver of coalesced signals.
pub fn start(settings: WatchSettings) -> Result<(Watcher, mpsc::UnboundedReceiver<WatchSignal>), WatchError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let include = build_glob_set(&settings.include);
    let ignore = build_glob_set(&settings.ignore);

    let use_poll = settings.paths.iter().any(|p| is_network_filesystem(p));

    let backend = if use_poll {
        let tx = tx.clone();
        let include = include.clone();
        let ignore = ignore.clone();
        let mut watcher = PollWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    dispatch_event(event, &include, &ignore, &tx);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(30)),
        )
        .map_err(|e| WatchError::Setup {
            path: format!("{:?}", settings.paths),
            source: e,
        })?;

        for path in &settings.paths {
            watcher
                .watch(path, RecursiveMode::Recursive)
                .map_err(|e| WatchError::Setup {
                    path: path.display().to_string(),
                    source: e,
                })?;
        }
        Backend::Poll(watcher)
    } else {
        let tx = tx.clone();
        let include = include.clone();
        let ignore = ignore.clone();
        let mut debouncer = new_debouncer(
            Duration::from_secs(settings.debounce_seconds.max(1)),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let mut paths = Vec::new();
                    for de in events {
                        #[allow(deprecated)]
                        let notify_event = &de.event;
                        collect_matching_paths(notify_event, &include, &ignore, &mut paths);
                    }
                    if !paths.is_empty() {
                        let _ = tx.send(WatchSignal::Changed(ChangeBatch { paths }));
                    }
                }
                Err(errors) => {
                    for e in errors {
                        tracing::error!(error = %e, "filesystem watch error");
                    }
                }
            },
        )
        .map_err(|e| WatchError::Setup {
            path: format!("{:?}", settings.paths),
            source: e,
        })?;

        for path in &settings.paths {
            debouncer
                .watch(path, RecursiveMode::Recursive)
                .map_err(|e| WatchError::Setup {
                    path: path.display().to_string(),
                    source: e,
                })?;
        }
        Backend::Debounced(debouncer)
    };

    let reconcile_tx = tx;
    let reconcile_interval = settings.reconcile_interval.max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(reconcile_interval));
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if reconcile_tx.send(WatchSignal::Reconcile).is_err() {
                        break;
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    Ok((
        Watcher {
            _backend: backend,
            shutdown: shutdown_tx,
        },
        rx,
    ))
}

fn dispatch_event(
    event: Event,
    include: &Option<GlobSet>,
    ignore: &Option<GlobSet>,
    tx: &mpsc::UnboundedSender<WatchSignal>,
) {
    let mut paths = Vec::new();
    collect_matching_paths(&event, include, ignore, &mut paths);
    if !paths.is_empty() {
        let _ = tx.send(WatchSignal::Changed(ChangeBatch { paths }));
    }
}

fn collect_matching_paths(
    event: &Event,
    include: &Option<GlobSet>,
    ignore: &Option<GlobSet>,
    out: &mut Vec<PathBuf>,
) {
    for path in &event.paths {
        if passes_filters(path, include, ignore) {
            out.push(path.clone());
        }
    }
}

fn passes_filters(path: &Path, include: &Option<GlobSet>, ignore: &Option<GlobSet>) -> bool {
    if let Some(ignore) = ignore {
        if ignore.is_match(path) {
            return false;
        }
    }
    if let Some(include) = include {
        if !include.is_match(path) {
            return false;
        }
    }
    true
}

fn build_glob_set(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        } else {
            tracing::warn!(pattern = %pattern, "ignoring invalid watch glob");
        }
    }
    builder.build().ok()
}

/// Determine if a path resides on a network filesystem (Linux), so the
/// poll watcher is used instead of the inotify-backed debouncer, which
/// does not observe remote changes reliably.
fn is_network_filesystem(path: &Path) -> bool {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let file = match fs::File::open("/proc/mounts") {
        Ok(f) => f,
        Err(_) => return false,
    };
    let reader = BufReader::new(file);

    let mut best_match: Option<(PathBuf, String)> = None;
    for line in reader.lines().map_while(Result::ok) {
        let mut parts = line.split_whitespace();
        let _src = parts.next();
        let mountpoint = parts.next();
        let fstype = parts.next();
        if let (Some(mnt), Some(fs_type)) = (mountpoint, fstype) {
            let mnt_path = PathBuf::from(mnt);
            if canonical.starts_with(&mnt_path) {
                let take = match &best_match {
                    None => true,
                    Some((best, _)) => mnt_path.as_os_str().len() > best.as_os_str().len(),
                };
                if take {
                    best_match = Some((mnt_path, fs_type.to_string()));
                }
            }
        }
    }

    if let Some((_, fstype)) = best_match {
        let net_fs = ["nfs", "nfs4", "cifs", "smbfs", "smb3", "afs", "sshfs", "fuse.sshfs"];
        return net_fs.contains(&fstype.as_str());
    }
    false
}
