//! `paddock` binary: CLI entry point, grounded on `ferrexctl`'s
//! `clap`-derive-plus-dispatch shape, trimmed to this tool's three
//! subcommands (spec.md §6).

mod sink;
mod trigger;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paddock_config::cli::{Cli, Command};
use paddock_contracts::{PassSummary, RefreshTrigger, RetryPolicy};
use paddock_core::metadata::HttpMetadataProvider;
use paddock_core::processor::Processor;
use paddock_core::watch::{self, WatchSettings, WatchSignal};

const METADATA_DEADLINE: Duration = Duration::from_secs(10);

fn default_metadata_base_url() -> String {
    std::env::var("PADDOCK_METADATA_BASE_URL").unwrap_or_else(|_| "http://localhost:8090".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match paddock_config::loader::load(cli.config.as_deref(), &cli.flags) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(2);
        }
    };

    if let Err(errors) = paddock_config::validate(&config) {
        for error in &errors {
            tracing::error!(error = %error, "invalid configuration");
        }
        return ExitCode::from(2);
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::ValidateConfig => {
            tracing::info!("configuration is valid");
            ExitCode::SUCCESS
        }
        Command::TriggerRefresh => run_trigger_refresh(&config).await,
        Command::Run => run_pass_or_watch(config).await,
    }
}

async fn run_trigger_refresh(config: &paddock_config::Config) -> ExitCode {
    let Some(url) = config.post_run.refresh_trigger.clone() else {
        tracing::error!("no refresh_trigger configured");
        return ExitCode::from(2);
    };
    let trigger = trigger::WebhookRefreshTrigger::new(url);
    match trigger.trigger(&PassSummary::default()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "refresh trigger failed");
            ExitCode::from(3)
        }
    }
}

async fn run_pass_or_watch(config: paddock_config::Config) -> ExitCode {
    let provider = HttpMetadataProvider::new(default_metadata_base_url(), RetryPolicy::default(), METADATA_DEADLINE);
    let refresh_trigger = trigger::OptionalRefreshTrigger::from_config(config.post_run.refresh_trigger.clone());
    let notifier = sink::CompositeNotificationSink::new(config.post_run.notifications.clone());

    let watch_enabled = config.watch.enabled;
    let watch_settings = WatchSettings {
        paths: config.watch.paths.clone(),
        include: config.watch.include.clone(),
        ignore: config.watch.ignore.clone(),
        debounce_seconds: config.watch.debounce_seconds,
        reconcile_interval: config.watch.reconcile_interval,
    };

    let processor = Processor::new(config, provider, notifier, refresh_trigger);

    if !watch_enabled {
        return run_once(&processor).await;
    }

    let (watcher, mut signals) = match watch::start(watch_settings) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to start watcher");
            return ExitCode::from(3);
        }
    };

    let mut exit_code = ExitCode::SUCCESS;
    loop {
        tokio::select! {
            signal = signals.recv() => {
                match signal {
                    Some(WatchSignal::Changed(_)) | Some(WatchSignal::Reconcile) => {
                        exit_code = run_once(&processor).await;
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down watcher");
                watcher.shutdown();
                break;
            }
        }
    }
    exit_code
}

async fn run_once<P, N, R>(processor: &Processor<P, N, R>) -> ExitCode
where
    P: paddock_contracts::MetadataProvider,
    N: paddock_contracts::NotificationSink,
    R: paddock_contracts::RefreshTrigger,
{
    match processor.run_pass().await {
        Ok(outcome) => {
            let failed_totals: u64 = outcome.summary.failed.values().sum();
            if !outcome.sport_load_failures.is_empty() || failed_totals > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "pass failed");
            ExitCode::from(3)
        }
    }
}

