use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::model::LinkMode;

/// Flags shared by every subcommand, merged over file and environment
/// configuration (spec.md §6's precedence order).
#[derive(Debug, Clone, Parser, Default)]
pub struct Flags {
    /// Override `source_dir`.
    #[arg(long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Override `destination_dir`.
    #[arg(long, global = true)]
    pub destination_dir: Option<PathBuf>,

    /// Override `cache_dir`.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Render destinations without performing the link action.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Override `link_mode`.
    #[arg(long, global = true, value_enum)]
    pub link_mode: Option<CliLinkMode>,
}

impl Flags {
    pub fn link_mode(&self) -> Option<LinkMode> {
        self.link_mode.map(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLinkMode {
    Hardlink,
    Copy,
    Symlink,
}

impl From<CliLinkMode> for LinkMode {
    fn from(mode: CliLinkMode) -> Self {
        match mode {
            CliLinkMode::Hardlink => LinkMode::Hardlink,
            CliLinkMode::Copy => LinkMode::Copy,
            CliLinkMode::Symlink => LinkMode::Symlink,
        }
    }
}

/// Top-level CLI surface (spec.md §6): `run` is the default subcommand.
#[derive(Debug, Parser)]
#[command(name = "paddock", version, about = "Sports release organizer")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub flags: Flags,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single pass (or start the watcher loop if `watch.enabled`).
    Run,
    /// Validate the merged configuration and exit without processing.
    ValidateConfig,
    /// Fire the configured refresh trigger without running a pass.
    TriggerRefresh,
}
