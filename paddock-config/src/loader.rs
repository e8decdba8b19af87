use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::Flags;
use crate::model::{Config, LinkMode};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads configuration with the precedence required by spec.md §6:
/// defaults -> file -> environment -> flags (lowest to highest).
///
/// `.env` is loaded first (if present) so environment overlays can be
/// authored outside the shell, matching the teacher's `dotenvy` use in
/// `ferrex-config`.
pub fn load(config_path: Option<&Path>, flags: &Flags) -> Result<Config, LoadError> {
    let _ = dotenvy::dotenv();

    let mut config = Config::default();

    if let Some(path) = config_path {
        config = read_file(path)?;
    }

    apply_env(&mut config);
    apply_flags(&mut config, flags);

    Ok(config)
}

fn read_file(path: &Path) -> Result<Config, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(config: &mut Config) {
    if let Ok(v) = std::env::var("PADDOCK_SOURCE_DIR") {
        config.source_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("PADDOCK_DESTINATION_DIR") {
        config.destination_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("PADDOCK_CACHE_DIR") {
        config.cache_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("PADDOCK_DRY_RUN") {
        if let Some(b) = parse_bool(&v) {
            config.dry_run = b;
        }
    }
    if let Ok(v) = std::env::var("PADDOCK_LINK_MODE") {
        if let Some(mode) = parse_link_mode(&v) {
            config.link_mode = mode;
        }
    }
}

fn apply_flags(config: &mut Config, flags: &Flags) {
    if let Some(dir) = &flags.source_dir {
        config.source_dir = Some(dir.clone());
    }
    if let Some(dir) = &flags.destination_dir {
        config.destination_dir = Some(dir.clone());
    }
    if let Some(dir) = &flags.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if flags.dry_run {
        config.dry_run = true;
    }
    if let Some(mode) = flags.link_mode() {
        config.link_mode = mode;
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_link_mode(v: &str) -> Option<LinkMode> {
    match v.trim().to_ascii_lowercase().as_str() {
        "hardlink" => Some(LinkMode::Hardlink),
        "copy" => Some(LinkMode::Copy),
        "symlink" => Some(LinkMode::Symlink),
        _ => None,
    }
}
