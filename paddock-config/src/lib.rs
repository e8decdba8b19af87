//! Configuration document, env/flag overlay, and validation for paddock.
//!
//! Precedence, lowest to highest: configuration defaults -> TOML file ->
//! environment variables -> CLI flags (spec.md §6).

pub mod cli;
pub mod loader;
pub mod model;
pub mod validation;

pub use model::{
    Config, LinkMode, PatternRuleConfig, PostRunConfig, SportConfig, WatchConfig,
};
pub use validation::{validate, ConfigError};
