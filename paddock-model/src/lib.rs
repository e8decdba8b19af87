//! Core data model definitions shared across paddock crates.

pub mod context;
pub mod pattern;
pub mod processed;
pub mod show;

pub use context::MatchContext;
pub use pattern::{
    CompiledPatternId, EpisodeSelector, EpisodeSelectorMode, PatternRule,
    SeasonSelector, SeasonSelectorMode,
};
pub use processed::{LinkMode, ProcessedRecord};
pub use show::{Episode, Season, Show, SportRuntime};
