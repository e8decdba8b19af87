pub mod engine;
pub mod filter;

pub use engine::{MatchOutcome, SportMatcher};
pub use filter::SourceFilter;
