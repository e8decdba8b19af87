pub mod compiler;
pub mod session_index;

pub use compiler::{compile_patterns, CompiledPattern};
pub use session_index::{build_show_session_index, SessionLookupIndex};
