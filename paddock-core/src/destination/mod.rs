pub mod builder;

pub use builder::{build_destination, DestinationTemplates};
