pub mod normalizer;
pub mod provider;
pub mod store;

pub use normalizer::normalize;
pub use provider::HttpMetadataProvider;
pub use store::{MetadataStore, ServeResult};
