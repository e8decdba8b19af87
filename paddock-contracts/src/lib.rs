//! Narrow traits for the collaborators spec.md §1 calls out of scope:
//! metadata-provider transport, notification sinks, and the downstream
//! library-refresh trigger. The core depends only on these signatures.

pub mod notify;
pub mod provider;
pub mod refresh;
pub mod retry;

pub use notify::{NotificationEvent, NotificationSink, PassSummary};
pub use provider::{MetadataProvider, ProviderError, RawMetadata};
pub use refresh::RefreshTrigger;
pub use retry::RetryPolicy;
