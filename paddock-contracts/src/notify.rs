use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One event emitted during or after a pass. The core does not depend on
/// delivery semantics (best-effort, fire-and-forget).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationEvent {
    PerFileLinked {
        source: String,
        destination: String,
        sport_id: String,
    },
    PassSummary(PassSummary),
    RefreshRequested,
}

/// Per-sport and overall counters reported at the end of a pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassSummary {
    pub linked: u64,
    pub skipped: BTreeMap<String, u64>,
    pub failed: BTreeMap<String, u64>,
    pub per_sport: BTreeMap<String, SportCounters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SportCounters {
    pub linked: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Delivers a notification event to whatever external sink(s) are
/// configured (chat, e-mail, etc). Implementations should not block the
/// pass on delivery failure.
pub trait NotificationSink: Send + Sync {
    fn emit(
        &self,
        event: &NotificationEvent,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// A sink that drops every event; used when no notifications are
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    async fn emit(&self, _event: &NotificationEvent) {}
}
