// Structured events published by the orchestrator
use crate::domain::query::QueryMode;
use crate::error::DatasourceError;
use serde::Serialize;

pub const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExploreEvent {
    DatasourceReady,
    DatasourceFailed {
        reason: String,
    },
    QueryStarted {
        mode: QueryMode,
        token: u64,
    },
    QuerySucceeded {
        mode: QueryMode,
        token: u64,
        latency_ms: i64,
    },
    QueryFailed {
        mode: QueryMode,
        token: u64,
        error: DatasourceError,
    },
}
