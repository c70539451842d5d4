// Query lifecycle state exposed to the presentation layer
use super::query::QueryRequest;
use super::series::Series;
use super::table::TableModel;
use crate::error::DatasourceError;
use serde::Serialize;

/// Lifecycle of one query mode. Re-armed by every submit; no terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QueryOutcome<T> {
    Idle,
    Loading,
    Success {
        data: T,
        latency_ms: i64,
        request: QueryRequest,
    },
    Failure {
        error: DatasourceError,
    },
}

impl<T> Default for QueryOutcome<T> {
    fn default() -> Self {
        QueryOutcome::Idle
    }
}

impl<T> QueryOutcome<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, QueryOutcome::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryOutcome::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryOutcome::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DatasourceError> {
        match self {
            QueryOutcome::Failure { error } => Some(error),
            _ => None,
        }
    }

    pub fn latency_ms(&self) -> Option<i64> {
        match self {
            QueryOutcome::Success { latency_ms, .. } => Some(*latency_ms),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&QueryRequest> {
        match self {
            QueryOutcome::Success { request, .. } => Some(request),
            _ => None,
        }
    }
}

/// Handle-free view of the datasource connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Uninitialized,
    Ready,
    Failed { reason: String },
}

/// What the graph panel renders. A failed graph query keeps its error on
/// screen, unlike the table panel which clears.
#[derive(Debug, PartialEq)]
pub enum GraphDisplay<'a> {
    Series(&'a [Series]),
    Error(&'a DatasourceError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExploreSnapshot {
    pub connection: ConnectionStatus,
    pub query_text: String,
    pub graph: QueryOutcome<Vec<Series>>,
    pub table: QueryOutcome<TableModel>,
}

impl ExploreSnapshot {
    pub fn graph_display(&self) -> Option<GraphDisplay<'_>> {
        match &self.graph {
            QueryOutcome::Success { data, .. } => Some(GraphDisplay::Series(data)),
            QueryOutcome::Failure { error } => Some(GraphDisplay::Error(error)),
            QueryOutcome::Idle | QueryOutcome::Loading => None,
        }
    }

    pub fn table_display(&self) -> Option<&TableModel> {
        self.table.data()
    }

    pub fn is_loading(&self) -> bool {
        self.graph.is_loading() || self.table.is_loading()
    }

    /// Slowest completed latency of the current submission
    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.graph.latency_ms(), self.table.latency_ms()) {
            (Some(g), Some(t)) => Some(g.max(t)),
            (g, t) => g.or(t),
        }
    }
}
