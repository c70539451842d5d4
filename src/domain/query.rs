// Query request domain model
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two query flavors run for every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Graph,
    Table,
}

impl QueryMode {
    /// Result format requested from the datasource for this mode
    pub fn format(self) -> QueryFormat {
        match self {
            QueryMode::Graph => QueryFormat::TimeSeries,
            QueryMode::Table => QueryFormat::Table,
        }
    }

    /// Table queries evaluate at a single instant, graph queries over the range
    pub fn instant(self) -> bool {
        matches!(self, QueryMode::Table)
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Graph => f.write_str("graph"),
            QueryMode::Table => f.write_str("table"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFormat {
    #[serde(rename = "time_series")]
    TimeSeries,
    #[serde(rename = "table")]
    Table,
}

/// Epoch milliseconds, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTarget {
    pub expr: String,
    pub format: QueryFormat,
    pub instant: bool,
}

/// Datasource-agnostic request descriptor. Built once per mode per submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub range: TimeRange,
    pub targets: Vec<QueryTarget>,
}

impl QueryRequest {
    pub fn new(query_text: &str, mode: QueryMode, range: TimeRange, interval: Option<String>) -> Self {
        Self {
            interval,
            range,
            targets: vec![QueryTarget {
                expr: query_text.to_string(),
                format: mode.format(),
                instant: mode.instant(),
            }],
        }
    }

    fn target(&self) -> Option<&QueryTarget> {
        self.targets.first()
    }

    pub fn query_text(&self) -> &str {
        self.target().map(|t| t.expr.as_str()).unwrap_or_default()
    }

    pub fn format(&self) -> Option<QueryFormat> {
        self.target().map(|t| t.format)
    }

    pub fn instant(&self) -> bool {
        self.target().is_some_and(|t| t.instant)
    }

    pub fn mode(&self) -> Option<QueryMode> {
        match self.format()? {
            QueryFormat::TimeSeries => Some(QueryMode::Graph),
            QueryFormat::Table => Some(QueryMode::Table),
        }
    }
}
