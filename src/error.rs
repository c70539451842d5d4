use crate::domain::query::QueryMode;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a datasource. Cloned into query outcomes and events.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DatasourceError {
    #[error("datasource request timed out")]
    Timeout,

    #[error("datasource responded with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("datasource transport error: {message}")]
    Transport { message: String },

    #[error("failed to decode datasource response: {message}")]
    Decode { message: String },

    #[error("datasource rejected the request: {message}")]
    Rejected { message: String },
}

impl DatasourceError {
    pub fn code(&self) -> &'static str {
        match self {
            DatasourceError::Timeout => "timeout",
            DatasourceError::Http { .. } => "http",
            DatasourceError::Transport { .. } => "transport",
            DatasourceError::Decode { .. } => "decode",
            DatasourceError::Rejected { .. } => "rejected",
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        DatasourceError::Rejected { message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("datasource unavailable: {0}")]
    DatasourceUnavailable(String),

    #[error("datasource is not ready")]
    NotReady,

    #[error("{mode} query failed: {source}")]
    QueryFailed {
        mode: QueryMode,
        #[source]
        source: DatasourceError,
    },

    #[error("discarded {mode} result for token {token}; latest is {latest}")]
    StaleOverwrite { mode: QueryMode, token: u64, latest: u64 },

    #[error(transparent)]
    Datasource(#[from] DatasourceError),
}

pub type ExploreResult<T> = Result<T, ExploreError>;
