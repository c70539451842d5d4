// Datasource gateway contract consumed by the orchestrator
use crate::domain::query::QueryRequest;
use crate::domain::series::RawTargetResult;
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a datasource connectivity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceTestResult {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl DatasourceTestResult {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Vec<RawTargetResult>,
}

#[async_trait]
pub trait Datasource: Send + Sync {
    /// Configured scrape/step interval, passed verbatim into requests
    fn interval(&self) -> Option<String>;

    async fn test_datasource(&self) -> Result<DatasourceTestResult, DatasourceError>;

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, DatasourceError>;

    /// Metadata lookups (label names, series, ...) used by query editors
    async fn metadata_request(&self, path: &str) -> Result<serde_json::Value, DatasourceError>;
}

#[async_trait]
pub trait DatasourceGateway: Send + Sync {
    /// Acquire the session's datasource
    async fn get(&self) -> Result<Arc<dyn Datasource>, DatasourceError>;
}
