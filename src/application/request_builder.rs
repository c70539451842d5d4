// Request builder - turns query text into a datasource-agnostic request
use crate::domain::query::{QueryMode, QueryRequest, TimeRange};

pub const DEFAULT_LOOKBACK_MS: i64 = 3 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBuilder {
    lookback_ms: i64,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            lookback_ms: DEFAULT_LOOKBACK_MS,
        }
    }
}

impl RequestBuilder {
    pub fn new(lookback_ms: i64) -> Self {
        Self { lookback_ms }
    }

    pub fn lookback_ms(&self) -> i64 {
        self.lookback_ms
    }

    /// Query text is not validated here; callers reject empty input.
    pub fn build(&self, query_text: &str, mode: QueryMode, now_ms: i64, interval: Option<String>) -> QueryRequest {
        let range = TimeRange {
            from: now_ms.saturating_sub(self.lookback_ms),
            to: now_ms,
        };
        QueryRequest::new(query_text, mode, range, interval)
    }
}

/// Build with the default three hour window
pub fn build_request(query_text: &str, mode: QueryMode, now_ms: i64, interval: Option<String>) -> QueryRequest {
    RequestBuilder::default().build(query_text, mode, now_ms, interval)
}
