// Result normalizer - raw datasource results into graph series and tables
use crate::domain::query::QueryRequest;
use crate::domain::series::{Color, RawTargetResult, Series};
use crate::domain::table::TableModel;

pub const DEFAULT_STALENESS_THRESHOLD_MS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    staleness_threshold_ms: i64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            staleness_threshold_ms: DEFAULT_STALENESS_THRESHOLD_MS,
        }
    }
}

impl Normalizer {
    pub fn new(staleness_threshold_ms: i64) -> Self {
        Self { staleness_threshold_ms }
    }

    pub fn staleness_threshold_ms(&self) -> i64 {
        self.staleness_threshold_ms
    }

    /// One series per raw target, in input order. Input order drives color
    /// and legend order.
    pub fn to_series_list(&self, raw_targets: &[RawTargetResult], request: &QueryRequest) -> Vec<Series> {
        raw_targets
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let points = raw.datapoints.clone().unwrap_or_default();
                let is_stale = points
                    .last()
                    .is_some_and(|last| self.is_stale(last.timestamp_ms(), request.range.from));

                Series {
                    alias: raw.target.clone(),
                    color: Color::for_index(index),
                    unit: raw.unit.clone(),
                    points,
                    is_stale,
                }
            })
            .collect()
    }

    // Exclusive: exactly `threshold` before `from` is still fresh
    fn is_stale(&self, last_ms: i64, from_ms: i64) -> bool {
        last_ms < from_ms.saturating_sub(self.staleness_threshold_ms)
    }

    /// First result set only; anything after it is dropped.
    pub fn to_table_model(&self, raw_results: &[RawTargetResult]) -> TableModel {
        match raw_results.first() {
            Some(first) => TableModel {
                columns: first.columns.clone().unwrap_or_default(),
                rows: first.rows.clone().unwrap_or_default(),
            },
            None => TableModel::empty(),
        }
    }
}

pub fn to_series_list(raw_targets: &[RawTargetResult], request: &QueryRequest) -> Vec<Series> {
    Normalizer::default().to_series_list(raw_targets, request)
}

pub fn to_table_model(raw_results: &[RawTargetResult]) -> TableModel {
    Normalizer::default().to_table_model(raw_results)
}
