// Series domain models - raw datasource results and normalized graph series
use super::table::Column;
use serde::{Deserialize, Serialize};

/// `[value, timestamp_ms]`, as datasources return it. Gaps arrive as a null
/// value; timestamps may carry a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Option<f64>, f64)")]
pub struct RawSeriesPoint(pub Option<f64>, pub i64);

impl From<(Option<f64>, f64)> for RawSeriesPoint {
    fn from((value, timestamp_ms): (Option<f64>, f64)) -> Self {
        // Saturating float-to-int cast
        Self(value, timestamp_ms as i64)
    }
}

impl RawSeriesPoint {
    pub fn new(value: f64, timestamp_ms: i64) -> Self {
        Self(Some(value), timestamp_ms)
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.1
    }
}

/// One result set as returned by a datasource before normalization.
///
/// Time-series results fill `datapoints`, tabular results fill `columns` and
/// `rows`. Every field tolerates being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTargetResult {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub datapoints: Option<Vec<RawSeriesPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<serde_json::Value>>>,
}

impl RawTargetResult {
    pub fn series(target: impl Into<String>, datapoints: Vec<RawSeriesPoint>) -> Self {
        Self {
            target: target.into(),
            datapoints: Some(datapoints),
            ..Default::default()
        }
    }

    pub fn table(columns: Vec<Column>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            columns: Some(columns),
            rows: Some(rows),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color(&'static str);

impl Color {
    /// Palette entry for a series position; stable across renders
    pub fn for_index(index: usize) -> Self {
        Color(PALETTE[index % PALETTE.len()])
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

pub const PALETTE: [&str; 56] = [
    "#7EB26D", "#EAB839", "#6ED0E0", "#EF843C", "#E24D42", "#1F78C1", "#BA43A6", "#705DA0",
    "#508642", "#CCA300", "#447EBC", "#C15C17", "#890F02", "#0A437C", "#6D1F62", "#584477",
    "#B7DBAB", "#F4D598", "#70DBED", "#F9BA8F", "#F29191", "#82B5D8", "#E5A8E2", "#AEA2E0",
    "#629E51", "#E5AC0E", "#64B0C8", "#E0752D", "#BF1B00", "#0A50A1", "#962D82", "#614D93",
    "#9AC48A", "#F2C96D", "#65C5DB", "#F9934E", "#EA6460", "#5195CE", "#D683CE", "#806EB7",
    "#3F6833", "#967302", "#2F575E", "#99440A", "#58140C", "#052B51", "#511749", "#3F2B5B",
    "#E0F9D7", "#FCEACA", "#CFFAFF", "#F9E2D2", "#FCE2DE", "#BADFF4", "#F9D9F9", "#DEDAF7",
];

/// Normalized graph series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub alias: String,
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub points: Vec<RawSeriesPoint>,
    /// Newest point falls before the requested window; render distinctly
    pub is_stale: bool,
}
