use crate::application::normalizer::{DEFAULT_STALENESS_THRESHOLD_MS, Normalizer};
use crate::application::orchestrator::OrchestratorOptions;
use crate::application::request_builder::RequestBuilder;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ExploreConfig {
    pub datasource: DatasourceSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasourceSettings {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct QuerySettings {
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: i64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
        }
    }
}

impl QuerySettings {
    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            request_builder: RequestBuilder::new(self.lookback_hours.saturating_mul(60 * 60 * 1000)),
            normalizer: Normalizer::new(self.staleness_threshold_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_lookback_hours() -> i64 {
    3
}

fn default_staleness_threshold_ms() -> i64 {
    DEFAULT_STALENESS_THRESHOLD_MS
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn load_explore_config() -> anyhow::Result<ExploreConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/explore").required(false))
        .add_source(config::Environment::with_prefix("EXPLORE").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
