// HTTP adapter for the datasource gateway contract
use crate::application::datasource::{Datasource, DatasourceGateway, DatasourceTestResult, QueryResponse};
use crate::domain::query::QueryRequest;
use crate::error::DatasourceError;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct HttpClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    interval: Option<String>,
}

impl HttpClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn metadata_url(&self, path: &str) -> String {
        format!("{}/metadata?path={}", self.base_url, urlencoding::encode(path))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, DatasourceError> {
        let mut request = request.header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DatasourceError::Http { status, body });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                DatasourceError::Timeout
            } else {
                DatasourceError::Decode { message: e.to_string() }
            }
        })
    }
}

fn transport_error(e: reqwest::Error) -> DatasourceError {
    if e.is_timeout() {
        DatasourceError::Timeout
    } else {
        DatasourceError::Transport { message: e.to_string() }
    }
}

/// Reaches a datasource plugin host over HTTP
#[derive(Debug, Clone)]
pub struct HttpDatasourceGateway {
    http: HttpClient,
}

impl HttpDatasourceGateway {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self, DatasourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http: HttpClient {
                base_url: base_url.trim_end_matches('/').to_string(),
                token,
                client,
            },
        })
    }
}

#[async_trait]
impl DatasourceGateway for HttpDatasourceGateway {
    async fn get(&self) -> Result<Arc<dyn Datasource>, DatasourceError> {
        let request = self.http.client.get(self.http.url("/settings"));
        let settings: SettingsResponse = self.http.send(request).await?;

        tracing::debug!(
            "Acquired datasource {} (interval {:?})",
            settings.name.as_deref().unwrap_or("<unnamed>"),
            settings.interval
        );

        Ok(Arc::new(HttpDatasource {
            http: self.http.clone(),
            interval: settings.interval,
        }))
    }
}

#[derive(Debug)]
pub struct HttpDatasource {
    http: HttpClient,
    interval: Option<String>,
}

#[async_trait]
impl Datasource for HttpDatasource {
    fn interval(&self) -> Option<String> {
        self.interval.clone()
    }

    async fn test_datasource(&self) -> Result<DatasourceTestResult, DatasourceError> {
        let request = self.http.client.get(self.http.url("/health"));
        self.http.send(request).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, DatasourceError> {
        let post = self.http.client.post(self.http.url("/query")).json(request);
        self.http.send(post).await
    }

    async fn metadata_request(&self, path: &str) -> Result<serde_json::Value, DatasourceError> {
        let request = self.http.client.get(self.http.metadata_url(path));
        self.http.send(request).await
    }
}
