// HTTP request handlers
use crate::domain::outcome::ExploreSnapshot;
use crate::error::{DatasourceError, ExploreError};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Deserialize)]
pub struct QueryTextBody {
    pub text: String,
}

#[derive(Deserialize)]
pub struct MetadataQuery {
    pub path: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current connection state and both query outcomes
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<ExploreSnapshot> {
    Json(state.orchestrator.snapshot().await)
}

pub async fn set_query_text(State(state): State<Arc<AppState>>, Json(body): Json<QueryTextBody>) -> StatusCode {
    state.orchestrator.set_query_text(body.text).await;
    StatusCode::NO_CONTENT
}

/// Run the stored query in both modes without waiting for results
pub async fn submit(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.submit().await {
        Ok(Some(submission)) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "graph_token": submission.graph_token,
                "table_token": submission.table_token,
            })),
        )
            .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Pass-through for query editor metadata lookups
pub async fn metadata(State(state): State<Arc<AppState>>, Query(query): Query<MetadataQuery>) -> Response {
    match state.orchestrator.metadata_request(&query.path).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(e),
    }
}

/// Orchestrator events as server-sent events
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(state.orchestrator.subscribe())
        .filter_map(|event| event.ok())
        .filter_map(|event| Event::default().json_data(&event).ok())
        .map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn error_response(e: ExploreError) -> Response {
    let status = match &e {
        ExploreError::NotReady | ExploreError::DatasourceUnavailable(_) => StatusCode::CONFLICT,
        ExploreError::Datasource(DatasourceError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        ExploreError::Datasource(_) => StatusCode::BAD_GATEWAY,
        ExploreError::QueryFailed { .. } | ExploreError::StaleOverwrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::debug!("Responding {} to request: {}", status, e);
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}
