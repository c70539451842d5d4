// Query orchestrator - Owns the datasource connection and both query modes
use crate::application::clock::Clock;
use crate::application::datasource::{Datasource, DatasourceGateway, QueryResponse};
use crate::application::events::{EVENT_CHANNEL_CAPACITY, ExploreEvent};
use crate::application::normalizer::Normalizer;
use crate::application::request_builder::RequestBuilder;
use crate::domain::outcome::{ConnectionStatus, ExploreSnapshot, QueryOutcome};
use crate::domain::query::{QueryMode, QueryRequest};
use crate::domain::series::Series;
use crate::domain::table::TableModel;
use crate::error::{DatasourceError, ExploreError, ExploreResult};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

enum DatasourceConnection {
    Uninitialized,
    Ready(Arc<dyn Datasource>),
    Failed(String),
}

impl DatasourceConnection {
    fn status(&self) -> ConnectionStatus {
        match self {
            DatasourceConnection::Uninitialized => ConnectionStatus::Uninitialized,
            DatasourceConnection::Ready(_) => ConnectionStatus::Ready,
            DatasourceConnection::Failed(reason) => ConnectionStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    fn ready(&self) -> Option<Arc<dyn Datasource>> {
        match self {
            DatasourceConnection::Ready(datasource) => Some(datasource.clone()),
            _ => None,
        }
    }
}

struct ModeSlot<T> {
    outcome: QueryOutcome<T>,
    last_request: Option<QueryRequest>,
    latest_token: u64,
}

impl<T> Default for ModeSlot<T> {
    fn default() -> Self {
        Self {
            outcome: QueryOutcome::Idle,
            last_request: None,
            latest_token: 0,
        }
    }
}

impl<T> ModeSlot<T> {
    /// Issue a new token and drop any previous payload
    fn begin(&mut self, request: QueryRequest) -> u64 {
        self.latest_token += 1;
        self.outcome = QueryOutcome::Loading;
        self.last_request = Some(request);
        self.latest_token
    }
}

struct ExploreState {
    connection: DatasourceConnection,
    query_text: String,
    graph: ModeSlot<Vec<Series>>,
    table: ModeSlot<TableModel>,
}

impl ExploreState {
    fn begin(&mut self, mode: QueryMode, request: QueryRequest) -> u64 {
        match mode {
            QueryMode::Graph => self.graph.begin(request),
            QueryMode::Table => self.table.begin(request),
        }
    }

    fn latest_token(&self, mode: QueryMode) -> u64 {
        match mode {
            QueryMode::Graph => self.graph.latest_token,
            QueryMode::Table => self.table.latest_token,
        }
    }

    fn fail(&mut self, mode: QueryMode, error: DatasourceError) {
        match mode {
            QueryMode::Graph => self.graph.outcome = QueryOutcome::Failure { error },
            QueryMode::Table => self.table.outcome = QueryOutcome::Failure { error },
        }
    }
}

/// Tuning for request windows and staleness detection
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    pub request_builder: RequestBuilder,
    pub normalizer: Normalizer,
}

/// Handles for the two query flows started by one submit. Dropping it does
/// not cancel anything.
pub struct Submission {
    graph: JoinHandle<()>,
    table: JoinHandle<()>,
    pub graph_token: u64,
    pub table_token: u64,
}

impl Submission {
    /// Wait until both modes have settled
    pub async fn wait(self) {
        let (graph, table) = futures::future::join(self.graph, self.table).await;
        for (mode, result) in [(QueryMode::Graph, graph), (QueryMode::Table, table)] {
            if let Err(e) = result {
                tracing::error!("{} query task did not complete: {}", mode, e);
            }
        }
    }
}

struct Inner {
    gateway: Arc<dyn DatasourceGateway>,
    clock: Arc<dyn Clock>,
    options: OrchestratorOptions,
    state: RwLock<ExploreState>,
    // Serializes connection attempts so the connection is written once
    connecting: Mutex<()>,
    events: broadcast::Sender<ExploreEvent>,
}

#[derive(Clone)]
pub struct QueryOrchestrator {
    inner: Arc<Inner>,
}

impl QueryOrchestrator {
    pub fn new(gateway: Arc<dyn DatasourceGateway>, clock: Arc<dyn Clock>, options: OrchestratorOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = ExploreState {
            connection: DatasourceConnection::Uninitialized,
            query_text: String::new(),
            graph: ModeSlot::default(),
            table: ModeSlot::default(),
        };

        Self {
            inner: Arc::new(Inner {
                gateway,
                clock,
                options,
                state: RwLock::new(state),
                connecting: Mutex::new(()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExploreEvent> {
        self.inner.events.subscribe()
    }

    /// Acquire the datasource and run its connectivity check. Not retried
    /// automatically; calling again after a failure retries once.
    pub async fn initialize_datasource(&self) -> ExploreResult<()> {
        let _connecting = self.inner.connecting.lock().await;
        if self.inner.state.read().await.connection.ready().is_some() {
            return Ok(());
        }

        let connected = self.connect().await;
        let mut state = self.inner.state.write().await;
        match connected {
            Ok(datasource) => {
                state.connection = DatasourceConnection::Ready(datasource);
                tracing::info!("Datasource ready");
                self.inner.publish(ExploreEvent::DatasourceReady);
                Ok(())
            }
            Err(reason) => {
                state.connection = DatasourceConnection::Failed(reason.clone());
                tracing::warn!("Error connecting to datasource: {}", reason);
                self.inner.publish(ExploreEvent::DatasourceFailed { reason: reason.clone() });
                Err(ExploreError::DatasourceUnavailable(reason))
            }
        }
    }

    async fn connect(&self) -> Result<Arc<dyn Datasource>, String> {
        let datasource = self.inner.gateway.get().await.map_err(|e| e.to_string())?;
        let check = datasource.test_datasource().await.map_err(|e| e.to_string())?;

        if check.is_success() {
            Ok(datasource)
        } else {
            Err(check
                .message
                .unwrap_or_else(|| format!("connectivity check reported status {}", check.status)))
        }
    }

    pub async fn set_query_text(&self, text: impl Into<String>) {
        self.inner.state.write().await.query_text = text.into();
    }

    /// Start both query modes for the stored text.
    ///
    /// Returns `Ok(None)` without touching state when the text is empty. Both
    /// modes are in `Loading` by the time this returns.
    pub async fn submit(&self) -> ExploreResult<Option<Submission>> {
        let mut state = self.inner.state.write().await;
        if state.query_text.is_empty() {
            return Ok(None);
        }
        let datasource = state.connection.ready().ok_or(ExploreError::NotReady)?;

        let started_at = self.inner.clock.now_ms();
        let query_text = state.query_text.clone();
        let mut dispatch = |mode: QueryMode| {
            let request =
                self.inner
                    .options
                    .request_builder
                    .build(&query_text, mode, started_at, datasource.interval());
            let token = state.begin(mode, request.clone());
            self.inner.publish(ExploreEvent::QueryStarted { mode, token });

            let inner = self.inner.clone();
            let datasource = datasource.clone();
            let handle = tokio::spawn(async move {
                inner.run_query(datasource, mode, token, started_at, request).await;
            });
            (handle, token)
        };

        let (graph, graph_token) = dispatch(QueryMode::Graph);
        let (table, table_token) = dispatch(QueryMode::Table);

        Ok(Some(Submission {
            graph,
            table,
            graph_token,
            table_token,
        }))
    }

    pub async fn metadata_request(&self, path: &str) -> ExploreResult<serde_json::Value> {
        let datasource = self
            .inner
            .state
            .read()
            .await
            .connection
            .ready()
            .ok_or(ExploreError::NotReady)?;

        Ok(datasource.metadata_request(path).await?)
    }

    pub async fn snapshot(&self) -> ExploreSnapshot {
        let state = self.inner.state.read().await;
        ExploreSnapshot {
            connection: state.connection.status(),
            query_text: state.query_text.clone(),
            graph: state.graph.outcome.clone(),
            table: state.table.outcome.clone(),
        }
    }

    pub async fn last_request(&self, mode: QueryMode) -> Option<QueryRequest> {
        let state = self.inner.state.read().await;
        match mode {
            QueryMode::Graph => state.graph.last_request.clone(),
            QueryMode::Table => state.table.last_request.clone(),
        }
    }
}

impl Inner {
    fn publish(&self, event: ExploreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn run_query(
        &self,
        datasource: Arc<dyn Datasource>,
        mode: QueryMode,
        token: u64,
        started_at: i64,
        request: QueryRequest,
    ) {
        tracing::debug!("Dispatching {} query {} for {:?}", mode, token, request.query_text());
        let result = datasource.query(&request).await;

        let mut state = self.state.write().await;
        let latest = state.latest_token(mode);
        if latest != token {
            let discarded = ExploreError::StaleOverwrite { mode, token, latest };
            tracing::debug!("{}", discarded);
            return;
        }

        match result {
            Ok(response) => {
                let latency_ms = self.clock.now_ms() - started_at;
                self.complete(&mut state, mode, response, latency_ms, request);
                tracing::info!("{} query {} succeeded in {}ms", mode, token, latency_ms);
                self.publish(ExploreEvent::QuerySucceeded { mode, token, latency_ms });
            }
            Err(source) => {
                state.fail(mode, source.clone());
                tracing::error!("{}", ExploreError::QueryFailed { mode, source: source.clone() });
                self.publish(ExploreEvent::QueryFailed { mode, token, error: source });
            }
        }
    }

    fn complete(
        &self,
        state: &mut ExploreState,
        mode: QueryMode,
        response: QueryResponse,
        latency_ms: i64,
        request: QueryRequest,
    ) {
        let normalizer = &self.options.normalizer;
        match mode {
            QueryMode::Graph => {
                let data = normalizer.to_series_list(&response.data, &request);
                state.graph.outcome = QueryOutcome::Success { data, latency_ms, request };
            }
            QueryMode::Table => {
                let data = normalizer.to_table_model(&response.data);
                state.table.outcome = QueryOutcome::Success { data, latency_ms, request };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::datasource::DatasourceTestResult;
    use crate::domain::outcome::GraphDisplay;
    use crate::domain::query::QueryFormat;
    use crate::domain::series::{RawSeriesPoint, RawTargetResult};
    use crate::domain::table::Column;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use tokio::sync::{mpsc, oneshot};

    const NOW: i64 = 1_700_000_000_000;

    type QueryReply = Result<QueryResponse, DatasourceError>;
    type Responder = Arc<dyn Fn(&QueryRequest) -> QueryReply + Send + Sync>;

    struct PendingQuery {
        request: QueryRequest,
        reply: oneshot::Sender<QueryReply>,
    }

    impl PendingQuery {
        fn mode(&self) -> QueryMode {
            self.request.mode().unwrap()
        }

        fn respond(self, reply: QueryReply) {
            self.reply.send(reply).ok();
        }
    }

    enum Behavior {
        Immediate(Responder),
        Gated(mpsc::UnboundedSender<PendingQuery>),
    }

    struct FakeDatasource {
        check: Result<DatasourceTestResult, DatasourceError>,
        behavior: Behavior,
    }

    #[async_trait]
    impl Datasource for FakeDatasource {
        fn interval(&self) -> Option<String> {
            Some("15s".to_string())
        }

        async fn test_datasource(&self) -> Result<DatasourceTestResult, DatasourceError> {
            self.check.clone()
        }

        async fn query(&self, request: &QueryRequest) -> QueryReply {
            match &self.behavior {
                Behavior::Immediate(responder) => responder(request),
                Behavior::Gated(pending) => {
                    let (reply, rx) = oneshot::channel();
                    pending
                        .send(PendingQuery { request: request.clone(), reply })
                        .map_err(|_| DatasourceError::Transport { message: "closed".into() })?;
                    rx.await
                        .map_err(|_| DatasourceError::Transport { message: "dropped".into() })?
                }
            }
        }

        async fn metadata_request(&self, path: &str) -> Result<serde_json::Value, DatasourceError> {
            Ok(json!({ "path": path }))
        }
    }

    struct FakeGateway {
        datasource: Result<Arc<FakeDatasource>, DatasourceError>,
        acquisitions: Arc<AtomicUsize>,
    }

    impl FakeGateway {
        fn new(datasource: Result<Arc<FakeDatasource>, DatasourceError>) -> Self {
            Self {
                datasource,
                acquisitions: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl DatasourceGateway for FakeGateway {
        async fn get(&self) -> Result<Arc<dyn Datasource>, DatasourceError> {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match &self.datasource {
                Ok(datasource) => Ok(datasource.clone() as Arc<dyn Datasource>),
                Err(e) => Err(e.clone()),
            }
        }
    }

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn advance(&self, ms: i64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn orchestrator(gateway: FakeGateway) -> (QueryOrchestrator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicI64::new(NOW)));
        let orchestrator = QueryOrchestrator::new(Arc::new(gateway), clock.clone(), OrchestratorOptions::default());
        (orchestrator, clock)
    }

    fn with_behavior(behavior: Behavior) -> FakeGateway {
        FakeGateway::new(Ok(Arc::new(FakeDatasource {
            check: Ok(DatasourceTestResult::success()),
            behavior,
        })))
    }

    fn immediate(responder: impl Fn(&QueryRequest) -> QueryReply + Send + Sync + 'static) -> FakeGateway {
        with_behavior(Behavior::Immediate(Arc::new(responder)))
    }

    fn gated() -> (FakeGateway, mpsc::UnboundedReceiver<PendingQuery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (with_behavior(Behavior::Gated(tx)), rx)
    }

    fn series_response(target: &str) -> QueryResponse {
        QueryResponse {
            data: vec![RawTargetResult::series(target, vec![RawSeriesPoint::new(1.0, NOW)])],
        }
    }

    fn table_response(marker: &str) -> QueryResponse {
        QueryResponse {
            data: vec![RawTargetResult::table(vec![Column::new("Value")], vec![vec![json!(marker)]])],
        }
    }

    fn respond_by_mode(request: &QueryRequest) -> QueryReply {
        match request.mode() {
            Some(QueryMode::Table) => Ok(table_response(request.query_text())),
            _ => Ok(series_response(request.query_text())),
        }
    }

    async fn next_pair(rx: &mut mpsc::UnboundedReceiver<PendingQuery>) -> (PendingQuery, PendingQuery) {
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match first.mode() {
            QueryMode::Graph => (first, second),
            QueryMode::Table => (second, first),
        }
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let (orchestrator, _) = orchestrator(immediate(respond_by_mode));
        let mut events = orchestrator.subscribe();

        assert_eq!(orchestrator.snapshot().await.connection, ConnectionStatus::Uninitialized);
        orchestrator.initialize_datasource().await.unwrap();

        assert_eq!(orchestrator.snapshot().await.connection, ConnectionStatus::Ready);
        assert_eq!(events.recv().await.unwrap(), ExploreEvent::DatasourceReady);
    }

    #[tokio::test]
    async fn test_overlapping_initialize_connects_once() {
        let gateway = immediate(respond_by_mode);
        let acquisitions = gateway.acquisitions.clone();
        let (orchestrator, _) = orchestrator(gateway);

        let (first, second) =
            futures::future::join(orchestrator.initialize_datasource(), orchestrator.initialize_datasource()).await;

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(acquisitions.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.snapshot().await.connection, ConnectionStatus::Ready);
    }

    #[tokio::test]
    async fn test_initialize_failed_check() {
        let gateway = FakeGateway::new(Ok(Arc::new(FakeDatasource {
            check: Ok(DatasourceTestResult::failure("HTTP Error Bad Gateway")),
            behavior: Behavior::Immediate(Arc::new(respond_by_mode)),
        })));
        let (orchestrator, _) = orchestrator(gateway);

        let err = orchestrator.initialize_datasource().await.unwrap_err();
        assert!(matches!(err, ExploreError::DatasourceUnavailable(ref reason) if reason == "HTTP Error Bad Gateway"));
        assert_eq!(
            orchestrator.snapshot().await.connection,
            ConnectionStatus::Failed { reason: "HTTP Error Bad Gateway".to_string() }
        );
    }

    #[tokio::test]
    async fn test_initialize_acquisition_error() {
        let gateway = FakeGateway::new(Err(DatasourceError::Transport {
            message: "connection refused".into(),
        }));
        let (orchestrator, _) = orchestrator(gateway);

        assert!(orchestrator.initialize_datasource().await.is_err());
        match orchestrator.snapshot().await.connection {
            ConnectionStatus::Failed { reason } => assert!(reason.contains("connection refused")),
            other => panic!("unexpected connection state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_requires_ready_datasource() {
        let (orchestrator, _) = orchestrator(immediate(respond_by_mode));
        orchestrator.set_query_text("up").await;

        assert!(matches!(orchestrator.submit().await, Err(ExploreError::NotReady)));
        assert!(matches!(orchestrator.metadata_request("/api/v1/labels").await, Err(ExploreError::NotReady)));
    }

    #[tokio::test]
    async fn test_empty_submit_is_noop() {
        let (orchestrator, _) = orchestrator(immediate(respond_by_mode));
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("").await;

        assert!(orchestrator.submit().await.unwrap().is_none());

        let snapshot = orchestrator.snapshot().await;
        assert!(snapshot.graph.is_idle());
        assert!(snapshot.table.is_idle());
        assert!(orchestrator.last_request(QueryMode::Graph).await.is_none());
    }

    #[tokio::test]
    async fn test_submit_runs_both_modes() {
        let (orchestrator, _) = orchestrator(immediate(respond_by_mode));
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        orchestrator.submit().await.unwrap().unwrap().wait().await;
        let snapshot = orchestrator.snapshot().await;

        let graph = snapshot.graph.data().unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph[0].alias, "up");

        let graph_request = snapshot.graph.request().unwrap();
        assert_eq!(graph_request.range.from, NOW - 10_800_000);
        assert_eq!(graph_request.range.to, NOW);
        assert_eq!(graph_request.format(), Some(QueryFormat::TimeSeries));
        assert_eq!(graph_request.interval.as_deref(), Some("15s"));

        let table_request = snapshot.table.request().unwrap();
        assert_eq!(table_request.format(), Some(QueryFormat::Table));
        assert!(table_request.instant());
        assert_eq!(snapshot.table.data().unwrap().rows, vec![vec![json!("up")]]);
    }

    #[tokio::test]
    async fn test_latency_measured_from_start() {
        let (gateway, mut rx) = gated();
        let (orchestrator, clock) = orchestrator(gateway);
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        let submission = orchestrator.submit().await.unwrap().unwrap();
        let (graph, table) = next_pair(&mut rx).await;

        clock.advance(250);
        graph.respond(Ok(series_response("up")));
        table.respond(Ok(table_response("up")));
        submission.wait().await;

        let snapshot = orchestrator.snapshot().await;
        assert_eq!(snapshot.graph.latency_ms(), Some(250));
        assert_eq!(snapshot.elapsed_ms(), Some(250));
    }

    #[tokio::test]
    async fn test_table_timeout_graph_success() {
        let (orchestrator, _) = orchestrator(immediate(|request| match request.mode() {
            Some(QueryMode::Table) => Err(DatasourceError::Timeout),
            _ => Ok(series_response("up")),
        }));
        let mut events = orchestrator.subscribe();
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        orchestrator.submit().await.unwrap().unwrap().wait().await;
        let snapshot = orchestrator.snapshot().await;

        assert!(matches!(snapshot.graph, QueryOutcome::Success { .. }));
        assert_eq!(snapshot.table, QueryOutcome::Failure { error: DatasourceError::Timeout });
        assert_eq!(snapshot.table.error().unwrap().code(), "timeout");
        assert!(snapshot.table_display().is_none());

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let ExploreEvent::QueryFailed { mode, error, .. } = event {
                assert_eq!(mode, QueryMode::Table);
                assert_eq!(error, DatasourceError::Timeout);
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_graph_failure_keeps_error_for_display() {
        let (orchestrator, _) = orchestrator(immediate(|_| Err(DatasourceError::rejected("parse error"))));
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up{").await;

        orchestrator.submit().await.unwrap().unwrap().wait().await;
        let snapshot = orchestrator.snapshot().await;

        assert_eq!(
            snapshot.graph_display(),
            Some(GraphDisplay::Error(&DatasourceError::rejected("parse error")))
        );
        assert!(snapshot.table_display().is_none());
    }

    #[tokio::test]
    async fn test_loading_clears_previous_result() {
        let (gateway, mut rx) = gated();
        let (orchestrator, _) = orchestrator(gateway);
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        let first = orchestrator.submit().await.unwrap().unwrap();
        let (graph, table) = next_pair(&mut rx).await;
        graph.respond(Ok(series_response("up")));
        table.respond(Ok(table_response("up")));
        first.wait().await;
        assert!(orchestrator.snapshot().await.graph.data().is_some());

        let _second = orchestrator.submit().await.unwrap().unwrap();
        let snapshot = orchestrator.snapshot().await;
        assert!(snapshot.graph.is_loading());
        assert!(snapshot.table.is_loading());
        assert!(snapshot.graph_display().is_none());
        assert!(snapshot.table_display().is_none());
    }

    #[tokio::test]
    async fn test_partial_completion() {
        let (gateway, mut rx) = gated();
        let (orchestrator, _) = orchestrator(gateway);
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        let _submission = orchestrator.submit().await.unwrap().unwrap();
        let (graph, _table) = next_pair(&mut rx).await;

        let mut events = orchestrator.subscribe();
        graph.respond(Ok(series_response("up")));
        while !matches!(events.recv().await.unwrap(), ExploreEvent::QuerySucceeded { .. }) {}

        let snapshot = orchestrator.snapshot().await;
        assert!(snapshot.graph.data().is_some());
        assert!(snapshot.table.is_loading());
        assert!(snapshot.is_loading());
    }

    #[tokio::test]
    async fn test_late_stale_result_discarded() {
        let (gateway, mut rx) = gated();
        let (orchestrator, _) = orchestrator(gateway);
        orchestrator.initialize_datasource().await.unwrap();

        orchestrator.set_query_text("first").await;
        let first = orchestrator.submit().await.unwrap().unwrap();
        let (graph1, table1) = next_pair(&mut rx).await;

        orchestrator.set_query_text("second").await;
        let second = orchestrator.submit().await.unwrap().unwrap();
        assert!(second.table_token > first.table_token);
        let (graph2, table2) = next_pair(&mut rx).await;

        graph2.respond(Ok(series_response("second")));
        table2.respond(Ok(table_response("second")));
        second.wait().await;

        // Superseded responses land after the fresh ones
        graph1.respond(Ok(series_response("first")));
        table1.respond(Ok(table_response("first")));
        first.wait().await;

        let snapshot = orchestrator.snapshot().await;
        assert_eq!(snapshot.table.data().unwrap().rows, vec![vec![json!("second")]]);
        assert_eq!(snapshot.graph.data().unwrap()[0].alias, "second");
        assert_eq!(snapshot.table.request().unwrap().query_text(), "second");
    }

    #[tokio::test]
    async fn test_late_stale_failure_discarded() {
        let (gateway, mut rx) = gated();
        let (orchestrator, _) = orchestrator(gateway);
        orchestrator.initialize_datasource().await.unwrap();
        orchestrator.set_query_text("up").await;

        let first = orchestrator.submit().await.unwrap().unwrap();
        let (graph1, table1) = next_pair(&mut rx).await;
        let second = orchestrator.submit().await.unwrap().unwrap();
        let (graph2, table2) = next_pair(&mut rx).await;

        graph2.respond(Ok(series_response("up")));
        table2.respond(Ok(table_response("up")));
        second.wait().await;

        graph1.respond(Err(DatasourceError::Timeout));
        table1.respond(Err(DatasourceError::Timeout));
        first.wait().await;

        let snapshot = orchestrator.snapshot().await;
        assert!(snapshot.graph.data().is_some());
        assert!(snapshot.table.data().is_some());
    }

    #[tokio::test]
    async fn test_metadata_passthrough() {
        let (orchestrator, _) = orchestrator(immediate(respond_by_mode));
        orchestrator.initialize_datasource().await.unwrap();

        let value = orchestrator.metadata_request("/api/v1/label/__name__/values").await.unwrap();
        assert_eq!(value, json!({ "path": "/api/v1/label/__name__/values" }));
    }
}
