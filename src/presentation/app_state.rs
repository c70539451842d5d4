// Application state for HTTP handlers
use crate::application::orchestrator::QueryOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: QueryOrchestrator,
}
