// Explore query core - orchestration and result normalization for ad-hoc queries
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::orchestrator::{OrchestratorOptions, QueryOrchestrator, Submission};
pub use error::{DatasourceError, ExploreError, ExploreResult};
