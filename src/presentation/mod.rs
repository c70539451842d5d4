// Presentation layer - HTTP shell over the orchestrator
pub mod app_state;
pub mod handlers;
