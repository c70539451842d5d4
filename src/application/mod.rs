// Application layer - Use cases and the collaborator contracts they consume
pub mod clock;
pub mod datasource;
pub mod events;
pub mod normalizer;
pub mod orchestrator;
pub mod request_builder;
