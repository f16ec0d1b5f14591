//! Application layer
//!
//! Orchestrates the infrastructure collaborators into an ingestion run.

pub mod notifier;
pub mod ingestion_service;

pub use notifier::{LogNotifier, Notifier};
pub use ingestion_service::{IngestionError, IngestionReport, IngestionService};
