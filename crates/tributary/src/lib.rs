//! Tributary: registers object storage in a metadata catalog and links it to
//! the database tables exported into it and the warehouse tables loaded from it.
//!
//! This crate handles:
//! - Ensuring the storage connection and bucket exist in the catalog
//! - Registering every object found in storage, with a PII classification
//! - Inferring lineage by matching table names against object keys

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;

// Re-export commonly used items
pub use catalog::{AtlanClient, CatalogClient, CatalogClientRef};
pub use cli::Cli;
pub use config::Config;
pub use error::{CatalogError, IntegrationError};
pub use pipeline::{IntegrationReport, RunContext, RunOptions, run_integration, run_integrations};

// Re-export from tributary-core
pub use tributary_core::{QueryCache, init_tracing};
