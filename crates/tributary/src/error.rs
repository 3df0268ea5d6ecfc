//! Error types for the tributary catalog integration.

use snafu::prelude::*;

// Re-export common errors
pub use tributary_core::error::{CacheError, ConfigError, MetricsError, StorageError};

/// Errors returned by a catalog client.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogError {
    /// Failed to build the HTTP client.
    #[snafu(display("Failed to build catalog HTTP client: {source}"))]
    ClientBuild { source: reqwest::Error },

    /// API token cannot be used as a header value.
    #[snafu(display("Catalog API token is not a valid header value"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[snafu(display("Catalog {operation} request failed: {source}"))]
    Http {
        operation: &'static str,
        source: reqwest::Error,
    },

    /// The catalog answered with a non-success status.
    #[snafu(display("Catalog {operation} returned HTTP {status}: {body}"))]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[snafu(display("Failed to decode catalog {operation} response: {source}"))]
    Decode {
        operation: &'static str,
        source: reqwest::Error,
    },
}

impl CatalogError {
    /// Whether the catalog rejected our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CatalogError::Status { status: 401 | 403, .. })
    }
}

/// Top-level errors for one integration run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IntegrationError {
    /// No `--config` or `--config-dir` given.
    #[snafu(display("No config files or directories specified"))]
    NoConfigPaths,

    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Catalog could not be reached.
    #[snafu(display("Catalog connectivity check failed: {source}"))]
    Connectivity { source: CatalogError },

    /// Storage connection could not be found or created.
    #[snafu(display("Failed to ensure connection '{name}': {source}"))]
    Connection { name: String, source: CatalogError },

    /// Bucket could not be found or created.
    #[snafu(display("Failed to ensure bucket '{arn}': {source}"))]
    Bucket { arn: String, source: CatalogError },

    /// The catalog answered but did not provision a required asset.
    #[snafu(display("Catalog rejected {kind}: {reason}"))]
    Rejected { kind: &'static str, reason: String },

    /// Other catalog error.
    #[snafu(display("Catalog error: {source}"))]
    Catalog { source: CatalogError },

    /// Cache error.
    #[snafu(display("Cache error: {source}"))]
    Cache { source: CacheError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },

    /// One or more integrations failed.
    #[snafu(display("{failed} of {total} integration(s) failed"))]
    IntegrationsFailed { failed: usize, total: usize },
}

impl From<ConfigError> for IntegrationError {
    fn from(source: ConfigError) -> Self {
        IntegrationError::Config { source }
    }
}

impl From<StorageError> for IntegrationError {
    fn from(source: StorageError) -> Self {
        IntegrationError::Storage { source }
    }
}

impl From<CatalogError> for IntegrationError {
    fn from(source: CatalogError) -> Self {
        IntegrationError::Catalog { source }
    }
}

impl From<CacheError> for IntegrationError {
    fn from(source: CacheError) -> Self {
        IntegrationError::Cache { source }
    }
}

impl From<MetricsError> for IntegrationError {
    fn from(source: MetricsError) -> Self {
        IntegrationError::Metrics { source }
    }
}
