//! Common error types shared by the tributary crates.
//!
//! This module defines error types for storage, configuration, cache and
//! metrics operations.

use std::path::PathBuf;

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// No integrations were configured.
    #[snafu(display("No integrations configured"))]
    NoIntegrations,

    /// A required field is empty for a specific integration.
    #[snafu(display("Integration '{integration}' has empty {field}"))]
    EmptyField {
        integration: String,
        field: &'static str,
    },

    /// A cache file name is not a plain file name.
    #[snafu(display(
        "Integration '{integration}' has invalid {field} '{name}': must be a file name without path separators"
    ))]
    InvalidCacheFile {
        integration: String,
        field: &'static str,
        name: String,
    },

    /// The catalog API token is missing.
    #[snafu(display("catalog.api_token is not set (export ATLAN_API_TOKEN or set it in config)"))]
    MissingApiToken,

    /// A requested integration does not exist.
    #[snafu(display("Unknown integration '{integration}'"))]
    UnknownIntegration { integration: String },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },

    /// Duplicate component keys found across config files.
    #[snafu(display("Duplicate integration keys: {}", keys.join(", ")))]
    DuplicateComponents { keys: Vec<String> },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: PathBuf },

    /// Failed to read configuration directory.
    #[snafu(display("Failed to read directory {}", path.display()))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Multiple configuration errors occurred.
    #[snafu(display("Multiple config errors:\n{}", errors.join("\n")))]
    MultipleErrors { errors: Vec<String> },
}

// ============ Cache Errors ============

/// Errors that can occur while writing or clearing a query cache file.
///
/// Reads never surface these: an unreadable cache is simply absent.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CacheError {
    /// Cache name is empty or contains a path separator.
    #[snafu(display("Invalid cache name '{name}'"))]
    InvalidName { name: String },

    /// Failed to create the cache directory.
    #[snafu(display("Failed to create cache directory {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize cache contents.
    #[snafu(display("Failed to serialize cache '{name}': {source}"))]
    Serialize {
        name: String,
        source: serde_json::Error,
    },

    /// Failed to write the cache file.
    #[snafu(display("Failed to write cache file {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove the cache file.
    #[snafu(display("Failed to remove cache file {}: {source}", path.display()))]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization and export.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },

    /// Metrics recorder already initialized (double-init attempted).
    #[snafu(display("Metrics recorder already initialized"))]
    AlreadyInitialized,

    /// Metrics recorder not initialized (controller accessed before init).
    #[snafu(display("Metrics recorder not initialized"))]
    NotInitialized,

    /// Failed to write the metrics textfile.
    #[snafu(display("Failed to write metrics textfile {}: {source}", path.display()))]
    Textfile {
        path: PathBuf,
        source: std::io::Error,
    },
}
