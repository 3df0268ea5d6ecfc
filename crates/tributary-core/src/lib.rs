//! tributary-core: building blocks for the tributary catalog integration.
//!
//! - `matcher` - Table name to object key matching for lineage inference
//! - `cache` - File-backed TTL cache for catalog query results
//! - `storage` - Object listing over S3 and the local filesystem
//! - `metrics` - Prometheus metrics infrastructure
//! - `config` - Multi-file YAML loading and environment variable interpolation
//! - `types` - Common types like `AssetRecord`
//! - `error` - Common error types

pub mod cache;
pub mod config;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod storage;
pub mod tracing;
pub mod types;

// Re-export commonly used items
pub use cache::{CacheEntry, CacheStatus, QueryCache};
pub use config::{CacheConfig, ConfigArgs, ConfigPath, Mergeable, MetricsConfig};
pub use error::{CacheError, ConfigError, MetricsError, StorageError};
pub use matcher::{MatchStrategy, TableMatcher, TableSide, match_keys};
pub use metrics::{MetricsController, init_global as init_metrics};
pub use storage::{ObjectSummary, StorageProvider};
pub use tracing::init_tracing;
pub use types::{AssetRecord, TABLE_TYPE};
