//! Configuration building blocks shared across tributary crates.

mod loader;
mod path;
mod vars;

pub use loader::{Mergeable, load_from_paths};
pub use path::{ConfigArgs, ConfigPath, is_yaml_file};
pub use vars::{interpolate, interpolate_with};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default freshness window for cached catalog queries.
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Query cache configuration.
///
/// Fields are optional so that a later config file can set a value back to
/// its default explicitly; unset fields leave earlier values alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cache name (default: current directory).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Hours after which a cached result is stale (default: 24).
    #[serde(default)]
    pub ttl_hours: Option<u64>,
}

impl CacheConfig {
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours.unwrap_or(DEFAULT_CACHE_TTL_HOURS)
    }

    pub fn ttl(&self) -> Duration {
        hours_to_duration(self.ttl_hours())
    }

    /// Merge values from another CacheConfig (last-write-wins for set fields).
    pub fn merge_from(&mut self, other: Self) {
        if other.dir.is_some() {
            self.dir = other.dir;
        }
        if other.ttl_hours.is_some() {
            self.ttl_hours = other.ttl_hours;
        }
    }
}

/// Hours as a duration, saturating instead of overflowing.
pub fn hours_to_duration(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Metrics configuration.
///
/// Runs are short-lived, so instead of serving an endpoint the process can
/// drop a Prometheus textfile for a node-exporter style collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Where to write the Prometheus text snapshot after a run.
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

impl MetricsConfig {
    pub fn merge_from(&mut self, other: Self) {
        if other.textfile.is_some() {
            self.textfile = other.textfile;
        }
    }
}
