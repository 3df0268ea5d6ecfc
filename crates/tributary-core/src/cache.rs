//! File-backed TTL cache for catalog query results.
//!
//! Each cache name maps to one JSON file in the cache directory:
//!
//! ```json
//! {
//!   "timestamp": "2026-10-18T09:30:00.123456+00:00",
//!   "data": [["default/postgres/1700000000/db/public/accounts", "accounts", "Table"]]
//! }
//! ```
//!
//! Staleness is judged lazily on read; nothing is ever evicted in the
//! background. A missing, unreadable, or malformed file is treated as
//! "no cache" so callers fall back to querying the catalog. Writes replace
//! the whole file via temp file + rename. Concurrent writers are not
//! coordinated: the last rename wins.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{
    CacheError, CreateDirSnafu, InvalidNameSnafu, RemoveSnafu, SerializeSnafu, WriteSnafu,
};
use crate::types::AssetRecord;

/// On-disk layout. The timestamp stays a string so that an unparsable value
/// invalidates the entry instead of failing the whole read.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    timestamp: String,
    data: Vec<AssetRecord>,
}

/// A cached query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub data: Vec<AssetRecord>,
}

impl CacheEntry {
    /// Whether `now < timestamp + ttl`.
    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        self.timestamp
            .checked_add_signed(ttl)
            .is_none_or(|expiry| now < expiry)
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp
    }
}

/// Observable state of one named cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// No file for this name.
    Absent,
    /// A file exists but cannot be used.
    Invalid { reason: String },
    /// Within the TTL.
    Valid { age: TimeDelta, items: usize },
    /// Older than the TTL; superseded by the next save.
    Stale { age: TimeDelta, items: usize },
}

impl CacheStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CacheStatus::Valid { .. })
    }
}

enum ReadOutcome {
    Missing,
    Corrupt(String),
    Entry(CacheEntry),
}

/// Whether `name` can be used as a cache name: a plain file name with no
/// path separators.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Query cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
}

impl QueryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `name`. Names are plain file names, never paths.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, CacheError> {
        ensure!(is_valid_name(name), InvalidNameSnafu { name });
        Ok(self.dir.join(name))
    }

    /// Persist `data` under `name`, stamped with the current time.
    ///
    /// An error means the cache was not updated; it never affects `data`.
    pub fn save(&self, data: &[AssetRecord], name: &str) -> Result<(), CacheError> {
        self.save_at(data, name, Utc::now())
    }

    /// Persist `data` under `name` with an explicit timestamp.
    pub fn save_at(
        &self,
        data: &[AssetRecord],
        name: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let path = self.path_for(name)?;

        let file = CacheFile {
            timestamp: timestamp.to_rfc3339(),
            data: data.to_vec(),
        };
        let contents = serde_json::to_vec_pretty(&file).context(SerializeSnafu { name })?;

        std::fs::create_dir_all(&self.dir).context(CreateDirSnafu { path: &self.dir })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, contents).context(WriteSnafu { path: &tmp })?;
        if let Err(source) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(source).context(WriteSnafu { path: &path });
        }

        info!(cache = name, items = data.len(), path = %path.display(), "Saved cache");
        Ok(())
    }

    /// Read the entry for `name`; `None` when missing or unusable.
    pub fn load(&self, name: &str) -> Option<CacheEntry> {
        match self.read(name) {
            ReadOutcome::Entry(entry) => {
                debug!(cache = name, items = entry.data.len(), "Loaded cache");
                Some(entry)
            }
            ReadOutcome::Missing => {
                debug!(cache = name, "No cache file");
                None
            }
            ReadOutcome::Corrupt(reason) => {
                warn!(cache = name, %reason, "Ignoring unusable cache file");
                None
            }
        }
    }

    /// True iff the entry loads and is younger than `ttl`.
    pub fn is_valid(&self, name: &str, ttl: Duration) -> bool {
        self.is_valid_at(name, ttl, Utc::now())
    }

    pub fn is_valid_at(&self, name: &str, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.load(name)
            .is_some_and(|entry| entry.is_fresh_at(ttl, now))
    }

    /// Load the entry only if it is still fresh.
    pub fn load_fresh(&self, name: &str, ttl: Duration) -> Option<CacheEntry> {
        let now = Utc::now();
        self.load(name).filter(|entry| entry.is_fresh_at(ttl, now))
    }

    pub fn status(&self, name: &str, ttl: Duration) -> CacheStatus {
        self.status_at(name, ttl, Utc::now())
    }

    pub fn status_at(&self, name: &str, ttl: Duration, now: DateTime<Utc>) -> CacheStatus {
        match self.read(name) {
            ReadOutcome::Missing => CacheStatus::Absent,
            ReadOutcome::Corrupt(reason) => CacheStatus::Invalid { reason },
            ReadOutcome::Entry(entry) => {
                let age = entry.age_at(now);
                let items = entry.data.len();
                if entry.is_fresh_at(ttl, now) {
                    CacheStatus::Valid { age, items }
                } else {
                    CacheStatus::Stale { age, items }
                }
            }
        }
    }

    /// Remove the file for `name`. Returns whether a file was removed.
    pub fn clear(&self, name: &str) -> Result<bool, CacheError> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(cache = name, path = %path.display(), "Cleared cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(source).context(RemoveSnafu { path }),
        }
    }

    fn read(&self, name: &str) -> ReadOutcome {
        let path = match self.path_for(name) {
            Ok(path) => path,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        let contents = match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ReadOutcome::Missing,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        let file: CacheFile = match serde_json::from_slice(&contents) {
            Ok(file) => file,
            Err(e) => return ReadOutcome::Corrupt(e.to_string()),
        };

        match parse_timestamp(&file.timestamp) {
            Some(timestamp) => ReadOutcome::Entry(CacheEntry {
                timestamp,
                data: file.data,
            }),
            None => ReadOutcome::Corrupt(format!("unparsable timestamp '{}'", file.timestamp)),
        }
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Values without an offset are read as local time, which is how naive
/// timestamps were produced by earlier cache writers.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
