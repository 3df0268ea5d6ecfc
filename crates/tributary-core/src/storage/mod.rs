//! Object storage abstraction.
//!
//! Tributary only needs to enumerate what is in a bucket, so the provider
//! exposes listing over S3 and the local filesystem.

mod local;
mod s3;
mod url_parser;

pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{ObjectStoreSnafu, StorageError};
use crate::metrics::events::{ObjectsListed, RequestStatus, StorageRequest};

/// Option key understood by object_store's S3 builder to disable request signing.
pub const SKIP_SIGNATURE_OPTION: &str = "aws_skip_signature";

/// One object found while listing a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Key relative to the provider's configured key prefix.
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Storage provider that abstracts over the supported backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options),
            BackendConfig::Local(config) => Self::construct_local(config),
        }
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// List every object below the configured key, optionally narrowed by `prefix`.
    ///
    /// Keys are returned relative to the configured key and sorted, so the
    /// result is stable across backends.
    pub async fn list_objects(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let base_parts = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let full_prefix: Option<Path> = match (self.config.key(), prefix) {
            (Some(key), Some(prefix)) => Some(key.parts().chain(Path::from(prefix).parts()).collect()),
            (Some(key), None) => Some(key.clone()),
            (None, Some(prefix)) => Some(Path::from(prefix)),
            (None, None) => None,
        };

        let start = Instant::now();
        let result: Result<Vec<_>, _> = self
            .object_store
            .list(full_prefix.as_ref())
            .try_collect()
            .await;

        emit!(StorageRequest {
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        let mut objects: Vec<ObjectSummary> = result
            .context(ObjectStoreSnafu)?
            .into_iter()
            .map(|meta| {
                let relative: Path = meta.location.parts().skip(base_parts).collect();
                ObjectSummary {
                    key: relative.to_string(),
                    size: meta.size as u64,
                    last_modified: meta.last_modified,
                }
            })
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        debug!(
            url = %self.canonical_url,
            prefix = prefix.unwrap_or_default(),
            count = objects.len(),
            "Listed objects"
        );
        emit!(ObjectsListed {
            count: objects.len() as u64,
        });

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, key: &str, contents: &[u8]) {
        let path = root.join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_list_objects_returns_sorted_relative_keys() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "exports/users/users_export.parquet", b"u");
        write(temp_dir.path(), "exports/accounts/accounts_export.parquet", b"acc");
        write(temp_dir.path(), "readme.txt", b"hello");

        let storage =
            StorageProvider::for_url_with_options(temp_dir.path().to_str().unwrap(), HashMap::new())
                .unwrap();

        let objects = storage.list_objects(None).await.unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "exports/accounts/accounts_export.parquet",
                "exports/users/users_export.parquet",
                "readme.txt",
            ]
        );
        assert_eq!(objects[0].size, 3);
    }

    #[tokio::test]
    async fn test_list_objects_with_prefix() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "exports/users/users_export.parquet", b"u");
        write(temp_dir.path(), "other/skip.csv", b"s");

        let storage =
            StorageProvider::for_url_with_options(temp_dir.path().to_str().unwrap(), HashMap::new())
                .unwrap();

        let objects = storage.list_objects(Some("exports/")).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "exports/users/users_export.parquet");
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            StorageProvider::for_url_with_options(temp_dir.path().to_str().unwrap(), HashMap::new())
                .unwrap();

        let objects = storage.list_objects(Some("nothing-here")).await.unwrap();
        assert!(objects.is_empty());
    }

    #[test]
    fn test_invalid_s3_option_rejected() {
        let mut options = HashMap::new();
        options.insert("not_a_real_option".to_string(), "1".to_string());
        let result = StorageProvider::for_url_with_options("s3://bucket", options);
        assert!(result.is_err());
    }
}
