//! Metadata catalog access.
//!
//! Everything the integration asks of the catalog goes through the
//! [`CatalogClient`] trait. [`AtlanClient`] talks to the HTTP API; tests
//! substitute an in-memory implementation.

mod http;
pub mod model;

pub use http::AtlanClient;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::CatalogError;
use tributary_core::types::AssetRecord;

pub const CONNECTION_TYPE: &str = "Connection";
pub const BUCKET_TYPE: &str = "S3Bucket";
pub const OBJECT_TYPE: &str = "S3Object";
pub const PROCESS_TYPE: &str = "Process";

/// A reference-counted catalog client.
pub type CatalogClientRef = Arc<dyn CatalogClient>;

/// A catalog asset identified by type and qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub type_name: String,
    pub qualified_name: String,
    pub name: String,
}

impl AssetRef {
    pub fn new(
        type_name: impl Into<String>,
        qualified_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            qualified_name: qualified_name.into(),
            name: name.into(),
        }
    }
}

impl From<&AssetRecord> for AssetRef {
    fn from(record: &AssetRecord) -> Self {
        Self::new(&record.type_name, &record.qualified_name, &record.name)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.qualified_name)
    }
}

/// Result of ensuring an asset exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned<T> {
    /// The catalog created the asset.
    Created(T),
    /// The asset already existed and was left as is.
    Found(T),
    /// The asset already existed and was updated.
    Updated(T),
    /// The request failed; the rest of the run continues without it.
    Failed { reason: String },
}

impl<T> Provisioned<T> {
    /// Collapse a fallible request into a recorded outcome.
    pub fn from_result<E: fmt::Display>(result: Result<Provisioned<T>, E>) -> Self {
        result.unwrap_or_else(|e| Provisioned::Failed {
            reason: e.to_string(),
        })
    }

    pub fn asset(&self) -> Option<&T> {
        match self {
            Provisioned::Created(asset)
            | Provisioned::Found(asset)
            | Provisioned::Updated(asset) => Some(asset),
            Provisioned::Failed { .. } => None,
        }
    }

    pub fn into_asset(self) -> Option<T> {
        match self {
            Provisioned::Created(asset)
            | Provisioned::Found(asset)
            | Provisioned::Updated(asset) => Some(asset),
            Provisioned::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Provisioned::Failed { .. })
    }

    /// Metric and log label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Provisioned::Created(_) => "created",
            Provisioned::Found(_) => "found",
            Provisioned::Updated(_) => "updated",
            Provisioned::Failed { .. } => "failed",
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Provisioned<U> {
        match self {
            Provisioned::Created(asset) => Provisioned::Created(f(asset)),
            Provisioned::Found(asset) => Provisioned::Found(f(asset)),
            Provisioned::Updated(asset) => Provisioned::Updated(f(asset)),
            Provisioned::Failed { reason } => Provisioned::Failed { reason },
        }
    }
}

/// Connector segment of a connection qualified name (`default/<connector>/<epoch>`).
pub fn connector_of(connection_qualified_name: &str) -> &str {
    connection_qualified_name
        .split('/')
        .nth(1)
        .unwrap_or_default()
}

/// Connection qualified name that owns `qualified_name`.
///
/// `default/postgres/1700000000/db/public/users` belongs to
/// `default/postgres/1700000000`.
pub fn connection_of(qualified_name: &str) -> &str {
    match qualified_name.match_indices('/').nth(2) {
        Some((idx, _)) => &qualified_name[..idx],
        None => qualified_name,
    }
}

/// A storage connection to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub name: String,
    pub connector: String,
    pub admin_users: Vec<String>,
}

impl ConnectionSpec {
    /// Qualified name for a connection created at `epoch_secs`.
    pub fn qualified_name_at(&self, epoch_secs: i64) -> String {
        format!("default/{}/{}", self.connector, epoch_secs)
    }
}

/// A bucket to register under a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub name: String,
    pub arn: String,
    pub connection_qualified_name: String,
}

impl BucketSpec {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.connection_qualified_name, self.arn)
    }
}

/// An object to create or update inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    /// Object key relative to the bucket listing.
    pub name: String,
    /// Catalog-side path prefix, prepended verbatim.
    pub prefix: String,
    pub bucket_name: String,
    pub bucket_qualified_name: String,
    pub connection_qualified_name: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub description: Option<String>,
}

impl ObjectSpec {
    /// Full object key as registered in the catalog.
    pub fn object_key(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.connection_qualified_name, self.object_key())
    }

    pub fn asset_ref(&self) -> AssetRef {
        AssetRef::new(OBJECT_TYPE, self.qualified_name(), self.object_key())
    }
}

/// A lineage process linking inputs to outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    /// Stable identifier; re-running with the same id updates the process.
    pub process_id: String,
    pub connection_qualified_name: String,
    pub description: Option<String>,
    pub inputs: Vec<AssetRef>,
    pub outputs: Vec<AssetRef>,
}

impl ProcessSpec {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.connection_qualified_name, self.process_id)
    }

    pub fn asset_ref(&self) -> AssetRef {
        AssetRef::new(PROCESS_TYPE, self.qualified_name(), &self.name)
    }
}

/// Remote operations the integration needs from the catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Cheap search; returns the approximate number of assets.
    async fn ping(&self) -> Result<u64, CatalogError>;

    /// Qualified name of an existing connection.
    async fn find_connection(
        &self,
        name: &str,
        connector: &str,
    ) -> Result<Option<String>, CatalogError>;

    async fn create_connection(
        &self,
        spec: &ConnectionSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError>;

    async fn find_bucket_by_arn(&self, arn: &str) -> Result<Option<AssetRef>, CatalogError>;

    async fn create_bucket(&self, spec: &BucketSpec)
    -> Result<Provisioned<AssetRef>, CatalogError>;

    /// Every object registered under the bucket.
    async fn list_objects(&self, bucket_qualified_name: &str)
    -> Result<Vec<AssetRef>, CatalogError>;

    async fn upsert_object(&self, spec: &ObjectSpec)
    -> Result<Provisioned<AssetRef>, CatalogError>;

    /// Every asset whose qualified name starts with `prefix/`, across all pages.
    async fn search_prefix(&self, prefix: &str) -> Result<Vec<AssetRecord>, CatalogError>;

    async fn create_process(
        &self,
        spec: &ProcessSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError>;
}
