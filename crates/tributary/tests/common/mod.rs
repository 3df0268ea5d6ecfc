//! Shared fixtures: an in-memory catalog and a storage tree on disk.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use tributary::catalog::{
    AssetRef, BUCKET_TYPE, BucketSpec, CONNECTION_TYPE, CatalogClient, ConnectionSpec, ObjectSpec,
    ProcessSpec, Provisioned,
};
use tributary::error::CatalogError;
use tributary_core::types::AssetRecord;

pub const POSTGRES_QN: &str = "default/postgres/1600000001";
pub const SNOWFLAKE_QN: &str = "default/snowflake/1600000002";

#[derive(Default)]
pub struct CatalogState {
    /// (name, connector, qualified name)
    pub connections: Vec<(String, String, String)>,
    /// ARN to bucket asset.
    pub buckets: BTreeMap<String, AssetRef>,
    pub objects: BTreeMap<String, ObjectSpec>,
    pub processes: BTreeMap<String, ProcessSpec>,
    /// Assets returned by prefix searches.
    pub assets: Vec<AssetRecord>,
    pub search_calls: usize,
    pub connections_created: usize,
    pub buckets_created: usize,
    pub unreachable: bool,
    /// Object names whose upsert fails.
    pub rejected_objects: HashSet<String>,
}

/// In-memory catalog implementing the same find/create/upsert contract as
/// the HTTP client.
pub struct FakeCatalog {
    state: Mutex<CatalogState>,
    next_epoch: AtomicI64,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState::default()),
            next_epoch: AtomicI64::new(1700000000),
        }
    }

    /// A catalog that already holds a postgres and a snowflake connection
    /// with a few tables each.
    pub fn with_peers() -> Self {
        let catalog = Self::new();
        {
            let mut state = catalog.state();
            state.connections.push((
                "postgres-prod".into(),
                "postgres".into(),
                POSTGRES_QN.into(),
            ));
            state.connections.push((
                "snowflake-prod".into(),
                "snowflake".into(),
                SNOWFLAKE_QN.into(),
            ));
            state.assets = vec![
                AssetRecord::new(format!("{POSTGRES_QN}/app/public/users"), "users", "Table"),
                AssetRecord::new(format!("{POSTGRES_QN}/app/public/accounts"), "accounts", "Table"),
                AssetRecord::new(format!("{POSTGRES_QN}/app/public/orders"), "orders", "Table"),
                AssetRecord::new(
                    format!("{POSTGRES_QN}/app/public/users/email"),
                    "email",
                    "Column",
                ),
                AssetRecord::new(
                    format!("{SNOWFLAKE_QN}/ANALYTICS/CORE/DIM_CUSTOMER"),
                    "DIM_CUSTOMER",
                    "Table",
                ),
                AssetRecord::new(
                    format!("{SNOWFLAKE_QN}/ANALYTICS/CORE/FACT_SHIPMENTS"),
                    "FACT_SHIPMENTS",
                    "Table",
                ),
            ];
        }
        catalog
    }

    pub fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap()
    }

    fn unavailable(&self, operation: &'static str) -> Result<(), CatalogError> {
        if self.state().unreachable {
            return Err(CatalogError::Status {
                operation,
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

fn upsert<T: Clone + PartialEq>(
    map: &mut BTreeMap<String, T>,
    qualified_name: String,
    value: &T,
    asset: AssetRef,
) -> Provisioned<AssetRef> {
    match map.insert(qualified_name, value.clone()) {
        None => Provisioned::Created(asset),
        Some(previous) if previous == *value => Provisioned::Found(asset),
        Some(_) => Provisioned::Updated(asset),
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn ping(&self) -> Result<u64, CatalogError> {
        self.unavailable("ping")?;
        Ok(self.state().assets.len() as u64)
    }

    async fn find_connection(
        &self,
        name: &str,
        connector: &str,
    ) -> Result<Option<String>, CatalogError> {
        self.unavailable("find connection")?;
        Ok(self
            .state()
            .connections
            .iter()
            .find(|(n, c, _)| n == name && c == connector)
            .map(|(_, _, qn)| qn.clone()))
    }

    async fn create_connection(
        &self,
        spec: &ConnectionSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let qualified_name = spec.qualified_name_at(self.next_epoch.fetch_add(1, Ordering::SeqCst));
        let mut state = self.state();
        state.connections_created += 1;
        state.connections.push((
            spec.name.clone(),
            spec.connector.clone(),
            qualified_name.clone(),
        ));
        Ok(Provisioned::Created(AssetRef::new(
            CONNECTION_TYPE,
            qualified_name,
            &spec.name,
        )))
    }

    async fn find_bucket_by_arn(&self, arn: &str) -> Result<Option<AssetRef>, CatalogError> {
        Ok(self.state().buckets.get(arn).cloned())
    }

    async fn create_bucket(
        &self,
        spec: &BucketSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let asset = AssetRef::new(BUCKET_TYPE, spec.qualified_name(), &spec.name);
        let mut state = self.state();
        state.buckets_created += 1;
        state.buckets.insert(spec.arn.clone(), asset.clone());
        Ok(Provisioned::Created(asset))
    }

    async fn list_objects(
        &self,
        bucket_qualified_name: &str,
    ) -> Result<Vec<AssetRef>, CatalogError> {
        Ok(self
            .state()
            .objects
            .values()
            .filter(|spec| spec.bucket_qualified_name == bucket_qualified_name)
            .map(ObjectSpec::asset_ref)
            .collect())
    }

    async fn upsert_object(
        &self,
        spec: &ObjectSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let mut state = self.state();
        if state.rejected_objects.contains(&spec.name) {
            return Err(CatalogError::Status {
                operation: "upsert object",
                status: 400,
                body: format!("rejected {}", spec.name),
            });
        }
        Ok(upsert(
            &mut state.objects,
            spec.qualified_name(),
            spec,
            spec.asset_ref(),
        ))
    }

    async fn search_prefix(&self, prefix: &str) -> Result<Vec<AssetRecord>, CatalogError> {
        self.unavailable("search")?;
        let mut state = self.state();
        state.search_calls += 1;
        let prefix = format!("{prefix}/");
        Ok(state
            .assets
            .iter()
            .filter(|asset| asset.qualified_name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn create_process(
        &self,
        spec: &ProcessSpec,
    ) -> Result<Provisioned<AssetRef>, CatalogError> {
        let mut state = self.state();
        Ok(upsert(
            &mut state.processes,
            spec.qualified_name(),
            spec,
            spec.asset_ref(),
        ))
    }
}

/// Create `files` (relative paths) with some content under `root`.
pub fn write_tree(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("contents of {file}")).unwrap();
    }
}
