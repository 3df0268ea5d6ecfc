//! The integration workflow.
//!
//! One run registers a bucket and its objects in the catalog and links
//! them to upstream and downstream tables:
//!
//! 1. Check connectivity
//! 2. Ensure the storage connection and the bucket
//! 3. List storage and upsert every object
//! 4. Fetch peer tables through the query cache
//! 5. Create a lineage process per matched table and object
//!
//! Steps run strictly in sequence. Per-object and per-process failures are
//! recorded in the report; failures of steps 1-3 abort the integration.

mod assets;
mod lineage;
mod report;

pub use report::{IntegrationReport, LineageDirection, LineageOutcome, ObjectOutcome};

use snafu::prelude::*;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::catalog::{
    AssetRef, BucketSpec, CONNECTION_TYPE, CatalogClient, CatalogClientRef, ConnectionSpec,
    ObjectSpec, Provisioned,
};
use crate::classify;
use crate::config::{Config, IntegrationConfig, IntegrationKey, PeerConfig};
use crate::error::{
    BucketSnafu, ConnectionSnafu, ConnectivitySnafu, IntegrationError, IntegrationsFailedSnafu,
    RejectedSnafu,
};
use tributary_core::cache::QueryCache;
use tributary_core::emit;
use tributary_core::metrics::events::{
    AssetProvisioned, IntegrationCompleted, LineageProcessed, RequestStatus,
};
use tributary_core::storage::{ObjectSummary, StorageProvider};
use tributary_core::types::AssetRecord;

/// Shared collaborators for integration runs.
#[derive(Clone)]
pub struct RunContext {
    pub catalog: CatalogClientRef,
    pub cache: QueryCache,
    /// TTL applied when an integration does not override it.
    pub cache_ttl: Duration,
}

impl RunContext {
    pub fn new(catalog: CatalogClientRef, config: &Config) -> Self {
        Self {
            catalog,
            cache: QueryCache::from_config(&config.cache),
            cache_ttl: config.cache.ttl(),
        }
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ignore fresh caches and query the catalog.
    pub force_refresh: bool,
}

/// Content type guessed from the key's extension.
pub fn content_type_for(key: &str) -> Option<&'static str> {
    let extension = key.rsplit_once('.')?.1.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "csv" => "text/csv",
        "json" => "application/json",
        "ndjson" | "jsonl" => "application/x-ndjson",
        "parquet" => "application/vnd.apache.parquet",
        "avro" => "application/avro",
        "gz" => "application/gzip",
        "zst" => "application/zstd",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(content_type)
}

/// Run one integration end to end.
pub async fn run_integration(
    ctx: &RunContext,
    key: &IntegrationKey,
    config: &IntegrationConfig,
    options: &RunOptions,
) -> Result<IntegrationReport, IntegrationError> {
    let start = Instant::now();

    let integration = Integration {
        catalog: ctx.catalog.as_ref(),
        cache: &ctx.cache,
        cache_ttl: config.cache_ttl(ctx.cache_ttl),
        key,
        config,
        options,
    };
    let result = integration.run().await;

    emit!(IntegrationCompleted {
        integration: key.to_string(),
        status: RequestStatus::from_result(&result),
        duration: start.elapsed(),
    });

    result
}

/// Run integrations one after another.
///
/// A failed integration does not stop the next one; the call fails after
/// all have run if any of them failed.
pub async fn run_integrations(
    ctx: &RunContext,
    integrations: &[(&IntegrationKey, &IntegrationConfig)],
    options: &RunOptions,
) -> Result<Vec<IntegrationReport>, IntegrationError> {
    let mut reports = Vec::with_capacity(integrations.len());
    let mut failed = 0usize;

    for (key, config) in integrations {
        match run_integration(ctx, key, config, options).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(integration = %key, error = %e, "Integration failed");
                failed += 1;
            }
        }
    }

    ensure!(
        failed == 0,
        IntegrationsFailedSnafu {
            failed,
            total: integrations.len(),
        }
    );
    Ok(reports)
}

struct Integration<'a> {
    catalog: &'a dyn CatalogClient,
    cache: &'a QueryCache,
    cache_ttl: Duration,
    key: &'a IntegrationKey,
    config: &'a IntegrationConfig,
    options: &'a RunOptions,
}

impl Integration<'_> {
    async fn run(&self) -> Result<IntegrationReport, IntegrationError> {
        info!(integration = %self.key, bucket = %self.config.bucket.arn, "Starting integration");

        self.catalog
            .ping()
            .await
            .inspect_err(|e| {
                if e.is_unauthorized() {
                    error!(integration = %self.key, "Catalog rejected the API token");
                }
            })
            .context(ConnectivitySnafu)?;

        let mut report = IntegrationReport {
            integration: self.key.to_string(),
            ..Default::default()
        };

        report.connection_qualified_name = self.ensure_connection().await?;
        report.bucket_qualified_name = self
            .ensure_bucket(&report.connection_qualified_name)
            .await?;

        let storage_objects = self.list_storage().await?;
        self.register_objects(&mut report, &storage_objects).await;

        let objects: Vec<AssetRef> = report.registered_objects().cloned().collect();

        if let Some(upstream) = &self.config.upstream {
            let tables = self.peer_tables(&mut report, upstream).await;
            report.upstream_tables = tables.len();
            self.link(&mut report, LineageDirection::Upstream, &tables, &objects)
                .await;
        }

        if let Some(downstream) = &self.config.downstream {
            let tables = self.peer_tables(&mut report, downstream).await;
            report.downstream_tables = tables.len();
            self.link(&mut report, LineageDirection::Downstream, &tables, &objects)
                .await;
        }

        info!(
            integration = %self.key,
            objects = report.objects.len(),
            lineage = report.lineage.len(),
            failures = report.failure_count(),
            "Integration finished"
        );
        Ok(report)
    }

    fn record(&self, kind: &'static str, outcome: &Provisioned<AssetRef>) {
        emit!(AssetProvisioned {
            kind,
            outcome: outcome.outcome(),
            integration: self.key.to_string(),
        });
    }

    /// Provisioning outcome of a step the run cannot continue without.
    fn required(
        &self,
        kind: &'static str,
        provisioned: Provisioned<AssetRef>,
    ) -> Result<String, IntegrationError> {
        self.record(kind, &provisioned);
        let outcome = provisioned.outcome();
        match provisioned {
            Provisioned::Failed { reason } => RejectedSnafu { kind, reason }.fail(),
            Provisioned::Created(asset) | Provisioned::Found(asset) | Provisioned::Updated(asset) => {
                info!(
                    integration = %self.key,
                    qualified_name = %asset.qualified_name,
                    outcome,
                    "Ensured {kind}"
                );
                Ok(asset.qualified_name)
            }
        }
    }

    async fn ensure_connection(&self) -> Result<String, IntegrationError> {
        let connection = &self.config.connection;
        let found = self
            .catalog
            .find_connection(&connection.name, &connection.connector)
            .await
            .context(ConnectionSnafu {
                name: &connection.name,
            })?;

        let provisioned = match found {
            Some(qualified_name) => Provisioned::Found(AssetRef::new(
                CONNECTION_TYPE,
                qualified_name,
                &connection.name,
            )),
            None => {
                let spec = ConnectionSpec {
                    name: connection.name.clone(),
                    connector: connection.connector.clone(),
                    admin_users: connection.admin_users.clone(),
                };
                self.catalog
                    .create_connection(&spec)
                    .await
                    .context(ConnectionSnafu {
                        name: &connection.name,
                    })?
            }
        };

        self.required("connection", provisioned)
    }

    async fn ensure_bucket(&self, connection_qn: &str) -> Result<String, IntegrationError> {
        let bucket = &self.config.bucket;
        let found = self
            .catalog
            .find_bucket_by_arn(&bucket.arn)
            .await
            .context(BucketSnafu { arn: &bucket.arn })?;

        let provisioned = match found {
            Some(asset) => Provisioned::Found(asset),
            None => {
                let spec = BucketSpec {
                    name: bucket.name.clone(),
                    arn: bucket.arn.clone(),
                    connection_qualified_name: connection_qn.to_string(),
                };
                self.catalog
                    .create_bucket(&spec)
                    .await
                    .context(BucketSnafu { arn: &bucket.arn })?
            }
        };

        self.required("bucket", provisioned)
    }

    async fn list_storage(&self) -> Result<Vec<ObjectSummary>, IntegrationError> {
        let bucket = &self.config.bucket;
        let storage = StorageProvider::for_url_with_options(&bucket.url, bucket.storage_options())?;

        let objects: Vec<ObjectSummary> = storage
            .list_objects(None)
            .await?
            .into_iter()
            .filter(|object| !object.key.is_empty() && !object.key.ends_with('/'))
            .collect();

        info!(
            integration = %self.key,
            url = %storage.canonical_url(),
            objects = objects.len(),
            "Listed storage"
        );
        Ok(objects)
    }

    fn object_spec(&self, report: &IntegrationReport, object: &ObjectSummary) -> ObjectSpec {
        let bucket = &self.config.bucket;
        let description = self
            .config
            .classify
            .then(|| classify::describe(&classify::classify(&object.key)));

        ObjectSpec {
            name: object.key.clone(),
            prefix: bucket.prefix.clone(),
            bucket_name: bucket.name.clone(),
            bucket_qualified_name: report.bucket_qualified_name.clone(),
            connection_qualified_name: report.connection_qualified_name.clone(),
            size: Some(object.size),
            content_type: content_type_for(&object.key).map(str::to_string),
            description,
        }
    }

    async fn register_objects(&self, report: &mut IntegrationReport, objects: &[ObjectSummary]) {
        let existing = match self.catalog.list_objects(&report.bucket_qualified_name).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(integration = %self.key, error = %e, "Could not list catalog objects");
                report.step_failures.push(format!("list catalog objects: {e}"));
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(objects.len());
        for object in objects {
            let spec = self.object_spec(report, object);
            seen.insert(spec.qualified_name());

            let result = Provisioned::from_result(self.catalog.upsert_object(&spec).await);
            self.record("object", &result);
            match &result {
                Provisioned::Failed { reason } => {
                    warn!(integration = %self.key, key = %object.key, %reason, "Object not registered")
                }
                other => {
                    info!(integration = %self.key, key = %object.key, outcome = other.outcome(), "Object registered")
                }
            }

            report.objects.push(ObjectOutcome {
                key: object.key.clone(),
                result,
            });
        }

        report.orphaned_objects = existing
            .into_iter()
            .filter(|asset| !seen.contains(&asset.qualified_name))
            .map(|asset| asset.qualified_name)
            .collect();

        if !report.orphaned_objects.is_empty() {
            warn!(
                integration = %self.key,
                count = report.orphaned_objects.len(),
                "Catalog holds objects no longer in storage"
            );
        }
    }

    async fn peer_tables(
        &self,
        report: &mut IntegrationReport,
        peer: &PeerConfig,
    ) -> Vec<AssetRecord> {
        match assets::fetch_peer_assets(
            self.catalog,
            self.cache,
            self.cache_ttl,
            peer,
            self.options.force_refresh,
        )
        .await
        {
            Ok(all) => assets::filter_type(all, &peer.type_filter),
            Err(e) => {
                warn!(integration = %self.key, connection = %peer.connection, error = %e, "Asset search failed");
                report
                    .step_failures
                    .push(format!("search {}: {e}", peer.connection));
                Vec::new()
            }
        }
    }

    async fn link(
        &self,
        report: &mut IntegrationReport,
        direction: LineageDirection,
        tables: &[AssetRecord],
        objects: &[AssetRef],
    ) {
        let links = lineage::plan_links(direction, tables, objects, self.config.matching);
        info!(
            integration = %self.key,
            %direction,
            tables = tables.len(),
            links = links.len(),
            "Creating lineage"
        );

        for link in &links {
            let spec = lineage::process_spec(direction, link);
            let result = Provisioned::from_result(self.catalog.create_process(&spec).await);

            emit!(LineageProcessed {
                direction: direction.as_str(),
                outcome: result.outcome(),
                integration: self.key.to_string(),
            });
            if let Provisioned::Failed { reason } = &result {
                warn!(integration = %self.key, process = %spec.name, %reason, "Lineage not created");
            } else {
                info!(
                    integration = %self.key,
                    input = %spec.inputs[0].qualified_name,
                    output = %spec.outputs[0].qualified_name,
                    outcome = result.outcome(),
                    "Lineage linked"
                );
            }

            report.lineage.push(LineageOutcome {
                direction,
                table: link.table.name.clone(),
                object_key: link.object.name.clone(),
                result,
            });
        }
    }
}
