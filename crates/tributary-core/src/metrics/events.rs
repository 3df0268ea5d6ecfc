//! Internal events for tributary metrics emission.
//!
//! Each event struct represents a measurable occurrence during an
//! integration run. Events implement the `InternalEvent` trait which emits
//! the corresponding Prometheus metric.
//!
//! ## Integration Labels
//!
//! Events raised inside an integration carry an `integration` label so a
//! single textfile can describe several configured integrations.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Outcome of a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }

    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }
}

/// Event emitted for every object-store listing call.
pub struct StorageRequest {
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(status = self.status.as_str(), duration_ms = self.duration.as_millis(), "Storage request");
        counter!("tributary_storage_requests_total", "status" => self.status.as_str()).increment(1);
        histogram!("tributary_storage_request_duration_seconds")
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when objects are found in storage.
pub struct ObjectsListed {
    pub count: u64,
}

impl InternalEvent for ObjectsListed {
    fn emit(self) {
        trace!(count = self.count, "Objects listed");
        counter!("tributary_storage_objects_listed_total").increment(self.count);
    }
}

/// Event emitted for every catalog API call.
pub struct CatalogRequest {
    /// Short operation name, e.g. `"search"` or `"upsert"`.
    pub operation: &'static str,
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for CatalogRequest {
    fn emit(self) {
        trace!(
            operation = self.operation,
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Catalog request"
        );
        counter!(
            "tributary_catalog_requests_total",
            "operation" => self.operation,
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!("tributary_catalog_request_duration_seconds", "operation" => self.operation)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a catalog asset has been ensured.
pub struct AssetProvisioned {
    /// Asset type, e.g. `"connection"`, `"bucket"`, `"object"`.
    pub kind: &'static str,
    /// One of `"created"`, `"found"`, `"updated"`, `"failed"`.
    pub outcome: &'static str,
    pub integration: String,
}

impl InternalEvent for AssetProvisioned {
    fn emit(self) {
        trace!(kind = self.kind, outcome = self.outcome, integration = %self.integration, "Asset provisioned");
        counter!(
            "tributary_assets_provisioned_total",
            "kind" => self.kind,
            "outcome" => self.outcome,
            "integration" => self.integration
        )
        .increment(1);
    }
}

/// Event emitted for each lineage process request.
pub struct LineageProcessed {
    /// `"upstream"` (database to object) or `"downstream"` (object to warehouse).
    pub direction: &'static str,
    pub outcome: &'static str,
    pub integration: String,
}

impl InternalEvent for LineageProcessed {
    fn emit(self) {
        trace!(direction = self.direction, outcome = self.outcome, integration = %self.integration, "Lineage processed");
        counter!(
            "tributary_lineage_processes_total",
            "direction" => self.direction,
            "outcome" => self.outcome,
            "integration" => self.integration
        )
        .increment(1);
    }
}

/// Result of consulting a query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookupResult {
    Hit,
    Miss,
    Stale,
    Bypassed,
}

impl CacheLookupResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLookupResult::Hit => "hit",
            CacheLookupResult::Miss => "miss",
            CacheLookupResult::Stale => "stale",
            CacheLookupResult::Bypassed => "bypassed",
        }
    }
}

/// Event emitted when a cached query is looked up.
pub struct CacheLookup {
    pub cache: String,
    pub result: CacheLookupResult,
}

impl InternalEvent for CacheLookup {
    fn emit(self) {
        trace!(cache = %self.cache, result = self.result.as_str(), "Cache lookup");
        counter!(
            "tributary_cache_lookups_total",
            "cache" => self.cache,
            "result" => self.result.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when an integration run finishes.
pub struct IntegrationCompleted {
    pub integration: String,
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for IntegrationCompleted {
    fn emit(self) {
        trace!(
            integration = %self.integration,
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Integration completed"
        );
        counter!(
            "tributary_integration_runs_total",
            "integration" => self.integration.clone(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!("tributary_integration_duration_seconds", "integration" => self.integration)
            .record(self.duration.as_secs_f64());
    }
}
