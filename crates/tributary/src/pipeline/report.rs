//! Run reports.

use std::fmt;

use crate::catalog::{AssetRef, Provisioned};

/// Direction of a lineage process relative to the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineageDirection {
    /// Relational table exported into an object.
    Upstream,
    /// Object loaded into a warehouse table.
    Downstream,
}

impl LineageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageDirection::Upstream => "upstream",
            LineageDirection::Downstream => "downstream",
        }
    }
}

impl fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of registering one storage object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOutcome {
    /// Key as listed from storage.
    pub key: String,
    pub result: Provisioned<AssetRef>,
}

/// Outcome of one lineage process request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageOutcome {
    pub direction: LineageDirection,
    pub table: String,
    pub object_key: String,
    pub result: Provisioned<AssetRef>,
}

/// Summary of one integration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub integration: String,
    pub connection_qualified_name: String,
    pub bucket_qualified_name: String,
    pub objects: Vec<ObjectOutcome>,
    /// Catalog objects in the bucket with no counterpart in storage.
    pub orphaned_objects: Vec<String>,
    pub upstream_tables: usize,
    pub downstream_tables: usize,
    pub lineage: Vec<LineageOutcome>,
    /// Per-step failures that did not abort the run (e.g. a peer search).
    pub step_failures: Vec<String>,
}

impl IntegrationReport {
    /// Objects successfully created, updated, or found.
    pub fn registered_objects(&self) -> impl Iterator<Item = &AssetRef> {
        self.objects.iter().filter_map(|outcome| outcome.result.asset())
    }

    pub fn count_objects(&self, outcome: &str) -> usize {
        self.objects
            .iter()
            .filter(|o| o.result.outcome() == outcome)
            .count()
    }

    pub fn count_lineage(&self, outcome: &str) -> usize {
        self.lineage
            .iter()
            .filter(|l| l.result.outcome() == outcome)
            .count()
    }

    /// Failed objects, failed lineage requests, and failed steps.
    pub fn failure_count(&self) -> usize {
        self.count_objects("failed") + self.count_lineage("failed") + self.step_failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

impl fmt::Display for IntegrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Integration: {}", self.integration)?;
        writeln!(f, "  Connection: {}", self.connection_qualified_name)?;
        writeln!(f, "  Bucket:     {}", self.bucket_qualified_name)?;
        writeln!(
            f,
            "  Objects:    {} created, {} updated, {} unchanged, {} failed",
            self.count_objects("created"),
            self.count_objects("updated"),
            self.count_objects("found"),
            self.count_objects("failed"),
        )?;
        if !self.orphaned_objects.is_empty() {
            writeln!(f, "  Orphaned:   {}", self.orphaned_objects.len())?;
        }
        writeln!(
            f,
            "  Tables:     {} upstream, {} downstream",
            self.upstream_tables, self.downstream_tables
        )?;
        writeln!(
            f,
            "  Lineage:    {} created, {} updated, {} unchanged, {} failed",
            self.count_lineage("created"),
            self.count_lineage("updated"),
            self.count_lineage("found"),
            self.count_lineage("failed"),
        )?;
        for failure in &self.step_failures {
            writeln!(f, "  Failed step: {failure}")?;
        }
        Ok(())
    }
}
