//! End-to-end runs of an integration against an in-memory catalog and a
//! storage tree on the local filesystem.
//!
//! Run with: cargo test -p tributary --test pipeline_test

mod common;

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use common::{FakeCatalog, POSTGRES_QN, SNOWFLAKE_QN, write_tree};
use tributary::catalog::Provisioned;
use tributary::config::Config;
use tributary::error::IntegrationError;
use tributary::pipeline::{
    IntegrationReport, LineageDirection, RunContext, RunOptions, run_integration, run_integrations,
};

const FILES: &[&str] = &[
    "exports/users.csv",
    "exports/accounts.parquet",
    "raw/customer_data.csv",
];

struct Fixture {
    storage: TempDir,
    cache: TempDir,
    catalog: Arc<FakeCatalog>,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        Self::with_upstream("postgres-prod")
    }

    fn with_upstream(upstream: &str) -> Self {
        let storage = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        write_tree(storage.path(), FILES);

        let config = Config::parse(&format!(
            r#"
cache:
  dir: '{cache}'
integrations:
  challenge:
    connection:
      name: aws-s3-connection
    bucket:
      name: atlan-tech-challenge
      arn: arn:aws:s3:::atlan-tech-challenge
      url: '{storage}'
      prefix: 2025/
    upstream:
      connection: {upstream}
      connector: postgres
    downstream:
      connection: snowflake-prod
      connector: snowflake
"#,
            cache = cache.path().display(),
            storage = storage.path().display(),
        ))
        .unwrap();

        Self {
            storage,
            cache,
            catalog: Arc::new(FakeCatalog::with_peers()),
            config,
        }
    }

    fn context(&self) -> RunContext {
        RunContext::new(self.catalog.clone(), &self.config)
    }

    async fn run(&self, options: RunOptions) -> Result<IntegrationReport, IntegrationError> {
        let (key, integration) = self.config.integrations().next().unwrap();
        run_integration(&self.context(), key, integration, &options).await
    }
}

fn outcomes(report: &IntegrationReport) -> Vec<&'static str> {
    report.objects.iter().map(|o| o.result.outcome()).collect()
}

#[tokio::test]
async fn test_first_run_registers_everything() {
    let fixture = Fixture::new();
    let report = fixture.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.integration, "challenge");
    assert_eq!(report.connection_qualified_name, "default/s3/1700000000");
    assert_eq!(
        report.bucket_qualified_name,
        "default/s3/1700000000/arn:aws:s3:::atlan-tech-challenge"
    );
    assert_eq!(outcomes(&report), vec!["created"; 3]);
    assert!(report.is_clean(), "{report}");

    let state = fixture.catalog.state();
    assert_eq!(state.connections_created, 1);
    assert_eq!(state.buckets_created, 1);

    let users = &state.objects["default/s3/1700000000/2025/exports/users.csv"];
    assert_eq!(users.object_key(), "2025/exports/users.csv");
    assert_eq!(users.content_type.as_deref(), Some("text/csv"));
    assert_eq!(users.size, Some("contents of exports/users.csv".len() as u64));
    assert!(
        users
            .description
            .as_deref()
            .is_some_and(|d| d.contains("personal_identifier")),
        "{:?}",
        users.description
    );
}

#[tokio::test]
async fn test_lineage_links_both_directions() {
    let fixture = Fixture::new();
    let report = fixture.run(RunOptions::default()).await.unwrap();

    // The column under users is not a table.
    assert_eq!(report.upstream_tables, 3);
    assert_eq!(report.downstream_tables, 2);

    let mut links: Vec<(LineageDirection, &str, &str)> = report
        .lineage
        .iter()
        .map(|l| (l.direction, l.table.as_str(), l.object_key.as_str()))
        .collect();
    links.sort();
    assert_eq!(
        links,
        vec![
            (LineageDirection::Upstream, "accounts", "2025/exports/accounts.parquet"),
            (LineageDirection::Upstream, "users", "2025/exports/users.csv"),
            (LineageDirection::Downstream, "DIM_CUSTOMER", "2025/raw/customer_data.csv"),
        ]
    );

    let state = fixture.catalog.state();
    let upstream = &state.processes
        [&format!("{POSTGRES_QN}/upstream_users_2025_exports_users.csv")];
    assert_eq!(
        upstream.inputs[0].qualified_name,
        format!("{POSTGRES_QN}/app/public/users")
    );
    assert_eq!(
        upstream.outputs[0].qualified_name,
        "default/s3/1700000000/2025/exports/users.csv"
    );

    let downstream = state
        .processes
        .values()
        .find(|p| p.connection_qualified_name == SNOWFLAKE_QN)
        .unwrap();
    assert_eq!(downstream.inputs[0].name, "2025/raw/customer_data.csv");
    assert_eq!(downstream.outputs[0].name, "DIM_CUSTOMER");
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_uses_cache() {
    let fixture = Fixture::new();
    fixture.run(RunOptions::default()).await.unwrap();
    assert_eq!(fixture.catalog.state().search_calls, 2);
    assert!(fixture.cache.path().join("postgres-prod_assets_cache.json").exists());
    assert!(fixture.cache.path().join("snowflake-prod_assets_cache.json").exists());

    let report = fixture.run(RunOptions::default()).await.unwrap();

    assert_eq!(outcomes(&report), vec!["found"; 3]);
    assert_eq!(report.count_lineage("found"), 3);
    assert_eq!(report.upstream_tables, 3);

    let state = fixture.catalog.state();
    assert_eq!(state.connections_created, 1);
    assert_eq!(state.buckets_created, 1);
    assert_eq!(state.processes.len(), 3);
    assert_eq!(state.search_calls, 2, "peer assets should come from cache");
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let fixture = Fixture::new();
    fixture.run(RunOptions::default()).await.unwrap();
    fixture
        .run(RunOptions {
            force_refresh: true,
        })
        .await
        .unwrap();

    assert_eq!(fixture.catalog.state().search_calls, 4);
}

#[tokio::test]
async fn test_unreachable_catalog_aborts() {
    let fixture = Fixture::new();
    fixture.catalog.state().unreachable = true;

    let err = fixture.run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, IntegrationError::Connectivity { .. }), "{err}");
    assert!(fixture.catalog.state().objects.is_empty());
}

#[tokio::test]
async fn test_rejected_object_is_recorded() {
    let fixture = Fixture::new();
    fixture
        .catalog
        .state()
        .rejected_objects
        .insert("exports/users.csv".to_string());

    let report = fixture.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.count_objects("failed"), 1);
    assert_eq!(report.count_objects("created"), 2);
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(
        report.objects.iter().find(|o| o.key == "exports/users.csv").unwrap().result,
        Provisioned::Failed { .. }
    ));

    // Only registered objects take part in lineage.
    assert_eq!(report.lineage.len(), 2);
    assert!(report.lineage.iter().all(|l| l.table != "users"));
}

#[tokio::test]
async fn test_deleted_file_is_reported_as_orphan() {
    let fixture = Fixture::new();
    fixture.run(RunOptions::default()).await.unwrap();

    std::fs::remove_file(fixture.storage.path().join("exports/accounts.parquet")).unwrap();
    let report = fixture.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.objects.len(), 2);
    assert_eq!(
        report.orphaned_objects,
        vec!["default/s3/1700000000/2025/exports/accounts.parquet".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_peer_connection_yields_no_lineage() {
    let fixture = Fixture::with_upstream("mysql-legacy");
    let report = fixture.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.upstream_tables, 0);
    assert_eq!(report.downstream_tables, 2);
    assert!(
        report
            .lineage
            .iter()
            .all(|l| l.direction == LineageDirection::Downstream)
    );
    assert!(report.is_clean());
    assert!(!cache_exists(fixture.cache.path(), "mysql-legacy_assets_cache.json"));
}

#[tokio::test]
async fn test_run_integrations_counts_failures() {
    let fixture = Fixture::new();
    fixture.catalog.state().unreachable = true;

    let selected = fixture.config.select(None).unwrap();
    let err = run_integrations(&fixture.context(), &selected, &RunOptions::default())
        .await
        .unwrap_err();

    assert!(
        matches!(err, IntegrationError::IntegrationsFailed { failed: 1, total: 1 }),
        "{err}"
    );
}

fn cache_exists(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}
