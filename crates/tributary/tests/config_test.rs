//! Loading configuration from several files and directories.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use tributary::config::{Config, ConfigPath};
use tributary::error::ConfigError;
use tributary_core::matcher::MatchStrategy;

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn integration(name: &str, bucket: &str) -> String {
    format!(
        r#"
integrations:
  {name}:
    connection:
      name: aws-s3-connection
    bucket:
      name: {bucket}
      arn: arn:aws:s3:::{bucket}
      url: s3://{bucket}
"#
    )
}

#[test]
fn test_files_and_directories_merge_in_order() {
    let root = TempDir::new().unwrap();
    let conf_d = root.path().join("conf.d");
    std::fs::create_dir(&conf_d).unwrap();

    write(
        root.path(),
        "tributary.yaml",
        r#"
catalog:
  base_url: https://tenant.example.com
cache:
  ttl_hours: 6
"#,
    );
    write(&conf_d, "20-exports.yaml", &integration("exports", "exports-bucket"));
    write(&conf_d, "10-challenge.yml", &integration("challenge", "atlan-tech-challenge"));
    write(&conf_d, "notes.txt", "not yaml, ignored");

    let config = Config::from_paths(&[
        ConfigPath::file(root.path().join("tributary.yaml")),
        ConfigPath::dir(&conf_d),
    ])
    .unwrap();

    assert_eq!(config.catalog.base_url, "https://tenant.example.com");
    assert_eq!(config.cache.ttl(), Duration::from_secs(6 * 3600));

    // Directory entries load in file name order.
    let keys: Vec<String> = config.integrations().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, vec!["challenge", "exports"]);
}

#[test]
fn test_duplicate_integration_across_files() {
    let root = TempDir::new().unwrap();
    write(root.path(), "a.yaml", &integration("challenge", "bucket-a"));
    write(root.path(), "b.yaml", &integration("challenge", "bucket-b"));

    let err = Config::from_paths(&[
        ConfigPath::file(root.path().join("a.yaml")),
        ConfigPath::file(root.path().join("b.yaml")),
    ])
    .unwrap_err();

    match err {
        ConfigError::MultipleErrors { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("challenge"), "{errors:?}");
            assert!(errors[0].contains("b.yaml"), "{errors:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_env_defaults_and_missing_variables() {
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        "defaults.yaml",
        &format!(
            "catalog:\n  base_url: ${{TRIBUTARY_TEST_UNSET_BASE_URL:-https://fallback.example.com}}\n{}",
            integration("challenge", "atlan-tech-challenge")
        ),
    );
    write(
        root.path(),
        "missing.yaml",
        "catalog:\n  api_token: ${TRIBUTARY_TEST_UNSET_TOKEN}\n",
    );

    let config =
        Config::from_paths(&[ConfigPath::file(root.path().join("defaults.yaml"))]).unwrap();
    assert_eq!(config.catalog.base_url, "https://fallback.example.com");

    let err = Config::from_paths(&[ConfigPath::file(root.path().join("missing.yaml"))])
        .unwrap_err()
        .to_string();
    assert!(err.contains("TRIBUTARY_TEST_UNSET_TOKEN"), "{err}");
}

#[test]
fn test_integration_overrides() {
    let config = Config::parse(
        r#"
cache:
  ttl_hours: 24
integrations:
  strict:
    connection:
      name: aws-s3-connection
    bucket:
      name: atlan-tech-challenge
      arn: arn:aws:s3:::atlan-tech-challenge
      url: s3://atlan-tech-challenge
    matching: exact
    classify: false
    cache_ttl_hours: 1
"#,
    )
    .unwrap();

    let (_, strict) = config.integrations().next().unwrap();
    assert_eq!(strict.matching, MatchStrategy::Exact);
    assert!(!strict.classify);
    assert_eq!(config.cache_ttl(strict), Duration::from_secs(3600));
}

#[test]
fn test_unknown_integration_selection() {
    let config = Config::parse(&integration("challenge", "atlan-tech-challenge")).unwrap();

    assert_eq!(config.select(Some("challenge")).unwrap().len(), 1);
    assert!(matches!(
        config.select(Some("missing")),
        Err(ConfigError::UnknownIntegration { .. })
    ));
}

#[test]
fn test_cache_file_with_path_rejected() {
    let yaml = format!(
        "{}    upstream:\n      connection: postgres-prod\n      connector: postgres\n      cache_file: caches/pg.json\n",
        integration("challenge", "atlan-tech-challenge")
    );

    match Config::parse(&yaml).unwrap_err() {
        ConfigError::InvalidCacheFile {
            integration,
            field,
            name,
        } => {
            assert_eq!(integration, "challenge");
            assert_eq!(field, "upstream.cache_file");
            assert_eq!(name, "caches/pg.json");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_huge_ttl_override_saturates() {
    let yaml = format!(
        "{}    cache_ttl_hours: 18446744073709551615\n",
        integration("challenge", "atlan-tech-challenge")
    );
    let config = Config::parse(&yaml).unwrap();

    let (_, challenge) = config.integrations().next().unwrap();
    assert_eq!(config.cache_ttl(challenge), Duration::from_secs(u64::MAX));
}
