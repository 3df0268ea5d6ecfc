//! Configuration for tributary.

mod integration_key;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use integration_key::IntegrationKey;
pub use tributary_core::config::{
    CacheConfig, ConfigArgs, ConfigPath, Mergeable, MetricsConfig, interpolate, load_from_paths,
};
use tributary_core::cache::is_valid_name as is_valid_cache_name;
use tributary_core::config::hours_to_duration;
use tributary_core::error::ConfigError;
use tributary_core::matcher::MatchStrategy;
use tributary_core::storage::SKIP_SIGNATURE_OPTION;
use tributary_core::types::TABLE_TYPE;

/// Environment variable consulted when `catalog.api_token` is not set.
pub const API_TOKEN_ENV: &str = "ATLAN_API_TOKEN";

const DEFAULT_BASE_URL: &str = "https://tech-challenge.atlan.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_storage_connector() -> String {
    "s3".to_string()
}

fn default_type_filter() -> String {
    TABLE_TYPE.to_string()
}

fn default_classify() -> bool {
    true
}

/// Catalog API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Base URL of the catalog tenant.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Falls back to `ATLAN_API_TOKEN` when unset or empty.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Search page size.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the API token from config, then the environment.
    pub fn api_token(&self) -> Result<String, ConfigError> {
        self.api_token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty()))
            .ok_or(ConfigError::MissingApiToken)
    }

    /// Merge values from another CatalogConfig (last-write-wins for non-defaults).
    pub fn merge_from(&mut self, other: Self) {
        if other.base_url != default_base_url() {
            self.base_url = other.base_url;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
        if other.timeout_secs != default_timeout_secs() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.page_size != default_page_size() {
            self.page_size = other.page_size;
        }
    }
}

/// The storage connection that owns the bucket in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection display name, used to look up an existing connection.
    pub name: String,
    /// Catalog connector type.
    #[serde(default = "default_storage_connector")]
    pub connector: String,
    /// Users granted admin on a newly created connection.
    #[serde(default)]
    pub admin_users: Vec<String>,
}

/// The bucket being registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketConfig {
    /// Catalog display name of the bucket.
    pub name: String,
    /// Bucket ARN; identifies an existing bucket asset.
    pub arn: String,
    /// Storage URL listed for objects (`s3://bucket/key`, local path, ...).
    pub url: String,
    /// Prepended to every object key when naming objects in the catalog.
    #[serde(default)]
    pub prefix: String,
    /// Skip request signing (public buckets).
    #[serde(default)]
    pub anonymous: bool,
    /// Extra object_store options (credentials, region, endpoint).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

impl BucketConfig {
    /// Storage options with the anonymous flag applied.
    pub fn storage_options(&self) -> HashMap<String, String> {
        let mut options = self.storage_options.clone();
        if self.anonymous {
            options.insert(SKIP_SIGNATURE_OPTION.to_string(), "true".to_string());
        }
        options
    }
}

/// A relational or warehouse connection whose tables feed lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerConfig {
    /// Connection display name.
    pub connection: String,
    /// Catalog connector type, e.g. `postgres` or `snowflake`.
    pub connector: String,
    /// Cache file name for this connection's assets.
    #[serde(default)]
    pub cache_file: Option<String>,
    /// Asset type considered for lineage.
    #[serde(default = "default_type_filter")]
    pub type_filter: String,
}

impl PeerConfig {
    pub fn cache_name(&self) -> String {
        self.cache_file
            .clone()
            .unwrap_or_else(|| format!("{}_assets_cache.json", self.connection))
    }
}

/// One storage integration: connection, bucket, and its lineage peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    pub connection: ConnectionConfig,
    pub bucket: BucketConfig,
    /// Source database whose tables are exported into the bucket.
    #[serde(default)]
    pub upstream: Option<PeerConfig>,
    /// Warehouse whose tables are loaded from the bucket.
    #[serde(default)]
    pub downstream: Option<PeerConfig>,
    /// How table names are matched against object keys.
    #[serde(default)]
    pub matching: MatchStrategy,
    /// Add a PII classification to object descriptions.
    #[serde(default = "default_classify")]
    pub classify: bool,
    /// Overrides `cache.ttl_hours` for this integration.
    #[serde(default)]
    pub cache_ttl_hours: Option<u64>,
}

impl IntegrationConfig {
    /// Lineage peers that are configured, upstream first.
    pub fn peers(&self) -> impl Iterator<Item = &PeerConfig> {
        self.upstream.iter().chain(self.downstream.iter())
    }

    /// This integration's cache TTL, or `default` when not overridden.
    pub fn cache_ttl(&self, default: Duration) -> Duration {
        self.cache_ttl_hours
            .map(hours_to_duration)
            .unwrap_or(default)
    }

    fn validate(&self, key: &IntegrationKey, errors: &mut Vec<ConfigError>) {
        let mut require = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                errors.push(ConfigError::EmptyField {
                    integration: key.id().to_string(),
                    field,
                });
            }
        };

        require(&self.connection.name, "connection.name");
        require(&self.connection.connector, "connection.connector");
        require(&self.bucket.name, "bucket.name");
        require(&self.bucket.arn, "bucket.arn");
        require(&self.bucket.url, "bucket.url");

        if let Some(upstream) = &self.upstream {
            require(&upstream.connection, "upstream.connection");
            require(&upstream.connector, "upstream.connector");
            require(&upstream.type_filter, "upstream.type_filter");
        }
        if let Some(downstream) = &self.downstream {
            require(&downstream.connection, "downstream.connection");
            require(&downstream.connector, "downstream.connector");
            require(&downstream.type_filter, "downstream.type_filter");
        }

        let peers = [
            ("upstream.cache_file", &self.upstream),
            ("downstream.cache_file", &self.downstream),
        ];
        for (field, peer) in peers {
            let Some(name) = peer.as_ref().map(PeerConfig::cache_name) else {
                continue;
            };
            if !is_valid_cache_name(&name) {
                errors.push(ConfigError::InvalidCacheFile {
                    integration: key.id().to_string(),
                    field,
                    name,
                });
            }
        }
    }
}

/// Main configuration for tributary.
///
/// # Example
///
/// ```yaml
/// catalog:
///   base_url: https://tech-challenge.atlan.com
///   api_token: ${ATLAN_API_TOKEN}
///
/// cache:
///   dir: /var/cache/tributary
///   ttl_hours: 24
///
/// integrations:
///   tech-challenge:
///     connection:
///       name: aws-s3-connection
///       admin_users: [data-admin]
///     bucket:
///       name: atlan-tech-challenge
///       arn: arn:aws:s3:::atlan-tech-challenge
///       url: s3://atlan-tech-challenge
///       prefix: 2025/csa-tech-challenge/
///       anonymous: true
///     upstream:
///       connection: postgres-prod
///       connector: postgres
///       cache_file: postgres_assets_cache.json
///     downstream:
///       connection: snowflake-prod
///       connector: snowflake
///       cache_file: snowflake_assets_cache.json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Named integrations, run in declaration order.
    #[serde(default)]
    pub integrations: IndexMap<IntegrationKey, IntegrationConfig>,
}

impl Mergeable for Config {
    type Key = IntegrationKey;
    type Component = IntegrationConfig;

    fn components(&self) -> &IndexMap<Self::Key, Self::Component> {
        &self.integrations
    }

    fn components_mut(&mut self) -> &mut IndexMap<Self::Key, Self::Component> {
        &mut self.integrations
    }

    fn merge_sections(&mut self, other: Self) {
        self.catalog.merge_from(other.catalog);
        self.cache.merge_from(other.cache);
        self.metrics.merge_from(other.metrics);
    }

    fn parse_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })
    }
}

impl Config {
    /// Load configuration from multiple paths (files or directories).
    pub fn from_paths(paths: &[ConfigPath]) -> Result<Self, ConfigError> {
        let config: Self = load_from_paths(paths)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_yaml(&interpolate(contents)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Every integration is checked; all problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integrations.is_empty() {
            return Err(ConfigError::NoIntegrations);
        }

        let mut errors = Vec::new();
        for (key, integration) in &self.integrations {
            integration.validate(key, &mut errors);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleErrors {
                errors: errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// Iterate over all integrations with their keys.
    pub fn integrations(&self) -> impl Iterator<Item = (&IntegrationKey, &IntegrationConfig)> {
        self.integrations.iter()
    }

    pub fn integration_count(&self) -> usize {
        self.integrations.len()
    }

    /// All integrations, or only the named one.
    pub fn select(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<(&IntegrationKey, &IntegrationConfig)>, ConfigError> {
        match name {
            None => Ok(self.integrations.iter().collect()),
            Some(name) => self
                .integrations
                .get_key_value(&IntegrationKey::new(name))
                .map(|entry| vec![entry])
                .ok_or_else(|| ConfigError::UnknownIntegration {
                    integration: name.to_string(),
                }),
        }
    }

    /// Cache TTL for an integration, honoring its override.
    pub fn cache_ttl(&self, integration: &IntegrationConfig) -> Duration {
        integration.cache_ttl(self.cache.ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
integrations:
  challenge:
    connection:
      name: aws-s3-connection
    bucket:
      name: atlan-tech-challenge
      arn: arn:aws:s3:::atlan-tech-challenge
      url: s3://atlan-tech-challenge
"#;

    #[test]
    fn test_minimal_parse_and_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.integration_count(), 1);
        assert_eq!(config.catalog.base_url, "https://tech-challenge.atlan.com");
        assert_eq!(config.catalog.timeout_secs, 30);
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.cache.ttl_hours(), 24);

        let (key, integration) = config.integrations().next().unwrap();
        assert_eq!(key.id(), "challenge");
        assert_eq!(integration.connection.connector, "s3");
        assert!(integration.connection.admin_users.is_empty());
        assert_eq!(integration.bucket.prefix, "");
        assert!(!integration.bucket.anonymous);
        assert!(integration.upstream.is_none());
        assert_eq!(integration.matching, MatchStrategy::Substring);
        assert!(integration.classify);
    }

    #[test]
    fn test_full_parse() {
        let yaml = r#"
catalog:
  base_url: https://catalog.example.com
  api_token: secret
  page_size: 50
cache:
  dir: /tmp/tributary-cache
  ttl_hours: 6
metrics:
  textfile: /tmp/tributary.prom
integrations:
  challenge:
    connection:
      name: aws-s3-connection
      admin_users: [data-admin]
    bucket:
      name: atlan-tech-challenge
      arn: arn:aws:s3:::atlan-tech-challenge
      url: s3://atlan-tech-challenge
      prefix: 2025/csa/
      anonymous: true
    upstream:
      connection: postgres-prod
      connector: postgres
      cache_file: postgres_assets_cache.json
    downstream:
      connection: snowflake-prod
      connector: snowflake
    matching: exact
    classify: false
    cache_ttl_hours: 1
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.catalog.api_token().unwrap(), "secret");
        assert_eq!(config.catalog.page_size, 50);
        assert_eq!(config.cache.ttl(), Duration::from_secs(6 * 3600));

        let integration = &config.integrations[0];
        assert_eq!(integration.matching, MatchStrategy::Exact);
        assert!(!integration.classify);
        assert_eq!(config.cache_ttl(integration), Duration::from_secs(3600));

        let upstream = integration.upstream.as_ref().unwrap();
        assert_eq!(upstream.cache_name(), "postgres_assets_cache.json");
        assert_eq!(upstream.type_filter, "Table");

        let downstream = integration.downstream.as_ref().unwrap();
        assert_eq!(downstream.cache_name(), "snowflake-prod_assets_cache.json");
        assert_eq!(integration.peers().count(), 2);

        let options = integration.bucket.storage_options();
        assert_eq!(options.get(SKIP_SIGNATURE_OPTION).map(String::as_str), Some("true"));
    }

    #[test]
    fn test_no_integrations_rejected() {
        let err = Config::parse("catalog: {}").unwrap_err();
        assert!(matches!(err, ConfigError::NoIntegrations));
    }

    #[test]
    fn test_empty_fields_collected_across_integrations() {
        let yaml = r#"
integrations:
  first:
    connection:
      name: ""
    bucket:
      name: bucket
      arn: arn:aws:s3:::bucket
      url: s3://bucket
  second:
    connection:
      name: conn
    bucket:
      name: bucket
      arn: ""
      url: s3://bucket
"#;
        let err = Config::parse(yaml).unwrap_err().to_string();
        assert!(err.contains("'first' has empty connection.name"), "{err}");
        assert!(err.contains("'second' has empty bucket.arn"), "{err}");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = MINIMAL.replace("url: s3://atlan-tech-challenge", "uri: s3://x");
        assert!(Config::parse(&yaml).is_err());
    }

    #[test]
    fn test_select() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.select(None).unwrap().len(), 1);
        assert_eq!(config.select(Some("challenge")).unwrap().len(), 1);
        assert!(matches!(
            config.select(Some("missing")),
            Err(ConfigError::UnknownIntegration { .. })
        ));
    }

    #[test]
    fn test_catalog_merge() {
        let mut base = CatalogConfig {
            api_token: Some("first".into()),
            page_size: 25,
            ..Default::default()
        };
        base.merge_from(CatalogConfig {
            base_url: "https://other.example.com".into(),
            ..Default::default()
        });
        assert_eq!(base.base_url, "https://other.example.com");
        assert_eq!(base.api_token.as_deref(), Some("first"));
        assert_eq!(base.page_size, 25);
    }
}
