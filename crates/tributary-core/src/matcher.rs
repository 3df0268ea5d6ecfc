//! Name matching between catalog tables and storage object keys.
//!
//! Lineage edges are inferred from names alone: a table `accounts` is
//! assumed to be exported as something like `exports/accounts_20240115.parquet`,
//! and a warehouse table `dim_account` to be loaded from the same file.
//!
//! The default [`MatchStrategy::Substring`] is deliberately loose. Short
//! table names can match unrelated keys; that is accepted for a best-effort
//! heuristic and callers must not tighten it implicitly.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Warehouse naming prefixes stripped before comparison.
const WAREHOUSE_PREFIXES: &[&str] = &["dim_", "fact_"];

/// Which side of the lineage chain a table sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableSide {
    /// Source database table (exported into storage).
    Relational,
    /// Warehouse table (loaded from storage).
    Warehouse,
}

/// How a table name is compared against object base names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Substring containment in either direction, with plural and
    /// warehouse-prefix variants of the table name.
    #[default]
    Substring,
    /// Base name must equal the lower-cased table name.
    Exact,
}

/// An object key together with the name used for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate<'a> {
    pub key: &'a str,
    /// Last path segment, final extension removed, lower-cased.
    pub base_name: String,
}

impl<'a> MatchCandidate<'a> {
    pub fn new(key: &'a str) -> Self {
        Self {
            key,
            base_name: base_name(key),
        }
    }
}

/// Derive the comparison name of an object key.
///
/// `exports/users/2024/users_20240115.parquet` becomes `users_20240115`.
/// Only the final extension is removed, and a leading dot is kept.
pub fn base_name(key: &str) -> String {
    let segment = key.rsplit('/').next().unwrap_or(key);
    let stem = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };
    stem.to_lowercase()
}

/// Drops every trailing `s`, so `class` becomes `cla`.
fn strip_plural(name: &str) -> &str {
    name.trim_end_matches('s')
}

/// Matches one table name against candidate keys.
#[derive(Debug, Clone)]
pub struct TableMatcher {
    table: String,
    variants: Vec<String>,
    strategy: MatchStrategy,
}

impl TableMatcher {
    pub fn new(table_name: &str, side: TableSide, strategy: MatchStrategy) -> Self {
        let table = table_name.to_lowercase();

        let mut roots = vec![table.as_str()];
        if side == TableSide::Warehouse {
            roots.extend(
                WAREHOUSE_PREFIXES
                    .iter()
                    .filter_map(|prefix| table.strip_prefix(prefix)),
            );
        }

        let mut variants: Vec<String> = Vec::new();
        for root in roots {
            for variant in [root, strip_plural(root)] {
                if !variant.is_empty() && !variants.iter().any(|v| v == variant) {
                    variants.push(variant.to_string());
                }
            }
        }

        Self {
            table,
            variants,
            strategy,
        }
    }

    /// Normalized (lower-cased) table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name variants tried as substrings of a candidate's base name.
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn matches_candidate(&self, candidate: &MatchCandidate<'_>) -> bool {
        let base = candidate.base_name.as_str();
        match self.strategy {
            MatchStrategy::Exact => !base.is_empty() && base == self.table,
            MatchStrategy::Substring => {
                self.variants.iter().any(|v| base.contains(v.as_str()))
                    || (!base.is_empty() && self.table.contains(base))
            }
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.matches_candidate(&MatchCandidate::new(key))
    }

    /// Every matching key, in input order.
    pub fn filter<'a, S: AsRef<str>>(&self, candidate_keys: &'a [S]) -> Vec<&'a str> {
        candidate_keys
            .iter()
            .map(|key| key.as_ref())
            .filter(|key| self.matches(key))
            .collect()
    }
}

/// Return the keys that correspond to `table_name`, preserving input order.
///
/// Never fails; an empty result simply means no object looks like the table.
pub fn match_keys<'a, S: AsRef<str>>(
    table_name: &str,
    candidate_keys: &'a [S],
    side: TableSide,
    strategy: MatchStrategy,
) -> Vec<&'a str> {
    TableMatcher::new(table_name, side, strategy).filter(candidate_keys)
}
