//! Integration identifier.
//!
//! `IntegrationKey` names one entry under `integrations:` in the
//! configuration. Keys label logs and metrics and must be unique across
//! every merged config file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for an integration in tributary configuration.
///
/// # Examples
///
/// ```
/// use tributary::config::IntegrationKey;
///
/// let key = IntegrationKey::new("tech-challenge");
/// assert_eq!(key.id(), "tech-challenge");
/// ```
#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationKey(String);

impl IntegrationKey {
    /// Create a new integration key from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying identifier string.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for IntegrationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
