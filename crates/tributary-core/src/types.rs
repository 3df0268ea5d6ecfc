//! Common types shared across crates.

use serde::{Deserialize, Serialize};

/// Type name the catalog uses for relational and warehouse tables.
pub const TABLE_TYPE: &str = "Table";

/// A catalog asset as returned by a search: qualified name, display name, type.
///
/// Serialized as a three-element array `[qualified_name, name, type_name]`,
/// which is the layout of the query cache files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct AssetRecord {
    pub qualified_name: String,
    pub name: String,
    pub type_name: String,
}

impl AssetRecord {
    pub fn new(
        qualified_name: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn is_table(&self) -> bool {
        self.type_name == TABLE_TYPE
    }
}

impl From<(String, String, String)> for AssetRecord {
    fn from((qualified_name, name, type_name): (String, String, String)) -> Self {
        Self {
            qualified_name,
            name,
            type_name,
        }
    }
}

impl From<AssetRecord> for (String, String, String) {
    fn from(record: AssetRecord) -> Self {
        (record.qualified_name, record.name, record.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_triple() {
        let record = AssetRecord::new("default/postgres/1/db/public/accounts", "accounts", "Table");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"["default/postgres/1/db/public/accounts","accounts","Table"]"#);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let result: Result<AssetRecord, _> = serde_json::from_str(r#"["qn","name"]"#);
        assert!(result.is_err());
        let result: Result<AssetRecord, _> = serde_json::from_str(r#"{"qualified_name":"qn"}"#);
        assert!(result.is_err());
    }
}
