//! Lineage inference between tables and registered objects.

use tributary_core::matcher::{MatchStrategy, TableMatcher, TableSide};
use tributary_core::types::AssetRecord;

use super::report::LineageDirection;
use crate::catalog::{AssetRef, ProcessSpec, connection_of};

/// A table and an object the matcher believes hold the same data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineageLink<'a> {
    pub table: &'a AssetRecord,
    pub object: &'a AssetRef,
}

impl LineageDirection {
    fn side(&self) -> TableSide {
        match self {
            LineageDirection::Upstream => TableSide::Relational,
            LineageDirection::Downstream => TableSide::Warehouse,
        }
    }
}

/// Pair every table with each object whose key matches its name.
///
/// Links are ordered by table, then by object, following input order.
pub(crate) fn plan_links<'a>(
    direction: LineageDirection,
    tables: &'a [AssetRecord],
    objects: &'a [AssetRef],
    strategy: MatchStrategy,
) -> Vec<LineageLink<'a>> {
    tables
        .iter()
        .flat_map(|table| {
            let matcher = TableMatcher::new(&table.name, direction.side(), strategy);
            objects
                .iter()
                .filter(move |object| matcher.matches(&object.name))
                .map(move |object| LineageLink { table, object })
        })
        .collect()
}

fn slug(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// The process recording `link`, owned by the table's connection.
///
/// The process id is derived from both ends, so re-running the integration
/// updates the same process instead of adding another one.
pub(crate) fn process_spec(direction: LineageDirection, link: &LineageLink<'_>) -> ProcessSpec {
    let table = AssetRef::from(link.table);
    let object = link.object.clone();

    let (name, description, inputs, outputs) = match direction {
        LineageDirection::Upstream => (
            format!("{} -> {}", table.name, object.name),
            format!("Export of table {} to {}", table.name, object.name),
            vec![table.clone()],
            vec![object.clone()],
        ),
        LineageDirection::Downstream => (
            format!("{} -> {}", object.name, table.name),
            format!("Load of {} into table {}", object.name, table.name),
            vec![object.clone()],
            vec![table.clone()],
        ),
    };

    ProcessSpec {
        name,
        process_id: format!("{}_{}_{}", direction, slug(&table.name), slug(&object.name)),
        connection_qualified_name: connection_of(&table.qualified_name).to_string(),
        description: Some(description),
        inputs,
        outputs,
    }
}
