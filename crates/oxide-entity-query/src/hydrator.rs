//! Turns flat, labelled result rows into entity trees.
//!
//! A join over a collection repeats the parent once per child row. Rows are
//! grouped by primary key at every node of the plan, so each entity appears
//! once, in the order it first shows up in the result.

use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, Ipv6Addr};

use oxide_entity_core::metadata::MetadataRegistry;
use oxide_entity_core::types::ColumnType;
use oxide_entity_core::value::SqlValue;
use tracing::trace;

use crate::error::{QueryError, Result};
use crate::instance::{EntityInstance, FieldValue};
use crate::select::{PlanColumn, PlanNode, SelectPlan};

/// A result row keyed by column label.
pub type Row = BTreeMap<String, SqlValue>;

/// Maps rows of a select onto its plan.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'a> {
    registry: &'a MetadataRegistry,
    plan: &'a SelectPlan,
}

impl<'a> Hydrator<'a> {
    /// Creates a hydrator for rows produced by `plan`.
    #[must_use]
    pub const fn new(registry: &'a MetadataRegistry, plan: &'a SelectPlan) -> Self {
        Self { registry, plan }
    }

    /// Hydrates root entities from `rows`.
    pub fn hydrate(&self, rows: &[Row]) -> Result<Vec<EntityInstance>> {
        let rows: Vec<&Row> = rows.iter().collect();
        let instances = self.hydrate_node(0, &rows)?;
        trace!(rows = rows.len(), entities = instances.len(), "rows hydrated");
        Ok(instances)
    }

    fn hydrate_node(&self, index: usize, rows: &[&Row]) -> Result<Vec<EntityInstance>> {
        let node = &self.plan.nodes[index];
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&Row>> = HashMap::new();
        for row in rows {
            let Some(key) = row_key(node, row)? else {
                continue;
            };
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(row);
        }

        order
            .iter()
            .map(|key| {
                let group = &groups[key];
                let mut instance = self.instance(node, group[0])?;
                for child in &node.children {
                    let child_node = &self.plan.nodes[*child];
                    let Some(link) = &child_node.link else {
                        continue;
                    };
                    let related = self.hydrate_node(*child, group)?;
                    let value = if link.relation.kind.is_collection() {
                        FieldValue::Many(related)
                    } else {
                        FieldValue::One(related.into_iter().next().map(Box::new))
                    };
                    instance.fields.insert(link.relation.property.clone(), value);
                }
                Ok(instance)
            })
            .collect()
    }

    fn instance(&self, node: &PlanNode, row: &Row) -> Result<EntityInstance> {
        let mut instance = EntityInstance::new(self.concrete_entity(node, row));
        for column in &node.columns {
            let value = normalize(column.column_type, value_of(row, column)?.clone());
            insert_path(&mut instance.fields, &column.property_path, value);
        }
        Ok(instance)
    }

    /// Subclass named by the discriminator, or the node's entity.
    fn concrete_entity(&self, node: &PlanNode, row: &Row) -> String {
        let entity = self.registry.get(node.entity);
        node.columns
            .iter()
            .find(|c| c.is_discriminator)
            .and_then(|c| row.get(&c.label))
            .and_then(SqlValue::as_text)
            .and_then(|value| self.registry.entity_for_discriminator(entity.root, value))
            .map_or_else(|| entity.name.clone(), |e| e.name.clone())
    }
}

fn value_of<'r>(row: &'r Row, column: &PlanColumn) -> Result<&'r SqlValue> {
    row.get(&column.label)
        .ok_or_else(|| QueryError::MissingColumn(column.label.clone()))
}

/// Identity of the node's entity in `row`; `None` when the row carries no
/// entity for this node (a NULL key from an outer join).
fn row_key(node: &PlanNode, row: &Row) -> Result<Option<String>> {
    let mut parts = Vec::new();
    for column in node.primary_columns() {
        let value = value_of(row, column)?;
        if value.is_null() {
            return Ok(None);
        }
        parts.push(value.to_sql_inline());
    }
    Ok(Some(parts.join("\u{1f}")))
}

fn insert_path(fields: &mut BTreeMap<String, FieldValue>, path: &str, value: SqlValue) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), FieldValue::Scalar(value));
        }
        Some((head, rest)) => {
            let entry = fields
                .entry(head.to_string())
                .or_insert_with(|| FieldValue::Embedded(BTreeMap::new()));
            if let FieldValue::Embedded(nested) = entry {
                insert_path(nested, rest, value);
            }
        }
    }
}

/// Folds driver representations onto one canonical form per type.
#[must_use]
pub fn normalize(column_type: ColumnType, value: SqlValue) -> SqlValue {
    match (column_type, value) {
        (ColumnType::Inet6, SqlValue::Text(text)) => SqlValue::Text(
            text.parse::<Ipv6Addr>()
                .map_or(text, |addr| addr.to_string()),
        ),
        (ColumnType::Inet4, SqlValue::Text(text)) => SqlValue::Text(
            text.parse::<Ipv4Addr>()
                .map_or(text, |addr| addr.to_string()),
        ),
        (ColumnType::Uuid, SqlValue::Text(text)) => SqlValue::Text(text.to_ascii_lowercase()),
        (ColumnType::Boolean, SqlValue::Int(n)) => SqlValue::Bool(n != 0),
        (ColumnType::Json | ColumnType::Jsonb, SqlValue::Text(text)) => {
            serde_json::from_str(&text).map_or(SqlValue::Text(text), SqlValue::Json)
        }
        (_, value) => value,
    }
}
