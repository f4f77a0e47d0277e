//! DELETE statements.

use oxide_entity_core::metadata::{EntityId, MetadataRegistry};
use oxide_entity_core::value::ToSqlValue;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::expr::{CompiledQuery, Expr, SqlWriter};
use crate::insert::Values;
use crate::select::table_path;
use crate::update::{discriminator_condition, key_condition, KeyFilter, TableResolver};

/// Builder for entity deletes.
///
/// A class-table child is deleted through the root table; the child rows
/// follow through their cascading foreign keys.
#[derive(Debug, Clone)]
pub struct DeleteQuery<'r> {
    registry: &'r MetadataRegistry,
    entity: EntityId,
    filter: Option<Expr>,
    key: Option<KeyFilter>,
}

impl<'r> DeleteQuery<'r> {
    /// Starts a delete of `entity`.
    pub fn new(registry: &'r MetadataRegistry, entity: &str) -> Result<Self> {
        let entity = registry
            .find(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?
            .id;
        Ok(Self {
            registry,
            entity,
            filter: None,
            key: None,
        })
    }

    /// Restricts the delete with a filter on columns of the deleted table.
    #[must_use]
    pub fn where_(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Restricts the delete to the row with this single-column key.
    #[must_use]
    pub fn where_id<T: ToSqlValue>(mut self, id: T) -> Self {
        self.key = Some(KeyFilter::Id(id.to_sql_value()));
        self
    }

    /// Restricts the delete to the row with this (composite) key.
    #[must_use]
    pub fn where_key(mut self, key: Values) -> Self {
        self.key = Some(KeyFilter::Key(key));
        self
    }

    /// Builds the statement.
    pub fn build(&self) -> Result<CompiledQuery> {
        let entity = self.registry.get(self.entity);
        let table = if entity.is_class_table_child() {
            self.registry.root(entity.id)
        } else {
            entity
        };
        let dialect = self.registry.dialect();
        let mut writer = SqlWriter::new(dialect);
        let mut sql = format!("DELETE FROM {}", table_path(dialect, table));

        let mut conditions = Vec::new();
        if let Some(filter) = &self.filter {
            let resolver = TableResolver {
                entity: table,
                dialect,
            };
            conditions.push(filter.render(&mut writer, &resolver)?);
        }
        if let Some(key) = &self.key {
            let key = key.columns(table)?;
            conditions.push(key_condition(&mut writer, &key));
        }
        if let Some(condition) = discriminator_condition(&mut writer, self.registry, entity) {
            conditions.push(condition);
        }
        if conditions.len() > 1 && self.filter.is_some() {
            conditions[0] = format!("({})", conditions[0]);
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        debug!(entity = %entity.name, sql = %sql, "delete built");
        Ok(writer.finish(sql))
    }
}
