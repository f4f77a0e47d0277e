//! UPDATE statements.

use std::collections::BTreeMap;

use oxide_entity_core::dialect::Dialect;
use oxide_entity_core::metadata::{EntityId, EntityMetadata, MetadataRegistry, TableType};
use oxide_entity_core::value::{SqlValue, ToSqlValue};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::expr::{CompiledQuery, Expr, PropertyResolver, SqlWriter};
use crate::insert::Values;
use crate::select::{discriminator_values, table_path};

/// Primary-key restriction of an update or delete.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KeyFilter {
    /// Value of a single-column key.
    Id(SqlValue),
    /// Values of every key property.
    Key(Values),
}

impl KeyFilter {
    /// `(column, value)` pairs for `entity`'s primary key.
    pub(crate) fn columns(&self, entity: &EntityMetadata) -> Result<Vec<(String, SqlValue)>> {
        let keys: Vec<_> = entity.primary_columns().collect();
        match self {
            Self::Id(value) => match keys.as_slice() {
                [key] => Ok(vec![(key.database_name.clone(), value.clone())]),
                _ => Err(QueryError::MissingPrimaryKey {
                    entity: entity.name.clone(),
                    property: keys
                        .get(1)
                        .map_or_else(String::new, |k| k.property_path.clone()),
                }),
            },
            Self::Key(values) => keys
                .iter()
                .map(|k| {
                    values
                        .get(&k.property_path)
                        .map(|v| (k.database_name.clone(), v.clone()))
                        .ok_or_else(|| QueryError::MissingPrimaryKey {
                            entity: entity.name.clone(),
                            property: k.property_path.clone(),
                        })
                })
                .collect(),
        }
    }
}

/// Resolves properties against the columns of one table, unqualified.
pub(crate) struct TableResolver<'a> {
    pub(crate) entity: &'a EntityMetadata,
    pub(crate) dialect: &'a dyn Dialect,
}

impl TableResolver<'_> {
    /// Column name for a property or single-column relation.
    pub(crate) fn column(&self, path: &str) -> Option<String> {
        if let Some(column) = self.entity.column(path) {
            return Some(column.database_name.clone());
        }
        let relation = self.entity.relation(path)?;
        match relation.join_columns.as_slice() {
            [join] if relation.has_local_foreign_key() => Some(join.name.clone()),
            _ => None,
        }
    }
}

impl PropertyResolver for TableResolver<'_> {
    fn resolve(&self, path: &str) -> Result<String> {
        self.column(path)
            .map(|c| self.dialect.quote_identifier(&c))
            .ok_or_else(|| QueryError::UnknownProperty {
                entity: self.entity.name.clone(),
                property: path.to_string(),
            })
    }
}

/// Renders `"pk" = ? AND ...` for a key filter.
pub(crate) fn key_condition(writer: &mut SqlWriter<'_>, key: &[(String, SqlValue)]) -> String {
    key.iter()
        .map(|(column, value)| {
            let placeholder = writer.bind(value.clone());
            format!("{} = {placeholder}", writer.quote(column))
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Renders the discriminator restriction for a single-table child.
pub(crate) fn discriminator_condition(
    writer: &mut SqlWriter<'_>,
    registry: &MetadataRegistry,
    entity: &EntityMetadata,
) -> Option<String> {
    if entity.table_type != TableType::StiChild {
        return None;
    }
    let column = writer.quote(entity.discriminator_column.as_deref()?);
    let placeholders: Vec<String> = discriminator_values(registry, entity.id)
        .into_iter()
        .map(|v| writer.bind(SqlValue::Text(v)))
        .collect();
    Some(format!("{column} IN ({})", placeholders.join(", ")))
}

/// Builder for entity updates.
///
/// Assignments to columns of class-table ancestors produce one statement
/// per table; such updates must be restricted with [`UpdateQuery::where_id`]
/// or [`UpdateQuery::where_key`].
#[derive(Debug, Clone)]
pub struct UpdateQuery<'r> {
    registry: &'r MetadataRegistry,
    entity: EntityId,
    assignments: Vec<(String, SqlValue)>,
    filter: Option<Expr>,
    key: Option<KeyFilter>,
}

impl<'r> UpdateQuery<'r> {
    /// Starts an update of `entity`.
    pub fn new(registry: &'r MetadataRegistry, entity: &str) -> Result<Self> {
        let entity = registry
            .find(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?
            .id;
        Ok(Self {
            registry,
            entity,
            assignments: Vec::new(),
            filter: None,
            key: None,
        })
    }

    /// Assigns `value` to `property`.
    #[must_use]
    pub fn set<T: ToSqlValue>(mut self, property: &str, value: T) -> Self {
        self.assignments
            .push((property.to_string(), value.to_sql_value()));
        self
    }

    /// Assigns every value of `values`.
    #[must_use]
    pub fn set_all(mut self, values: Values) -> Self {
        self.assignments.extend(values);
        self
    }

    /// Restricts the update with a filter.
    #[must_use]
    pub fn where_(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Restricts the update to the row with this single-column key.
    #[must_use]
    pub fn where_id<T: ToSqlValue>(mut self, id: T) -> Self {
        self.key = Some(KeyFilter::Id(id.to_sql_value()));
        self
    }

    /// Restricts the update to the row with this (composite) key.
    #[must_use]
    pub fn where_key(mut self, key: Values) -> Self {
        self.key = Some(KeyFilter::Key(key));
        self
    }

    /// Builds one statement per table touched, root table first.
    pub fn build(&self) -> Result<Vec<CompiledQuery>> {
        let entity = self.registry.get(self.entity);
        if self.assignments.is_empty() {
            return Err(QueryError::EmptyUpdate {
                entity: entity.name.clone(),
            });
        }

        // group assignments by the table holding the column
        let mut tables: BTreeMap<usize, (EntityId, Vec<(String, SqlValue)>)> = BTreeMap::new();
        for (property, value) in &self.assignments {
            let (depth, holder, column) = self.locate(entity, property)?;
            tables
                .entry(depth)
                .or_insert_with(|| (holder, Vec::new()))
                .1
                .push((column, value.clone()));
        }
        if tables.len() > 1 && self.key.is_none() {
            return Err(QueryError::MultiTableFilter {
                entity: entity.name.clone(),
            });
        }

        let dialect = self.registry.dialect();
        let statements = tables
            .into_values()
            .rev()
            .map(|(holder, assignments)| self.statement(dialect, self.registry.get(holder), &assignments))
            .collect::<Result<Vec<_>>>()?;
        debug!(entity = %entity.name, statements = statements.len(), "update built");
        Ok(statements)
    }

    fn statement(
        &self,
        dialect: &dyn Dialect,
        table: &EntityMetadata,
        assignments: &[(String, SqlValue)],
    ) -> Result<CompiledQuery> {
        let mut writer = SqlWriter::new(dialect);
        let set: Vec<String> = assignments
            .iter()
            .map(|(column, value)| {
                let placeholder = writer.bind(value.clone());
                format!("{} = {placeholder}", writer.quote(column))
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", table_path(dialect, table), set.join(", "));

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
        let entity = self.registry.get(self.entity);
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
        Ok(writer.finish(sql))
    }

    /// Finds the table holding `property`: its distance up the class-table
    /// chain, the owning entity and the column name.
    fn locate(&self, entity: &EntityMetadata, property: &str) -> Result<(usize, EntityId, String)> {
        let mut current = entity;
        let mut depth = 0;
        loop {
            let resolver = TableResolver {
                entity: current,
                dialect: self.registry.dialect(),
            };
            if let Some(column) = resolver.column(property) {
                return Ok((depth, current.id, column));
            }
            match current.parent.filter(|_| current.is_class_table_child()) {
                Some(parent) => {
                    current = self.registry.get(parent);
                    depth += 1;
                }
                None => {
                    return Err(QueryError::UnknownProperty {
                        entity: entity.name.clone(),
                        property: property.to_string(),
                    })
                }
            }
        }
    }
}
