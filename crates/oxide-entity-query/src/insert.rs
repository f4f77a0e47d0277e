//! INSERT statements.
//!
//! Inserting into a class-table child writes one row per table of the
//! chain, root first; the root's generated key is fed into the later steps
//! through [`InsertPlan::set_value`].

use std::collections::BTreeMap;

use oxide_entity_core::metadata::{EntityId, EntityMetadata, MetadataRegistry};
use oxide_entity_core::value::SqlValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::{QueryError, Result};
use crate::expr::{CompiledQuery, SqlWriter};
use crate::select::table_path;

/// Property values keyed by property path.
pub type Values = BTreeMap<String, SqlValue>;

/// One table write of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStep {
    /// Entity owning the table.
    pub entity: EntityId,
    /// Columns written, as `(column name, property path)`.
    pub columns: Vec<(String, String)>,
    /// Property of the database-generated key this step produces.
    pub generated_key: Option<String>,
    /// Whether the generated key is read back with `RETURNING`.
    pub returning: bool,
}

/// Ordered table writes of one entity insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    entity: String,
    values: Values,
    steps: Vec<InsertStep>,
}

impl InsertPlan {
    /// Values to be written, including generated uuids and the
    /// discriminator.
    #[must_use]
    pub const fn values(&self) -> &Values {
        &self.values
    }

    /// Table writes, root table first.
    #[must_use]
    pub fn steps(&self) -> &[InsertStep] {
        &self.steps
    }

    /// Records a value produced while executing, such as a generated key.
    pub fn set_value(&mut self, property: &str, value: SqlValue) {
        self.values.insert(property.to_string(), value);
    }

    /// Renders step `index` with the values known so far.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn compile(&self, registry: &MetadataRegistry, index: usize) -> Result<CompiledQuery> {
        let dialect = registry.dialect();
        let step = &self.steps[index];
        let entity = registry.get(step.entity);
        let mut writer = SqlWriter::new(dialect);

        let mut names = Vec::with_capacity(step.columns.len());
        let mut placeholders = Vec::with_capacity(step.columns.len());
        for (column, property) in &step.columns {
            let value = self
                .values
                .get(property)
                .cloned()
                .ok_or_else(|| QueryError::MissingPrimaryKey {
                    entity: self.entity.clone(),
                    property: property.clone(),
                })?;
            names.push(dialect.quote_identifier(column));
            placeholders.push(writer.bind(value));
        }

        let table = table_path(dialect, entity);
        let mut sql = if names.is_empty() {
            if dialect.kind().is_mysql_family() {
                format!("INSERT INTO {table} () VALUES ()")
            } else {
                format!("INSERT INTO {table} DEFAULT VALUES")
            }
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                names.join(", "),
                placeholders.join(", ")
            )
        };
        if let (true, Some(key)) = (step.returning, &step.generated_key) {
            let column = entity
                .column(key)
                .map_or_else(|| key.clone(), |c| c.database_name.clone());
            sql.push_str(&format!(" RETURNING {}", dialect.quote_identifier(&column)));
        }
        Ok(writer.finish(sql))
    }
}

/// Builder for entity inserts.
#[derive(Debug, Clone)]
pub struct InsertQuery<'r> {
    registry: &'r MetadataRegistry,
    entity: EntityId,
    values: Values,
}

impl<'r> InsertQuery<'r> {
    /// Starts an insert of `entity`.
    pub fn new(registry: &'r MetadataRegistry, entity: &str) -> Result<Self> {
        let entity = registry
            .find(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?
            .id;
        Ok(Self {
            registry,
            entity,
            values: Values::new(),
        })
    }

    /// Sets one property value. A many-to-one or owning one-to-one property
    /// takes the referenced key.
    #[must_use]
    pub fn value(mut self, property: &str, value: SqlValue) -> Self {
        self.values.insert(property.to_string(), value);
        self
    }

    /// Sets several property values.
    #[must_use]
    pub fn values(mut self, values: Values) -> Self {
        self.values.extend(values);
        self
    }

    /// Plans the table writes.
    pub fn build(&self) -> Result<InsertPlan> {
        let entity = self.registry.get(self.entity);
        let mut values = self.foreign_key_values(entity)?;

        let mut chain: Vec<EntityId> = self.table_chain(entity).iter().map(|e| e.id).collect();
        chain.reverse();

        let returning = self
            .registry
            .dialect()
            .supports_returning(self.registry.capability());
        let mut steps = Vec::with_capacity(chain.len());
        for (position, table_entity) in chain.iter().enumerate() {
            let table = self.registry.get(*table_entity);
            let mut step = InsertStep {
                entity: *table_entity,
                columns: Vec::new(),
                generated_key: None,
                returning: false,
            };
            for column in &table.columns {
                let property = column.property_path.clone();
                if values.contains_key(&property) {
                    step.columns.push((column.database_name.clone(), property));
                } else if column.is_generated_uuid() {
                    values.insert(property.clone(), SqlValue::Text(Uuid::new_v4().to_string()));
                    step.columns.push((column.database_name.clone(), property));
                } else if column.is_discriminator {
                    let discriminator = entity.discriminator_value.clone().unwrap_or_default();
                    values.insert(property.clone(), SqlValue::Text(discriminator));
                    step.columns.push((column.database_name.clone(), property));
                } else if column.is_increment() {
                    step.generated_key = Some(property);
                    step.returning = returning;
                } else if column.primary && position > 0 {
                    // filled from the root row's key
                    step.columns.push((column.database_name.clone(), property));
                } else if column.default.is_none() && !column.nullable {
                    return Err(QueryError::MissingValue {
                        entity: entity.name.clone(),
                        property,
                    });
                }
            }
            steps.push(step);
        }

        debug!(entity = %entity.name, tables = steps.len(), "insert planned");
        Ok(InsertPlan {
            entity: entity.name.clone(),
            values,
            steps,
        })
    }

    /// Rewrites relation properties onto their foreign-key columns and
    /// rejects unknown properties.
    fn foreign_key_values(&self, entity: &EntityMetadata) -> Result<Values> {
        let chain = self.table_chain(entity);
        let unknown = |property: &str| QueryError::UnknownProperty {
            entity: entity.name.clone(),
            property: property.to_string(),
        };
        let mut values = Values::new();
        for (property, value) in &self.values {
            if chain.iter().any(|e| e.column(property).is_some()) {
                values.insert(property.clone(), value.clone());
                continue;
            }
            let (holder, relation) = chain
                .iter()
                .find_map(|e| e.relation(property).map(|r| (*e, r)))
                .filter(|(_, r)| r.has_local_foreign_key())
                .ok_or_else(|| unknown(property))?;
            let [join] = relation.join_columns.as_slice() else {
                return Err(unknown(property));
            };
            let column = holder
                .column_by_name(&join.name)
                .map_or_else(|| join.name.clone(), |c| c.property_path.clone());
            values.insert(column, value.clone());
        }
        Ok(values)
    }

    /// `entity` followed by its class-table ancestors.
    fn table_chain<'e>(&'e self, entity: &'e EntityMetadata) -> Vec<&'e EntityMetadata> {
        let mut chain = vec![entity];
        let mut current = entity;
        while let Some(parent) = current.parent.filter(|_| current.is_class_table_child()) {
            current = self.registry.get(parent);
            chain.push(current);
        }
        chain
    }
}
