//! Entity metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{ColumnMetadata, ReferentialAction, RelationMetadata};

/// Index of an entity in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Position in the registry.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an inheritance hierarchy is laid out in tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InheritanceStrategy {
    /// One table for the whole hierarchy, rows told apart by a discriminator.
    #[serde(alias = "sti", alias = "single_table")]
    SingleTable,
    /// One table per entity; children join their parent by primary key.
    #[serde(alias = "joined", alias = "class_table")]
    ClassTable,
    /// One table per concrete entity holding every inherited column.
    #[serde(alias = "concrete", alias = "table_per_class")]
    TablePerClass,
}

/// Physical role of an entity's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    /// Owns its table.
    Regular,
    /// Shares the table of its single-table root.
    StiChild,
    /// Generated many-to-many junction.
    Junction,
}

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexMetadata {
    /// Index name.
    pub name: String,
    /// Column names, in index order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
}

/// A foreign key held by an entity's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyMetadata {
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced entity.
    pub referenced_entity: super::EntityId,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    pub on_update: Option<ReferentialAction>,
}

/// A resolved entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    /// Registry index.
    pub id: EntityId,
    /// Entity name.
    pub name: String,
    /// Table name (the root's table for single-table children).
    pub table_name: String,
    /// Database (catalog) name.
    pub database: Option<String>,
    /// Schema name.
    pub schema: Option<String>,
    /// Physical role of the table.
    pub table_type: TableType,
    /// Strategy of the hierarchy the entity belongs to.
    pub inheritance: Option<InheritanceStrategy>,
    /// Direct parent.
    pub parent: Option<EntityId>,
    /// Hierarchy root (the entity itself when it has no parent).
    pub root: EntityId,
    /// Direct children.
    pub children: Vec<EntityId>,
    /// Discriminator column name of a single-table hierarchy.
    pub discriminator_column: Option<String>,
    /// Discriminator value identifying this entity's rows.
    pub discriminator_value: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnMetadata>,
    /// Relations in declaration order.
    pub relations: Vec<RelationMetadata>,
    /// Indices on the table.
    pub indices: Vec<IndexMetadata>,
    /// Foreign keys held by the table.
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    /// Generated many-to-many junction.
    pub is_junction: bool,
    /// Abstract entity without a table of its own.
    pub is_abstract: bool,
}

impl EntityMetadata {
    /// Primary-key columns in declaration order.
    pub fn primary_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.primary)
    }

    /// Number of primary-key columns.
    #[must_use]
    pub fn primary_key_count(&self) -> usize {
        self.primary_columns().count()
    }

    /// Finds a column by property path.
    #[must_use]
    pub fn column(&self, property_path: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.property_path == property_path)
    }

    /// Finds a column by its database name.
    #[must_use]
    pub fn column_by_name(&self, database_name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.database_name == database_name)
    }

    /// Finds a relation by property.
    #[must_use]
    pub fn relation(&self, property: &str) -> Option<&RelationMetadata> {
        self.relations.iter().find(|r| r.property == property)
    }

    /// The discriminator column, if any.
    #[must_use]
    pub fn discriminator(&self) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.is_discriminator)
    }

    /// Returns `true` when the entity owns a physical table. An abstract
    /// single-table root still owns the shared table.
    #[must_use]
    pub fn has_own_table(&self) -> bool {
        match self.table_type {
            TableType::StiChild => false,
            TableType::Junction => true,
            TableType::Regular => {
                !self.is_abstract || self.inheritance == Some(InheritanceStrategy::SingleTable)
            }
        }
    }

    /// Returns `true` for children of a class-table hierarchy.
    #[must_use]
    pub fn is_class_table_child(&self) -> bool {
        self.parent.is_some() && self.inheritance == Some(InheritanceStrategy::ClassTable)
    }
}
