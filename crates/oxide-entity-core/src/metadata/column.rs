//! Column metadata.

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::types::{ColumnType, GenerationStrategy, NativeType};
use crate::value::SqlValue;

/// Modifiers requested by a descriptor, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeModifiers {
    /// Requested length.
    pub length: Option<u32>,
    /// Requested precision.
    pub precision: Option<u32>,
    /// Requested scale.
    pub scale: Option<u32>,
}

impl TypeModifiers {
    /// Returns `true` when no modifier was requested.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length.is_none() && self.precision.is_none() && self.scale.is_none()
    }
}

/// Column default.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// A literal, rendered through the dialect.
    Value(SqlValue),
    /// A raw SQL expression, passed through verbatim.
    Expression(String),
    /// The dialect's current-timestamp expression.
    CurrentTimestamp,
}

/// A resolved column of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    /// Property path on the entity (`address.city` for embedded columns).
    pub property_path: String,
    /// Column name in the table.
    pub database_name: String,
    /// Abstract type.
    pub column_type: ColumnType,
    /// Modifiers as requested.
    pub requested: TypeModifiers,
    /// Native type after mapping and requested modifiers.
    pub native: NativeType,
    /// Why the native type is a substitute, when it is one.
    pub fallback: Option<String>,
    /// Accepts NULL.
    pub nullable: bool,
    /// Default value.
    pub default: Option<ColumnDefault>,
    /// Value generation.
    pub generation: Option<GenerationStrategy>,
    /// Part of the primary key.
    pub primary: bool,
    /// Single-column unique constraint.
    pub unique: bool,
    /// Allowed values of an enum column.
    pub enum_values: Vec<String>,
    /// Embedded property this column was flattened from.
    pub embedded_path: Option<String>,
    /// Relation property this foreign-key column belongs to.
    pub relation: Option<String>,
    /// Discriminator column of a single-table hierarchy.
    pub is_discriminator: bool,
    /// Copied from an ancestor entity.
    pub is_inherited: bool,
    /// Entity that declared the column.
    pub declared_by: EntityId,
}

impl ColumnMetadata {
    /// Returns `true` for database-generated auto-increment columns.
    #[must_use]
    pub fn is_increment(&self) -> bool {
        self.generation == Some(GenerationStrategy::Increment)
    }

    /// Returns `true` for application-generated uuid columns.
    #[must_use]
    pub fn is_generated_uuid(&self) -> bool {
        self.generation == Some(GenerationStrategy::Uuid)
    }

    /// Path segments of the property path.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.property_path.split('.')
    }

    /// Result label fragment for this column (`address.city` becomes
    /// `address_city`).
    #[must_use]
    pub fn label_fragment(&self) -> String {
        self.property_path.replace('.', "_")
    }
}
