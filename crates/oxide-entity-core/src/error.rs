//! Error types for metadata construction and validation.

use core::fmt;

use thiserror::Error;

use crate::dialect::{DatabaseVersion, DialectKind};
use crate::types::ColumnType;

/// A type name that is not part of the abstract type set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized type: {0}")]
pub struct ParseTypeError(pub String);

/// A version string without any numeric component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid database version: {0}")]
pub struct ParseVersionError(pub String);

/// A type/dialect/version combination without a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column type `{column_type}` is not supported by {dialect}: {reason}")]
pub struct UnsupportedType {
    /// The abstract type requested.
    pub column_type: ColumnType,
    /// Target dialect.
    pub dialect: DialectKind,
    /// Database version the check ran against.
    pub version: Option<DatabaseVersion>,
    /// Human readable explanation.
    pub reason: String,
}

/// Errors raised while turning descriptors into metadata.
///
/// Every variant names the entity and, where relevant, the field at fault.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two descriptors share an entity name.
    #[error("entity `{entity}` is declared more than once")]
    DuplicateEntity {
        /// Entity name.
        entity: String,
    },

    /// A column names a type outside the abstract set.
    #[error("entity `{entity}`, column `{property}`: unknown column type `{type_name}`")]
    UnknownColumnType {
        /// Entity name.
        entity: String,
        /// Column property.
        property: String,
        /// The rejected type name.
        type_name: String,
    },

    /// The type mapper refused the column type.
    #[error("entity `{entity}`, column `{property}`: {source}")]
    UnsupportedType {
        /// Entity name.
        entity: String,
        /// Column property.
        property: String,
        /// Mapper error.
        #[source]
        source: UnsupportedType,
    },

    /// An explicit native type override could not be parsed.
    #[error("entity `{entity}`, column `{property}`: invalid native type `{native}`")]
    InvalidNativeType {
        /// Entity name.
        entity: String,
        /// Column property.
        property: String,
        /// The override as written.
        native: String,
    },

    /// Inheritance parent is not among the descriptors.
    #[error("entity `{entity}`: parent `{parent}` not found")]
    UnknownParent {
        /// Entity name.
        entity: String,
        /// Missing parent name.
        parent: String,
    },

    /// The inheritance chain loops back onto itself.
    #[error("entity `{entity}`: inheritance cycle")]
    InheritanceCycle {
        /// Entity name.
        entity: String,
    },

    /// Inconsistent inheritance declaration.
    #[error("entity `{entity}`: invalid inheritance: {reason}")]
    InvalidInheritance {
        /// Entity name.
        entity: String,
        /// What is wrong.
        reason: String,
    },

    /// Two single-table entities claim the same discriminator value.
    #[error("entity `{entity}`: discriminator value `{value}` already used by `{other}`")]
    DuplicateDiscriminator {
        /// Entity name.
        entity: String,
        /// Clashing value.
        value: String,
        /// Entity that already uses it.
        other: String,
    },

    /// Relation target is not among the descriptors.
    #[error("entity `{entity}`, relation `{property}`: target `{target}` not found")]
    UnknownRelationTarget {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Missing target name.
        target: String,
    },

    /// Relation target is abstract and owns no table.
    #[error("entity `{entity}`, relation `{property}`: target `{target}` is abstract")]
    AbstractRelationTarget {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Abstract target name.
        target: String,
    },

    /// Inverse side property missing on the target.
    #[error("entity `{entity}`, relation `{property}`: inverse side `{target}.{inverse}` not found")]
    UnknownInverseSide {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Missing inverse property.
        inverse: String,
    },

    /// Both sides of a relation are declared inverse.
    #[error("entity `{entity}`, relation `{property}`: neither side owns the relation")]
    NoOwningSide {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
    },

    /// Inverse and owning side kinds do not pair up.
    #[error("entity `{entity}`, relation `{property}`: kind does not match inverse side `{inverse}`")]
    RelationKindMismatch {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Inverse property on the target.
        inverse: String,
    },

    /// A join column references a column absent from the target.
    #[error("entity `{entity}`, relation `{property}`: referenced column `{column}` not found")]
    UnresolvedJoinColumn {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Missing referenced column.
        column: String,
    },

    /// Relation target has no primary key to reference.
    #[error("entity `{entity}`, relation `{property}`: target `{target}` has no primary key")]
    MissingPrimaryKeyForRelation {
        /// Entity name.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
    },

    /// An index refers to an unknown property.
    #[error("entity `{entity}`, index `{index}`: unknown column `{column}`")]
    UnknownIndexColumn {
        /// Entity name.
        entity: String,
        /// Index name.
        index: String,
        /// Missing column.
        column: String,
    },

    /// Descriptor configuration could not be parsed.
    #[error("invalid descriptor configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single semantic rule violation found by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A length modifier on a native type without length support.
    #[error("entity `{entity}`, column `{column}`: type `{native_type}` does not accept a length")]
    LengthNotSupported {
        /// Entity name.
        entity: String,
        /// Column property.
        column: String,
        /// Resolved native type name.
        native_type: String,
    },

    /// A precision or scale modifier on a native type without support.
    #[error("entity `{entity}`, column `{column}`: type `{native_type}` does not accept a {modifier}")]
    PrecisionNotSupported {
        /// Entity name.
        entity: String,
        /// Column property.
        column: String,
        /// Resolved native type name.
        native_type: String,
        /// `precision` or `scale`.
        modifier: &'static str,
    },

    /// A single-table child declares a table option different from its root.
    #[error(
        "entity `{entity}`: {option} `{}` differs from `{}` inherited from `{root}`",
        .found.as_deref().unwrap_or("<none>"),
        .expected.as_deref().unwrap_or("<none>")
    )]
    InheritedOptionMismatch {
        /// Entity name.
        entity: String,
        /// Inheritance root.
        root: String,
        /// `database` or `schema`.
        option: &'static str,
        /// Value on the root.
        expected: Option<String>,
        /// Value on the child.
        found: Option<String>,
    },

    /// Foreign-key column count differs from the referenced key.
    #[error("entity `{entity}`, relation `{relation}`: {found} join column(s) for a {expected}-column primary key")]
    JoinColumnCountMismatch {
        /// Entity name.
        entity: String,
        /// Relation property.
        relation: String,
        /// Referenced primary-key column count.
        expected: usize,
        /// Join column count.
        found: usize,
    },

    /// Two columns map to the same name in one table.
    #[error("entity `{entity}`: column `{column}` appears more than once in table `{table}`")]
    DuplicateColumn {
        /// Entity name.
        entity: String,
        /// Table name.
        table: String,
        /// Duplicated column name.
        column: String,
    },

    /// A concrete entity without primary key.
    #[error("entity `{entity}`: no primary column")]
    MissingPrimaryKey {
        /// Entity name.
        entity: String,
    },

    /// Enum column declared without values.
    #[error("entity `{entity}`, column `{column}`: enum without values")]
    EnumWithoutValues {
        /// Entity name.
        entity: String,
        /// Column property.
        column: String,
    },

    /// More than one auto-increment column in a table.
    #[error("entity `{entity}`: table `{table}` has more than one increment column")]
    MultipleGeneratedColumns {
        /// Entity name.
        entity: String,
        /// Table name.
        table: String,
    },

    /// Both relation sides are eager.
    #[error("entity `{entity}`, relation `{relation}`: eager on both sides (with `{target}.{inverse}`)")]
    EagerBothSides {
        /// Entity name.
        entity: String,
        /// Relation property.
        relation: String,
        /// Target entity.
        target: String,
        /// Inverse property.
        inverse: String,
    },

    /// `ON DELETE SET NULL` on a relation that may not be null.
    #[error("entity `{entity}`, relation `{relation}`: SET NULL on a non-nullable relation")]
    SetNullOnNonNullable {
        /// Entity name.
        entity: String,
        /// Relation property.
        relation: String,
    },

    /// Generation strategy incompatible with the column.
    #[error("entity `{entity}`, column `{column}`: {reason}")]
    InvalidGeneration {
        /// Entity name.
        entity: String,
        /// Column property.
        column: String,
        /// What is wrong.
        reason: String,
    },
}

impl ValidationError {
    /// Short name of the violated rule.
    #[must_use]
    pub const fn rule(&self) -> &'static str {
        match self {
            Self::LengthNotSupported { .. } => "length-not-supported",
            Self::PrecisionNotSupported { .. } => "precision-not-supported",
            Self::InheritedOptionMismatch { .. } => "inherited-option-mismatch",
            Self::JoinColumnCountMismatch { .. } => "join-column-count",
            Self::DuplicateColumn { .. } => "duplicate-column",
            Self::MissingPrimaryKey { .. } => "missing-primary-key",
            Self::EnumWithoutValues { .. } => "enum-without-values",
            Self::MultipleGeneratedColumns { .. } => "multiple-generated-columns",
            Self::EagerBothSides { .. } => "eager-both-sides",
            Self::SetNullOnNonNullable { .. } => "set-null-on-non-nullable",
            Self::InvalidGeneration { .. } => "invalid-generation",
        }
    }

    /// Entity the violation was found on.
    #[must_use]
    pub fn entity(&self) -> &str {
        match self {
            Self::LengthNotSupported { entity, .. }
            | Self::PrecisionNotSupported { entity, .. }
            | Self::InheritedOptionMismatch { entity, .. }
            | Self::JoinColumnCountMismatch { entity, .. }
            | Self::DuplicateColumn { entity, .. }
            | Self::MissingPrimaryKey { entity }
            | Self::EnumWithoutValues { entity, .. }
            | Self::MultipleGeneratedColumns { entity, .. }
            | Self::EagerBothSides { entity, .. }
            | Self::SetNullOnNonNullable { entity, .. }
            | Self::InvalidGeneration { entity, .. } => entity,
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// The first violation, for fail-fast callers.
    #[must_use]
    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    /// Consumes the set, keeping the first violation.
    #[must_use]
    pub fn into_first(self) -> Option<ValidationError> {
        self.0.into_iter().next()
    }

    /// Number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no violation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the violations.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - [{}] {error}", error.rule())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Any failure of the build + validate pipeline.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Descriptor could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Built metadata violates one or more rules.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Type mapping failed outside of a column context.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedType),
}

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
