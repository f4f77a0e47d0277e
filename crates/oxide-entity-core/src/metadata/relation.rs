//! Relation metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::EntityId;

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// One-to-one.
    OneToOne,
    /// One-to-many (always the inverse side).
    OneToMany,
    /// Many-to-one (always the owning side).
    ManyToOne,
    /// Many-to-many through a junction table.
    ManyToMany,
}

impl RelationKind {
    /// Returns `true` when the relation loads a collection.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Kind expected on the other side of a bidirectional relation.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
        })
    }
}

/// Foreign key action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    /// CASCADE.
    #[serde(alias = "cascade")]
    Cascade,
    /// SET NULL.
    #[serde(alias = "set-null", alias = "SET NULL")]
    SetNull,
    /// SET DEFAULT.
    #[serde(alias = "set-default", alias = "SET DEFAULT")]
    SetDefault,
    /// RESTRICT.
    #[serde(alias = "restrict")]
    Restrict,
    /// NO ACTION.
    #[serde(alias = "no-action", alias = "NO ACTION")]
    NoAction,
}

impl ReferentialAction {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parses an introspected action (`NO ACTION`, `cascade`).
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// One foreign-key column and the column it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinColumn {
    /// Foreign-key column name.
    pub name: String,
    /// Referenced column name.
    pub referenced_column: String,
}

/// Junction table of a many-to-many relation.
///
/// `owner_columns` reference the entity holding the relation and
/// `inverse_columns` reference its target. On the inverse side of a
/// bidirectional relation the two lists are swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionMetadata {
    /// Junction entity.
    pub entity: EntityId,
    /// Junction table name.
    pub table_name: String,
    /// Columns pointing at this side.
    pub owner_columns: Vec<JoinColumn>,
    /// Columns pointing at the target.
    pub inverse_columns: Vec<JoinColumn>,
}

/// A resolved relation.
///
/// For owning many-to-one and one-to-one relations `join_columns` name
/// columns of this entity's table. For inverse one-to-many and one-to-one
/// relations they name columns of the target's table that reference this
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMetadata {
    /// Property name.
    pub property: String,
    /// Cardinality.
    pub kind: RelationKind,
    /// Holds the foreign key or junction.
    pub owning: bool,
    /// Target entity.
    pub target: EntityId,
    /// Property on the target pointing back, if bidirectional.
    pub inverse_property: Option<String>,
    /// Foreign-key columns.
    pub join_columns: Vec<JoinColumn>,
    /// Junction for many-to-many.
    pub junction: Option<JunctionMetadata>,
    /// Loaded automatically by `with_eager_relations`.
    pub eager: bool,
    /// Foreign key may be NULL.
    pub nullable: bool,
    /// ON DELETE action.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    pub on_update: Option<ReferentialAction>,
    /// Entity that declared the relation.
    pub declared_by: EntityId,
}

impl RelationMetadata {
    /// Returns `true` when this side carries foreign-key columns in its own
    /// table.
    #[must_use]
    pub fn has_local_foreign_key(&self) -> bool {
        self.owning && matches!(self.kind, RelationKind::ManyToOne | RelationKind::OneToOne)
    }
}
