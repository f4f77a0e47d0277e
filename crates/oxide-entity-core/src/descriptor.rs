//! Declarative entity descriptors.
//!
//! Descriptors are plain configuration: they can be written with the fluent
//! constructors below or loaded from JSON. They are permissive on purpose;
//! every semantic check happens in the builder and the validator, so a
//! descriptor carrying e.g. a length on a uuid column parses fine and is
//! rejected later by [`MetadataValidator`](crate::validator::MetadataValidator).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::BuildError;
use crate::metadata::{InheritanceStrategy, ReferentialAction, RelationKind};
use crate::types::{ColumnType, GenerationStrategy};

/// Description of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDescriptor {
    /// Unique entity name.
    pub name: String,
    /// Table name; defaults to the snake-cased entity name.
    pub table: Option<String>,
    /// Database (catalog) name.
    pub database: Option<String>,
    /// Schema name.
    pub schema: Option<String>,
    /// Scalar columns.
    pub columns: Vec<ColumnDescriptor>,
    /// Relations.
    pub relations: Vec<RelationDescriptor>,
    /// Embedded column groups.
    pub embedded: Vec<EmbeddedDescriptor>,
    /// Inheritance linkage.
    pub inheritance: Option<InheritanceDescriptor>,
    /// Abstract entity without a table.
    #[serde(rename = "abstract")]
    pub abstract_entity: bool,
    /// Indices.
    pub indices: Vec<IndexDescriptor>,
    /// Multi-column unique constraints, by property.
    pub uniques: Vec<Vec<String>>,
}

impl EntityDescriptor {
    /// Starts a descriptor for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the schema name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a relation.
    #[must_use]
    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    /// Adds an embedded column group.
    #[must_use]
    pub fn embedded(mut self, embedded: EmbeddedDescriptor) -> Self {
        self.embedded.push(embedded);
        self
    }

    /// Makes this entity the root of a hierarchy laid out with `strategy`.
    #[must_use]
    pub fn inheritance_root(mut self, strategy: InheritanceStrategy) -> Self {
        self.inheritance_mut().strategy = Some(strategy);
        self
    }

    /// Makes this entity a child of `parent`.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.inheritance_mut().parent = Some(parent.into());
        self
    }

    /// Sets the discriminator column of a single-table root.
    #[must_use]
    pub fn discriminator_column(mut self, column: impl Into<String>) -> Self {
        self.inheritance_mut().discriminator_column = Some(column.into());
        self
    }

    /// Sets the discriminator value of a single-table entity.
    #[must_use]
    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.inheritance_mut().discriminator_value = Some(value.into());
        self
    }

    /// Marks the entity abstract.
    #[must_use]
    pub const fn abstract_entity(mut self) -> Self {
        self.abstract_entity = true;
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indices.push(index);
        self
    }

    /// Adds a multi-column unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniques
            .push(properties.into_iter().map(Into::into).collect());
        self
    }

    fn inheritance_mut(&mut self) -> &mut InheritanceDescriptor {
        self.inheritance.get_or_insert_with(InheritanceDescriptor::default)
    }
}

/// Default value of a column in configuration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultDescriptor {
    /// A literal value.
    Value(JsonValue),
    /// A raw SQL expression.
    Expression(String),
    /// The current timestamp.
    CurrentTimestamp,
}

/// Description of one scalar column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Property name.
    pub property: String,
    /// Column name; defaults to the property.
    #[serde(default)]
    pub name: Option<String>,
    /// Abstract type name (`uuid`, `varchar`, `int`, ...).
    #[serde(rename = "type")]
    pub column_type: String,
    /// Length modifier.
    #[serde(default)]
    pub length: Option<u32>,
    /// Precision modifier.
    #[serde(default)]
    pub precision: Option<u32>,
    /// Scale modifier.
    #[serde(default)]
    pub scale: Option<u32>,
    /// Accepts NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Default value.
    #[serde(default)]
    pub default: Option<DefaultDescriptor>,
    /// Part of the primary key.
    #[serde(default)]
    pub primary: bool,
    /// Value generation.
    #[serde(default)]
    pub generated: Option<GenerationStrategy>,
    /// Unique column.
    #[serde(default)]
    pub unique: bool,
    /// Allowed values of an enum column.
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<String>,
    /// Explicit native type, bypassing the type mapper.
    #[serde(default)]
    pub native_type: Option<String>,
}

impl ColumnDescriptor {
    /// A non-null column of the given abstract type.
    #[must_use]
    pub fn new(property: impl Into<String>, column_type: ColumnType) -> Self {
        Self::named_type(property, column_type.as_str())
    }

    /// A column whose type is given by name, resolved at build time.
    #[must_use]
    pub fn named_type(property: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            name: None,
            column_type: type_name.into(),
            length: None,
            precision: None,
            scale: None,
            nullable: false,
            default: None,
            primary: false,
            generated: None,
            unique: false,
            enum_values: Vec::new(),
            native_type: None,
        }
    }

    /// An auto-increment integer primary key.
    #[must_use]
    pub fn increment_primary(property: impl Into<String>) -> Self {
        Self::new(property, ColumnType::Integer)
            .primary()
            .generated(GenerationStrategy::Increment)
    }

    /// A uuid primary key generated before insert.
    #[must_use]
    pub fn uuid_primary(property: impl Into<String>) -> Self {
        Self::new(property, ColumnType::Uuid)
            .primary()
            .generated(GenerationStrategy::Uuid)
    }

    /// Sets the column name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the length modifier.
    #[must_use]
    pub const fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub const fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    /// Allows NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets a literal default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<JsonValue>) -> Self {
        self.default = Some(DefaultDescriptor::Value(value.into()));
        self
    }

    /// Sets a raw SQL default expression.
    #[must_use]
    pub fn default_expression(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(DefaultDescriptor::Expression(expression.into()));
        self
    }

    /// Defaults to the current timestamp.
    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultDescriptor::CurrentTimestamp);
        self
    }

    /// Marks the column part of the primary key.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Sets the generation strategy.
    #[must_use]
    pub const fn generated(mut self, strategy: GenerationStrategy) -> Self {
        self.generated = Some(strategy);
        self
    }

    /// Marks the column unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets enum values.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the native type.
    #[must_use]
    pub fn native_type(mut self, native: impl Into<String>) -> Self {
        self.native_type = Some(native.into());
        self
    }
}

/// Explicit foreign-key column of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumnDescriptor {
    /// Column name; defaults to `{property}_{referenced}`.
    #[serde(default)]
    pub name: Option<String>,
    /// Referenced column; defaults to the target's single primary key.
    #[serde(default)]
    pub referenced_column: Option<String>,
}

/// Explicit junction table of a many-to-many relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinTableDescriptor {
    /// Table name.
    pub name: Option<String>,
    /// Columns referencing the owner.
    pub join_columns: Vec<JoinColumnDescriptor>,
    /// Columns referencing the target.
    pub inverse_join_columns: Vec<JoinColumnDescriptor>,
}

/// Description of one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Property name.
    pub property: String,
    /// Cardinality.
    pub kind: RelationKind,
    /// Target entity name.
    pub target: String,
    /// Property on the target pointing back.
    #[serde(default)]
    pub inverse_side: Option<String>,
    /// Explicit foreign-key columns (marks a one-to-one as owning).
    #[serde(default)]
    pub join_columns: Vec<JoinColumnDescriptor>,
    /// Explicit junction (marks a many-to-many as owning).
    #[serde(default)]
    pub join_table: Option<JoinTableDescriptor>,
    /// Explicitly the owning side.
    #[serde(default)]
    pub owner: bool,
    /// Loaded eagerly.
    #[serde(default)]
    pub eager: bool,
    /// Foreign key may be NULL.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

const fn default_true() -> bool {
    true
}

impl RelationDescriptor {
    fn new(property: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            kind,
            target: target.into(),
            inverse_side: None,
            join_columns: Vec::new(),
            join_table: None,
            owner: false,
            eager: false,
            nullable: true,
            on_delete: None,
            on_update: None,
        }
    }

    /// A many-to-one relation (owning).
    #[must_use]
    pub fn many_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToOne, target)
    }

    /// A one-to-many relation; `inverse_side` names the many-to-one on the
    /// target.
    #[must_use]
    pub fn one_to_many(
        property: impl Into<String>,
        target: impl Into<String>,
        inverse_side: impl Into<String>,
    ) -> Self {
        Self::new(property, RelationKind::OneToMany, target).inverse_side(inverse_side)
    }

    /// A one-to-one relation.
    #[must_use]
    pub fn one_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::OneToOne, target)
    }

    /// A many-to-many relation.
    #[must_use]
    pub fn many_to_many(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToMany, target)
    }

    /// Sets the inverse side property.
    #[must_use]
    pub fn inverse_side(mut self, inverse: impl Into<String>) -> Self {
        self.inverse_side = Some(inverse.into());
        self
    }

    /// Adds an explicit join column.
    #[must_use]
    pub fn join_column(mut self, name: impl Into<String>, referenced: impl Into<String>) -> Self {
        self.join_columns.push(JoinColumnDescriptor {
            name: Some(name.into()),
            referenced_column: Some(referenced.into()),
        });
        self
    }

    /// Sets the junction table.
    #[must_use]
    pub fn join_table(mut self, join_table: JoinTableDescriptor) -> Self {
        self.join_table = Some(join_table);
        self
    }

    /// Marks this side as the owner.
    #[must_use]
    pub const fn owner(mut self) -> Self {
        self.owner = true;
        self
    }

    /// Loads the relation eagerly.
    #[must_use]
    pub const fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Forbids NULL foreign keys.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Returns `true` when this side is declared as the owner.
    #[must_use]
    pub fn is_owning(&self) -> bool {
        match self.kind {
            RelationKind::ManyToOne => true,
            RelationKind::OneToMany => false,
            RelationKind::OneToOne => {
                self.owner || !self.join_columns.is_empty() || self.inverse_side.is_none()
            }
            RelationKind::ManyToMany => {
                self.owner || self.join_table.is_some() || self.inverse_side.is_none()
            }
        }
    }
}

/// A group of columns flattened into the owning table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDescriptor {
    /// Property holding the embedded value.
    pub property: String,
    /// Column name prefix; defaults to the property, empty for none.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Embedded columns.
    pub columns: Vec<ColumnDescriptor>,
}

impl EmbeddedDescriptor {
    /// Starts an embedded group for `property`.
    #[must_use]
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            prefix: None,
            columns: Vec::new(),
        }
    }

    /// Sets the column prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }
}

/// Inheritance linkage of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InheritanceDescriptor {
    /// Layout strategy; declared on the root.
    pub strategy: Option<InheritanceStrategy>,
    /// Parent entity name.
    pub parent: Option<String>,
    /// Discriminator column name (single-table roots).
    pub discriminator_column: Option<String>,
    /// Discriminator value (single-table entities).
    pub discriminator_value: Option<String>,
}

/// An index over entity properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexDescriptor {
    /// Index name; generated when absent.
    pub name: Option<String>,
    /// Properties (or column names) in index order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
}

impl IndexDescriptor {
    /// An index over `columns`.
    #[must_use]
    pub fn on<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Loads a JSON array of entity descriptors.
pub fn load_descriptors_from_json(json: &str) -> Result<Vec<EntityDescriptor>, BuildError> {
    Ok(serde_json::from_str(json)?)
}
