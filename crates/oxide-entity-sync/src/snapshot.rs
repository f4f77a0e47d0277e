//! Schema snapshots.
//!
//! A snapshot describes physical tables the way a database reports them.
//! The synchronizer compares two snapshots: the target derived from entity
//! metadata and the current one read back from a connection.

use std::collections::BTreeMap;

use oxide_entity_core::dialect::Dialect;
use oxide_entity_core::metadata::{
    ColumnDefault, EntityMetadata, MetadataRegistry, ReferentialAction,
};
use oxide_entity_core::types::NativeType;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A possibly qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    /// Table name.
    pub name: String,
    /// Schema qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Database qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl TableName {
    /// An unqualified table name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            database: None,
        }
    }

    /// Sets the schema qualifier.
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the database qualifier.
    #[must_use]
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Key of the table within a [`SchemaSnapshot`].
    #[must_use]
    pub fn key(&self) -> String {
        [self.database.as_deref(), self.schema.as_deref(), Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quoted, qualified path for `dialect`.
    #[must_use]
    pub fn path(&self, dialect: &dyn Dialect) -> String {
        dialect.table_path(&self.name, self.schema.as_deref(), self.database.as_deref())
    }

    /// Name of `entity`'s table, keeping only the qualifiers `dialect`
    /// renders.
    #[must_use]
    pub fn of_entity(dialect: &dyn Dialect, entity: &EntityMetadata) -> Self {
        let schema = entity
            .schema
            .as_deref()
            .filter(|s| !dialect.qualifiers(Some(s), None).is_empty());
        let database = entity
            .database
            .as_deref()
            .filter(|d| !dialect.qualifiers(None, Some(d)).is_empty());
        Self {
            name: entity.table_name.clone(),
            schema: schema.map(str::to_string),
            database: database.map(str::to_string),
        }
    }
}

/// Physical column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// Column name.
    pub name: String,
    /// Native type as rendered in DDL, such as `varchar(36)`.
    pub data_type: String,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Rendered default expression.
    #[serde(default)]
    pub default: Option<String>,
    /// Single-column unique constraint.
    #[serde(default)]
    pub unique: bool,
    /// Database-generated increment.
    #[serde(default)]
    pub autoincrement: bool,
    /// Allowed values of an enum column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl ColumnSnapshot {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            unique: false,
            autoincrement: false,
            enum_values: Vec::new(),
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as auto-incremented.
    #[must_use]
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Sets the allowed values of an enum column.
    #[must_use]
    pub fn enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    /// The type parsed into name and modifiers, with the name folded
    /// through `dialect`. Unparsable types are kept whole.
    #[must_use]
    pub fn native_type(&self, dialect: &dyn Dialect) -> NativeType {
        NativeType::parse(&self.data_type).map_or_else(
            |_| NativeType::new(self.data_type.trim().to_ascii_lowercase()),
            |mut native| {
                native.name = dialect.normalize_type_name(&native.name);
                native
            },
        )
    }
}

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Unique index.
    #[serde(default)]
    pub unique: bool,
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    /// Constraint name; SQLite does not report one.
    #[serde(default)]
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: TableName,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeySnapshot {
    /// Whether both constraints enforce the same reference. Names are not
    /// compared and a missing action equals `NO ACTION`.
    #[must_use]
    pub fn same_reference(&self, other: &Self) -> bool {
        let action = |a: Option<ReferentialAction>| a.filter(|a| *a != ReferentialAction::NoAction);
        self.columns == other.columns
            && self.referenced_table.key() == other.referenced_table.key()
            && self.referenced_columns == other.referenced_columns
            && action(self.on_delete) == action(other.on_delete)
            && action(self.on_update) == action(other.on_update)
    }
}

/// Complete definition of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Qualified table name.
    pub name: TableName,
    /// Columns, in table order.
    pub columns: Vec<ColumnSnapshot>,
    /// Primary key columns.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
}

impl TableSnapshot {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSnapshot) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSnapshot) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeySnapshot) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `column` is part of the primary key.
    #[must_use]
    pub fn is_primary(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    fn from_entity(registry: &MetadataRegistry, entity: &EntityMetadata) -> Self {
        let dialect = registry.dialect();
        let name = TableName::of_entity(dialect, entity);
        let mut table = Self::new(name.clone());
        for column in &entity.columns {
            let mut snapshot = ColumnSnapshot::new(&column.database_name, column.native.to_sql());
            if !column.nullable || column.primary {
                snapshot = snapshot.not_null();
            }
            snapshot.default = column.default.as_ref().map(|d| render_default(dialect, d));
            snapshot.unique = column.unique && !column.primary;
            snapshot.autoincrement = column.is_increment();
            snapshot.enum_values.clone_from(&column.enum_values);
            if column.primary {
                table.primary_key.push(column.database_name.clone());
            }
            table.columns.push(snapshot);
        }
        table.indexes = entity
            .indices
            .iter()
            .map(|index| IndexSnapshot {
                name: index.name.clone(),
                columns: index.columns.clone(),
                unique: index.unique,
            })
            .collect();
        table.foreign_keys = entity
            .foreign_keys
            .iter()
            .map(|fk| ForeignKeySnapshot {
                name: Some(foreign_key_name(&entity.table_name, &fk.columns)),
                columns: fk.columns.clone(),
                referenced_table: TableName::of_entity(dialect, registry.get(fk.referenced_entity)),
                referenced_columns: fk.referenced_columns.clone(),
                on_delete: fk.on_delete,
                on_update: fk.on_update,
            })
            .collect();
        table
    }
}

/// Every table of a database.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Tables keyed by [`TableName::key`].
    pub tables: BTreeMap<String, TableSnapshot>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn add_table(&mut self, table: TableSnapshot) {
        self.tables.insert(table.name.key(), table);
    }

    /// Adds a table, builder style.
    #[must_use]
    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.add_table(table);
        self
    }

    /// Table by key.
    #[must_use]
    pub fn table(&self, key: &str) -> Option<&TableSnapshot> {
        self.tables.get(key)
    }

    /// The tables entity metadata expects.
    ///
    /// Single-table children share their root's table, abstract entities
    /// have none and junction tables are included.
    #[must_use]
    pub fn from_metadata(registry: &MetadataRegistry) -> Self {
        registry
            .tables()
            .map(|entity| TableSnapshot::from_entity(registry, entity))
            .fold(Self::new(), Self::with_table)
    }

    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot written by [`SchemaSnapshot::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Name given to a foreign key derived from metadata.
#[must_use]
pub fn foreign_key_name(table: &str, columns: &[String]) -> String {
    format!("FK_{table}_{}", columns.join("_"))
}

/// Renders a column default for `dialect`.
#[must_use]
pub fn render_default(dialect: &dyn Dialect, default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Value(value) => dialect.format_literal(value),
        ColumnDefault::Expression(expression) => expression.clone(),
        ColumnDefault::CurrentTimestamp => dialect.current_timestamp().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_entity_core::dialect::{dialect_for, DialectKind};

    #[test]
    fn table_keys_follow_qualifiers() {
        assert_eq!(TableName::new("user").key(), "user");
        assert_eq!(
            TableName::new("user").in_schema("app").in_database("main").key(),
            "main.app.user"
        );
    }

    #[test]
    fn native_types_are_normalized() {
        let mysql = dialect_for(DialectKind::MySql);
        let column = ColumnSnapshot::new("flag", "BOOLEAN");
        assert_eq!(column.native_type(mysql).name, "tinyint");

        let sqlite = dialect_for(DialectKind::Sqlite);
        let column = ColumnSnapshot::new("id", "INT");
        assert_eq!(column.native_type(sqlite), NativeType::new("integer"));
        let column = ColumnSnapshot::new("ip", "VARCHAR(45)");
        assert_eq!(column.native_type(sqlite).to_sql(), "varchar(45)");
    }

    #[test]
    fn foreign_keys_compare_without_names() {
        let ours = ForeignKeySnapshot {
            name: Some("FK_post_author_id".into()),
            columns: vec!["author_id".into()],
            referenced_table: TableName::new("user"),
            referenced_columns: vec!["id".into()],
            on_delete: None,
            on_update: None,
        };
        let introspected = ForeignKeySnapshot {
            name: None,
            on_delete: Some(ReferentialAction::NoAction),
            on_update: Some(ReferentialAction::NoAction),
            ..ours.clone()
        };
        assert!(ours.same_reference(&introspected));

        let cascading = ForeignKeySnapshot {
            on_delete: Some(ReferentialAction::Cascade),
            ..ours.clone()
        };
        assert!(!ours.same_reference(&cascading));
    }

    #[test]
    fn json_round_trip() {
        let snapshot = SchemaSnapshot::new().with_table(
            TableSnapshot::new(TableName::new("tag"))
                .column(ColumnSnapshot::new("id", "integer").not_null().autoincrement())
                .column(ColumnSnapshot::new("name", "varchar(64)").unique())
                .primary_key(["id"]),
        );
        let json = snapshot.to_json().unwrap();
        assert_eq!(SchemaSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
