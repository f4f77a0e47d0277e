//! Diffing a current schema against the schema metadata expects.
//!
//! The diff is purely structural: it never reads rows. Changes that cannot
//! keep existing data are reported as [`DataLossWarning`]s and a plan
//! carrying warnings must be acknowledged before it is applied.

use core::fmt;
use std::collections::{HashMap, HashSet};

use oxide_entity_core::dialect::{AlterColumnStyle, Dialect};
use oxide_entity_core::types::{NativeType, TypeLength};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ddl::DdlRenderer;
use crate::error::{Result, SyncError};
use crate::operations::{ColumnChange, Operation};
use crate::snapshot::{ColumnSnapshot, SchemaSnapshot, TableSnapshot};

/// A planned change that discards stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLossWarning {
    /// Table key.
    pub table: String,
    /// Column, when a single column is affected.
    pub column: Option<String>,
    /// What happens to the data.
    pub reason: String,
}

impl fmt::Display for DataLossWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{column}: {}", self.table, self.reason),
            None => write!(f, "{}: {}", self.table, self.reason),
        }
    }
}

/// Ordered operations and statements bringing a database to its target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncPlan {
    /// Schema operations, in execution order.
    pub operations: Vec<Operation>,
    /// Rendered DDL, in execution order.
    pub statements: Vec<String>,
    /// Changes that discard data.
    pub warnings: Vec<DataLossWarning>,
    acknowledged: bool,
}

impl SyncPlan {
    /// Returns `true` when the database already matches its target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Accepts the data loss the plan reports.
    pub fn acknowledge_data_loss(&mut self) {
        self.acknowledged = true;
    }

    /// Whether the plan may be applied as is.
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged || self.warnings.is_empty()
    }

    /// Refuses a plan whose data loss was not acknowledged.
    pub fn ensure_acknowledged(&self) -> Result<()> {
        if self.is_acknowledged() {
            Ok(())
        } else {
            Err(SyncError::SynchronizationDataLossWarning(self.warnings.clone()))
        }
    }
}

/// Coarse type groups; moving a column between groups rewrites its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeFamily {
    Integer,
    Numeric,
    Text,
    Temporal,
    Binary,
    Boolean,
    Json,
    Other(String),
}

impl TypeFamily {
    pub(crate) fn of(name: &str) -> Self {
        match name {
            "tinyint" | "smallint" | "mediumint" | "integer" | "int" | "bigint" | "int2" | "int4"
            | "int8" | "serial" | "bigserial" | "smallserial" | "int64" => Self::Integer,
            "decimal" | "numeric" | "number" | "real" | "float" | "float4" | "float8" | "double"
            | "double precision" | "float64" | "smalldecimal" => Self::Numeric,
            "char" | "varchar" | "nchar" | "nvarchar" | "varchar2" | "nvarchar2" | "text"
            | "tinytext" | "mediumtext" | "longtext" | "ntext" | "clob" | "nclob" | "string"
            | "uuid" | "uniqueidentifier" | "inet" | "inet4" | "inet6" | "enum" | "alphanum"
            | "shorttext" => Self::Text,
            "date" | "time" | "datetime" | "datetime2" | "datetimeoffset" | "timestamp"
            | "timestamptz" | "seconddate" | "smalldatetime" => Self::Temporal,
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" | "binary" | "varbinary"
            | "bytes" | "raw" | "image" => Self::Binary,
            "boolean" | "bool" | "bit" => Self::Boolean,
            "json" | "jsonb" => Self::Json,
            other => Self::Other(other.to_string()),
        }
    }

    /// Literal standing in for a missing value of a required column.
    pub(crate) const fn zero_literal(&self) -> &'static str {
        match self {
            Self::Integer | Self::Numeric | Self::Boolean => "0",
            Self::Binary => "X''",
            Self::Text | Self::Temporal | Self::Json | Self::Other(_) => "''",
        }
    }
}

/// Plans the changes between two snapshots.
#[derive(Debug, Clone, Copy)]
pub struct SchemaSynchronizer<'d> {
    dialect: &'d dyn Dialect,
}

/// Operations grouped by execution phase.
#[derive(Debug, Default)]
struct Phases {
    drop_foreign_keys: Vec<Operation>,
    drop_indexes: Vec<Operation>,
    drop_tables: Vec<Operation>,
    create_tables: Vec<Operation>,
    rebuild_tables: Vec<Operation>,
    add_columns: Vec<Operation>,
    alter_columns: Vec<Operation>,
    drop_columns: Vec<Operation>,
    create_indexes: Vec<Operation>,
    add_foreign_keys: Vec<Operation>,
}

impl Phases {
    fn into_operations(self) -> Vec<Operation> {
        [
            self.drop_foreign_keys,
            self.drop_indexes,
            self.drop_tables,
            self.create_tables,
            self.rebuild_tables,
            self.add_columns,
            self.alter_columns,
            self.drop_columns,
            self.create_indexes,
            self.add_foreign_keys,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl<'d> SchemaSynchronizer<'d> {
    /// Creates a synchronizer for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Plans the changes turning `current` into `target`.
    #[must_use]
    pub fn diff(&self, current: &SchemaSnapshot, target: &SchemaSnapshot) -> SyncPlan {
        let mut phases = Phases::default();
        let mut warnings = Vec::new();

        let dropped: Vec<&TableSnapshot> = current
            .tables
            .iter()
            .filter(|(key, _)| !target.tables.contains_key(*key))
            .map(|(_, table)| table)
            .collect();
        for table in creation_order(&dropped).into_iter().rev() {
            warnings.push(DataLossWarning {
                table: table.name.key(),
                column: None,
                reason: String::from("table is dropped with its rows"),
            });
            phases.drop_tables.push(Operation::DropTable(table.name.clone()));
        }

        let created: Vec<&TableSnapshot> = target
            .tables
            .iter()
            .filter(|(key, _)| !current.tables.contains_key(*key))
            .map(|(_, table)| table)
            .collect();
        for table in creation_order(&created) {
            phases.create_tables.push(Operation::CreateTable(table.clone()));
            phases
                .create_indexes
                .extend(table.indexes.iter().map(|index| Operation::CreateIndex {
                    table: table.name.clone(),
                    index: index.clone(),
                }));
            if self.dialect.supports_add_foreign_key() {
                phases
                    .add_foreign_keys
                    .extend(table.foreign_keys.iter().map(|fk| Operation::AddForeignKey {
                        table: table.name.clone(),
                        foreign_key: fk.clone(),
                    }));
            }
        }

        for (key, wanted) in &target.tables {
            if let Some(existing) = current.tables.get(key) {
                self.diff_table(existing, wanted, &mut phases, &mut warnings);
            }
        }

        let operations = phases.into_operations();
        let renderer = DdlRenderer::new(self.dialect);
        let statements: Vec<String> = operations.iter().flat_map(|op| renderer.render(op)).collect();
        for warning in &warnings {
            warn!(warning = %warning, "synchronization drops data");
        }
        for statement in &statements {
            debug!(sql = %statement, "planned");
        }
        info!(
            dialect = self.dialect.name(),
            operations = operations.len(),
            warnings = warnings.len(),
            "schema diff computed"
        );
        SyncPlan {
            operations,
            statements,
            warnings,
            acknowledged: false,
        }
    }

    fn diff_table(
        &self,
        existing: &TableSnapshot,
        wanted: &TableSnapshot,
        phases: &mut Phases,
        warnings: &mut Vec<DataLossWarning>,
    ) {
        let table = wanted.name.clone();
        let key = table.key();
        let mut local = Phases::default();
        let mut rebuild = existing.primary_key != wanted.primary_key;
        let mut replaced: HashSet<&str> = HashSet::new();
        let in_place = self.dialect.alter_column_style() != AlterColumnStyle::Unsupported;

        for column in &wanted.columns {
            let Some(current) = existing.get_column(&column.name) else {
                rebuild |= !self.adds_in_place(column);
                local.add_columns.push(Operation::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
                continue;
            };
            let primary = wanted.is_primary(&column.name);
            let changes = self.column_changes(current, column, primary);
            if changes.is_empty() {
                continue;
            }
            if changes.contains(&ColumnChange::Type) && (!in_place || self.is_lossy(current, column)) {
                warnings.push(DataLossWarning {
                    table: key.clone(),
                    column: Some(column.name.clone()),
                    reason: format!(
                        "type changes from {} to {}; the column is recreated",
                        current.data_type, column.data_type
                    ),
                });
                replaced.insert(column.name.as_str());
                rebuild |= !self.drops_in_place(current) || !self.adds_in_place(column);
                local.alter_columns.push(Operation::DropColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                });
                local.alter_columns.push(Operation::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
            } else if in_place {
                local.alter_columns.push(Operation::AlterColumn {
                    table: table.clone(),
                    from: current.clone(),
                    to: column.clone(),
                    changes,
                });
            } else {
                rebuild = true;
            }
        }

        for column in &existing.columns {
            if wanted.get_column(&column.name).is_none() {
                warnings.push(DataLossWarning {
                    table: key.clone(),
                    column: Some(column.name.clone()),
                    reason: String::from("column is dropped"),
                });
                replaced.insert(column.name.as_str());
                rebuild |= !self.drops_in_place(column);
                local.drop_columns.push(Operation::DropColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
        }

        let touches = |columns: &[String]| columns.iter().any(|c| replaced.contains(c.as_str()));
        let existing_indexes: HashMap<&str, _> =
            existing.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
        for index in &existing.indexes {
            let kept = wanted
                .indexes
                .iter()
                .any(|w| w == index && !touches(&w.columns));
            if !kept {
                local.drop_indexes.push(Operation::DropIndex {
                    table: table.clone(),
                    name: index.name.clone(),
                });
            }
        }
        for index in &wanted.indexes {
            let unchanged = existing_indexes
                .get(index.name.as_str())
                .is_some_and(|current| *current == index && !touches(&index.columns));
            if !unchanged {
                local.create_indexes.push(Operation::CreateIndex {
                    table: table.clone(),
                    index: index.clone(),
                });
            }
        }

        for foreign_key in &existing.foreign_keys {
            let kept = wanted
                .foreign_keys
                .iter()
                .any(|w| w.same_reference(foreign_key) && !touches(&w.columns));
            if !kept {
                rebuild |= !self.dialect.supports_add_foreign_key();
                local.drop_foreign_keys.push(Operation::DropForeignKey {
                    table: table.clone(),
                    foreign_key: foreign_key.clone(),
                });
            }
        }
        for foreign_key in &wanted.foreign_keys {
            let present = existing
                .foreign_keys
                .iter()
                .any(|e| e.same_reference(foreign_key) && !touches(&foreign_key.columns));
            if !present {
                rebuild |= !self.dialect.supports_add_foreign_key();
                local.add_foreign_keys.push(Operation::AddForeignKey {
                    table: table.clone(),
                    foreign_key: foreign_key.clone(),
                });
            }
        }

        if rebuild {
            debug!(table = %key, "table rebuilt to apply changes");
            phases.rebuild_tables.push(Operation::RebuildTable {
                from: existing.clone(),
                to: wanted.clone(),
            });
            return;
        }
        phases.drop_foreign_keys.append(&mut local.drop_foreign_keys);
        phases.drop_indexes.append(&mut local.drop_indexes);
        phases.add_columns.append(&mut local.add_columns);
        phases.alter_columns.append(&mut local.alter_columns);
        phases.drop_columns.append(&mut local.drop_columns);
        phases.create_indexes.append(&mut local.create_indexes);
        phases.add_foreign_keys.append(&mut local.add_foreign_keys);
    }

    /// Aspects of `wanted` that differ from `current`.
    fn column_changes(
        &self,
        current: &ColumnSnapshot,
        wanted: &ColumnSnapshot,
        primary: bool,
    ) -> Vec<ColumnChange> {
        let mut changes = Vec::new();
        if current.native_type(self.dialect) != wanted.native_type(self.dialect) {
            changes.push(ColumnChange::Type);
        }
        if !primary && current.nullable != wanted.nullable {
            changes.push(ColumnChange::Nullability);
        }
        // increments report sequence defaults on some engines
        let increments = current.autoincrement || wanted.autoincrement;
        if !increments
            && current.default.as_deref().map(normalize_default)
                != wanted.default.as_deref().map(normalize_default)
        {
            changes.push(ColumnChange::Default);
        }
        if !primary && current.unique != wanted.unique {
            changes.push(ColumnChange::Unique);
        }
        changes
    }

    /// Whether `ALTER TABLE ... ADD` can create `column` on a populated
    /// table. Engines without column alteration reject required columns
    /// lacking a default and unique columns.
    fn adds_in_place(&self, column: &ColumnSnapshot) -> bool {
        self.dialect.alter_column_style() != AlterColumnStyle::Unsupported
            || ((column.nullable || column.default.is_some()) && !column.unique)
    }

    /// Whether `ALTER TABLE ... DROP COLUMN` can remove `column`.
    fn drops_in_place(&self, column: &ColumnSnapshot) -> bool {
        self.dialect.supports_drop_column()
            && (self.dialect.alter_column_style() != AlterColumnStyle::Unsupported || !column.unique)
    }

    /// Whether converting `current` to `wanted` can lose values.
    fn is_lossy(&self, current: &ColumnSnapshot, wanted: &ColumnSnapshot) -> bool {
        let from = current.native_type(self.dialect);
        let to = wanted.native_type(self.dialect);
        if TypeFamily::of(&from.name) != TypeFamily::of(&to.name) {
            return true;
        }
        narrows(&from, &to)
    }
}

fn narrows(from: &NativeType, to: &NativeType) -> bool {
    let length = match (from.length, to.length) {
        (Some(TypeLength::Fixed(a)), Some(TypeLength::Fixed(b))) => b < a,
        (Some(TypeLength::Max) | None, Some(TypeLength::Fixed(_))) => true,
        _ => false,
    };
    let precision = matches!((from.precision, to.precision), (Some(a), Some(b)) if b < a);
    let scale = matches!((from.scale, to.scale), (Some(a), Some(b)) if b < a);
    length || precision || scale
}

/// Strips the parentheses some engines wrap defaults in.
fn normalize_default(default: &str) -> &str {
    let mut value = default.trim();
    while value.starts_with('(') && value.ends_with(')') && value.len() >= 2 {
        value = value[1..value.len() - 1].trim();
    }
    value
}

/// Orders tables so that referenced tables come before the tables
/// referencing them. Tables caught in a cycle keep their key order at the
/// end.
fn creation_order<'t>(tables: &[&'t TableSnapshot]) -> Vec<&'t TableSnapshot> {
    let keys: HashSet<String> = tables.iter().map(|t| t.name.key()).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut remaining: Vec<&TableSnapshot> = tables.to_vec();
    let mut ordered = Vec::with_capacity(tables.len());
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&TableSnapshot>, Vec<&TableSnapshot>) =
            remaining.into_iter().partition(|table| {
                let own = table.name.key();
                table.foreign_keys.iter().all(|fk| {
                    let referenced = fk.referenced_table.key();
                    referenced == own || !keys.contains(&referenced) || placed.contains(&referenced)
                })
            });
        if ready.is_empty() {
            ordered.extend(blocked);
            break;
        }
        placed.extend(ready.iter().map(|t| t.name.key()));
        ordered.extend(ready);
        remaining = blocked;
    }
    ordered
}
