//! Schema operations produced by a diff.

use serde::{Deserialize, Serialize};

use crate::snapshot::{ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, TableName, TableSnapshot};

/// One aspect of a column definition that differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnChange {
    /// Native type or its modifiers.
    Type,
    /// NULL / NOT NULL.
    Nullability,
    /// Default expression.
    Default,
    /// Single-column unique constraint.
    Unique,
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a table with its columns, primary key and, where the
    /// dialect declares them inline, foreign keys.
    CreateTable(TableSnapshot),

    /// Drop a table.
    DropTable(TableName),

    /// Add a column to an existing table.
    AddColumn {
        /// Table.
        table: TableName,
        /// Column definition.
        column: ColumnSnapshot,
    },

    /// Drop a column.
    DropColumn {
        /// Table.
        table: TableName,
        /// Column name.
        column: String,
    },

    /// Redefine a column in place.
    AlterColumn {
        /// Table.
        table: TableName,
        /// Definition in the database.
        from: ColumnSnapshot,
        /// Target definition.
        to: ColumnSnapshot,
        /// What differs.
        changes: Vec<ColumnChange>,
    },

    /// Recreate a table whose definition cannot be changed in place,
    /// copying the rows of the columns both definitions share.
    RebuildTable {
        /// Definition in the database.
        from: TableSnapshot,
        /// Target definition.
        to: TableSnapshot,
    },

    /// Create an index.
    CreateIndex {
        /// Table.
        table: TableName,
        /// Index definition.
        index: IndexSnapshot,
    },

    /// Drop an index.
    DropIndex {
        /// Table.
        table: TableName,
        /// Index name.
        name: String,
    },

    /// Add a foreign key to an existing table.
    AddForeignKey {
        /// Table.
        table: TableName,
        /// Constraint definition.
        foreign_key: ForeignKeySnapshot,
    },

    /// Drop a foreign key.
    DropForeignKey {
        /// Table.
        table: TableName,
        /// Constraint definition as introspected.
        foreign_key: ForeignKeySnapshot,
    },
}

impl Operation {
    /// The table the operation applies to.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        match self {
            Self::CreateTable(table) | Self::RebuildTable { to: table, .. } => &table.name,
            Self::DropTable(table)
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => table,
        }
    }

    /// Short description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable(table) => format!("create table {}", table.name.key()),
            Self::DropTable(table) => format!("drop table {}", table.key()),
            Self::AddColumn { table, column } => {
                format!("add column {}.{}", table.key(), column.name)
            }
            Self::DropColumn { table, column } => format!("drop column {}.{column}", table.key()),
            Self::AlterColumn { table, to, .. } => {
                format!("alter column {}.{}", table.key(), to.name)
            }
            Self::RebuildTable { to, .. } => format!("rebuild table {}", to.name.key()),
            Self::CreateIndex { table, index } => {
                format!("create index {} on {}", index.name, table.key())
            }
            Self::DropIndex { table, name } => format!("drop index {name} on {}", table.key()),
            Self::AddForeignKey { table, foreign_key } => format!(
                "add foreign key {}({}) on {}",
                foreign_key.referenced_table.key(),
                foreign_key.referenced_columns.join(", "),
                table.key()
            ),
            Self::DropForeignKey { table, foreign_key } => format!(
                "drop foreign key to {} on {}",
                foreign_key.referenced_table.key(),
                table.key()
            ),
        }
    }
}
