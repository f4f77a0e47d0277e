//! DDL generation for schema operations.

use oxide_entity_core::dialect::{AlterColumnStyle, Dialect, DialectKind, IncrementStyle};
use oxide_entity_core::types::NativeType;
use tracing::warn;

use crate::operations::{ColumnChange, Operation};
use crate::snapshot::{
    foreign_key_name, ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, TableName, TableSnapshot,
};
use crate::synchronizer::TypeFamily;

/// Renders [`Operation`]s as DDL statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct DdlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> DdlRenderer<'d> {
    /// Creates a renderer for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Statements implementing `operation`, in execution order.
    #[must_use]
    pub fn render(&self, operation: &Operation) -> Vec<String> {
        match operation {
            Operation::CreateTable(table) => vec![self.create_table(table)],
            Operation::DropTable(table) => {
                vec![format!("DROP TABLE {}", table.path(self.dialect))]
            }
            Operation::AddColumn { table, column } => vec![self.add_column(table, column)],
            Operation::DropColumn { table, column } => vec![self.drop_column(table, column)],
            Operation::AlterColumn {
                table,
                from,
                to,
                changes,
            } => self.alter_column(table, from, to, changes),
            Operation::RebuildTable { from, to } => self.rebuild_table(from, to),
            Operation::CreateIndex { table, index } => vec![self.create_index(table, index)],
            Operation::DropIndex { table, name } => vec![self.drop_index(table, name)],
            Operation::AddForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD {}",
                table.path(self.dialect),
                self.foreign_key_clause(table, foreign_key)
            )],
            Operation::DropForeignKey { table, foreign_key } => {
                let name = foreign_key
                    .name
                    .clone()
                    .unwrap_or_else(|| foreign_key_name(&table.name, &foreign_key.columns));
                vec![format!(
                    "ALTER TABLE {} DROP {} {}",
                    table.path(self.dialect),
                    self.dialect.drop_foreign_key_keyword(),
                    self.quote(&name)
                )]
            }
        }
    }

    /// Column definition as used in `CREATE TABLE` and `ADD COLUMN`.
    ///
    /// `inline_primary` marks the sole primary key column of a table whose
    /// auto-increment must be declared on the column itself.
    #[must_use]
    pub fn column_definition(&self, column: &ColumnSnapshot, inline_primary: bool) -> String {
        let mut parts = vec![self.quote(&column.name)];
        let data_type = self.type_sql(column);
        match (column.autoincrement, self.dialect.increment_style()) {
            (true, IncrementStyle::SerialType) => parts.push(serial_type(&data_type)),
            (true, IncrementStyle::InlinePrimaryKey) if inline_primary => {
                parts.push(String::from("integer PRIMARY KEY AUTOINCREMENT"));
            }
            (true, IncrementStyle::Suffix(keyword)) => {
                parts.push(data_type);
                parts.push(keyword.to_string());
            }
            _ => parts.push(data_type),
        }
        if !column.nullable {
            parts.push(String::from("NOT NULL"));
        }
        if column.unique {
            parts.push(String::from("UNIQUE"));
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {default}"));
        }
        if let Some(check) = self.enum_check(column) {
            parts.push(check);
        }
        parts.join(" ")
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn type_sql(&self, column: &ColumnSnapshot) -> String {
        if is_native_enum(column) {
            let values: Vec<String> = column.enum_values.iter().map(|v| quote_literal(v)).collect();
            format!("enum({})", values.join(", "))
        } else {
            column.data_type.clone()
        }
    }

    /// `CHECK` restricting an enum stored as text.
    fn enum_check(&self, column: &ColumnSnapshot) -> Option<String> {
        if column.enum_values.is_empty() || is_native_enum(column) {
            return None;
        }
        let values: Vec<String> = column.enum_values.iter().map(|v| quote_literal(v)).collect();
        Some(format!(
            "CHECK ({} IN ({}))",
            self.quote(&column.name),
            values.join(", ")
        ))
    }

    fn create_table(&self, table: &TableSnapshot) -> String {
        let inline_primary = self.dialect.increment_style() == IncrementStyle::InlinePrimaryKey
            && matches!(table.primary_key.as_slice(), [key]
                if table.get_column(key).is_some_and(|c| c.autoincrement));

        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline_primary && table.is_primary(&c.name)))
            .collect();
        if !table.primary_key.is_empty() && !inline_primary {
            definitions.push(format!("PRIMARY KEY ({})", self.quote_list(&table.primary_key)));
        }
        if !self.dialect.supports_add_foreign_key() {
            definitions.extend(
                table
                    .foreign_keys
                    .iter()
                    .map(|fk| self.foreign_key_clause(&table.name, fk)),
            );
        }
        format!(
            "CREATE TABLE {} ({})",
            table.name.path(self.dialect),
            definitions.join(", ")
        )
    }

    fn add_column(&self, table: &TableName, column: &ColumnSnapshot) -> String {
        let definition = self.column_definition(column, false);
        let path = table.path(self.dialect);
        match self.dialect.kind() {
            DialectKind::Oracle | DialectKind::SapHana => {
                format!("ALTER TABLE {path} ADD ({definition})")
            }
            DialectKind::Mssql => format!("ALTER TABLE {path} ADD {definition}"),
            _ => format!("ALTER TABLE {path} ADD COLUMN {definition}"),
        }
    }

    fn drop_column(&self, table: &TableName, column: &str) -> String {
        let path = table.path(self.dialect);
        match self.dialect.kind() {
            DialectKind::SapHana => format!("ALTER TABLE {path} DROP ({})", self.quote(column)),
            _ => format!("ALTER TABLE {path} DROP COLUMN {}", self.quote(column)),
        }
    }

    fn alter_column(
        &self,
        table: &TableName,
        from: &ColumnSnapshot,
        to: &ColumnSnapshot,
        changes: &[ColumnChange],
    ) -> Vec<String> {
        let path = table.path(self.dialect);
        let column = self.quote(&to.name);
        let data_type = self.type_sql(to);
        let null = if to.nullable { "NULL" } else { "NOT NULL" };
        let mut statements = Vec::new();

        match self.dialect.alter_column_style() {
            AlterColumnStyle::AlterType => {
                for change in changes {
                    let clause = match change {
                        ColumnChange::Type => format!("TYPE {data_type}"),
                        ColumnChange::Nullability if to.nullable => String::from("DROP NOT NULL"),
                        ColumnChange::Nullability => String::from("SET NOT NULL"),
                        ColumnChange::Default => to
                            .default
                            .as_ref()
                            .map_or_else(|| String::from("DROP DEFAULT"), |d| format!("SET DEFAULT {d}")),
                        ColumnChange::Unique => continue,
                    };
                    statements.push(format!("ALTER TABLE {path} ALTER COLUMN {column} {clause}"));
                }
            }
            AlterColumnStyle::ModifyColumn => {
                let definition = self.column_definition(
                    &ColumnSnapshot {
                        unique: false,
                        ..to.clone()
                    },
                    false,
                );
                statements.push(format!("ALTER TABLE {path} MODIFY COLUMN {definition}"));
            }
            AlterColumnStyle::AlterColumnFull => {
                if changes.iter().any(|c| matches!(c, ColumnChange::Type | ColumnChange::Nullability)) {
                    statements.push(format!("ALTER TABLE {path} ALTER COLUMN {column} {data_type} {null}"));
                }
                if changes.contains(&ColumnChange::Default) {
                    statements.extend(self.full_style_default(&path, &column, to));
                }
            }
            AlterColumnStyle::Parenthesized(keyword) => {
                let mut definition = vec![column.clone(), data_type];
                if let Some(default) = &to.default {
                    definition.push(format!("DEFAULT {default}"));
                }
                if changes.contains(&ColumnChange::Nullability) {
                    definition.push(null.to_string());
                }
                statements.push(format!("ALTER TABLE {path} {keyword} ({})", definition.join(" ")));
            }
            AlterColumnStyle::Unsupported => {
                warn!(
                    dialect = self.dialect.name(),
                    column = %to.name,
                    "columns cannot be altered in place; rebuild the table instead"
                );
                return statements;
            }
        }

        if changes.contains(&ColumnChange::Unique) && from.unique != to.unique {
            statements.push(self.unique_constraint(table, &to.name, to.unique));
        }
        statements
    }

    fn full_style_default(&self, path: &str, column: &str, to: &ColumnSnapshot) -> Option<String> {
        match (self.dialect.kind(), &to.default) {
            (DialectKind::Mssql, Some(default)) => {
                Some(format!("ALTER TABLE {path} ADD DEFAULT {default} FOR {column}"))
            }
            (DialectKind::Mssql, None) => {
                warn!(column, "default constraints are named by the server; drop it manually");
                None
            }
            (_, Some(default)) => Some(format!(
                "ALTER TABLE {path} ALTER COLUMN {column} SET DEFAULT ({default})"
            )),
            (_, None) => Some(format!("ALTER TABLE {path} ALTER COLUMN {column} DROP DEFAULT")),
        }
    }

    fn unique_constraint(&self, table: &TableName, column: &str, unique: bool) -> String {
        let path = table.path(self.dialect);
        let name = self.quote(&format!("UQ_{}_{column}", table.name));
        if unique {
            format!("ALTER TABLE {path} ADD CONSTRAINT {name} UNIQUE ({})", self.quote(column))
        } else if self.dialect.kind().is_mysql_family() {
            format!("ALTER TABLE {path} DROP INDEX {name}")
        } else {
            format!("ALTER TABLE {path} DROP CONSTRAINT {name}")
        }
    }

    /// Recreates `to` under a temporary name, copies the shared columns,
    /// then swaps it in.
    fn rebuild_table(&self, from: &TableSnapshot, to: &TableSnapshot) -> Vec<String> {
        let temporary = TableSnapshot {
            name: TableName {
                name: format!("temporary_{}", to.name.name),
                ..to.name.clone()
            },
            ..to.clone()
        };
        let mut targets = Vec::new();
        let mut sources = Vec::new();
        for column in &to.columns {
            if from.get_column(&column.name).is_some() {
                targets.push(column.name.clone());
                sources.push(self.quote(&column.name));
            } else if !column.nullable && column.default.is_none() && !column.autoincrement {
                // existing rows need a value for a new required column
                targets.push(column.name.clone());
                let family = TypeFamily::of(&column.native_type(self.dialect).name);
                sources.push(family.zero_literal().to_string());
            }
        }

        let sqlite = self.dialect.kind().is_sqlite_family();
        let mut statements = Vec::new();
        if sqlite {
            statements.push(String::from("PRAGMA foreign_keys = OFF"));
        }
        statements.push(self.create_table(&temporary));
        if !targets.is_empty() {
            statements.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                temporary.name.path(self.dialect),
                self.quote_list(&targets),
                sources.join(", "),
                from.name.path(self.dialect)
            ));
        }
        statements.push(format!("DROP TABLE {}", from.name.path(self.dialect)));
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            temporary.name.path(self.dialect),
            self.quote(&to.name.name)
        ));
        statements.extend(to.indexes.iter().map(|i| self.create_index(&to.name, i)));
        if sqlite {
            statements.push(String::from("PRAGMA foreign_keys = ON"));
        }
        statements
    }

    fn create_index(&self, table: &TableName, index: &IndexSnapshot) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote(&index.name),
            table.path(self.dialect),
            self.quote_list(&index.columns)
        )
    }

    fn drop_index(&self, table: &TableName, name: &str) -> String {
        if self.dialect.drop_index_needs_table() {
            format!("DROP INDEX {} ON {}", self.quote(name), table.path(self.dialect))
        } else {
            format!(
                "DROP INDEX {}",
                self.dialect.table_path(name, table.schema.as_deref(), None)
            )
        }
    }

    fn foreign_key_clause(&self, table: &TableName, foreign_key: &ForeignKeySnapshot) -> String {
        let name = foreign_key
            .name
            .clone()
            .unwrap_or_else(|| foreign_key_name(&table.name, &foreign_key.columns));
        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&name),
            self.quote_list(&foreign_key.columns),
            foreign_key.referenced_table.path(self.dialect),
            self.quote_list(&foreign_key.referenced_columns)
        );
        if let Some(action) = foreign_key.on_delete {
            clause.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = foreign_key.on_update {
            clause.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        clause
    }
}

fn is_native_enum(column: &ColumnSnapshot) -> bool {
    !column.enum_values.is_empty()
        && NativeType::parse(&column.data_type).is_ok_and(|t| t.name == "enum")
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `integer` becomes `serial`, `bigint` becomes `bigserial`.
fn serial_type(data_type: &str) -> String {
    match NativeType::parse(data_type).map(|t| t.name) {
        Ok(name) if name == "smallint" || name == "int2" => String::from("smallserial"),
        Ok(name) if name == "bigint" || name == "int8" => String::from("bigserial"),
        Ok(name) if name == "integer" || name == "int" || name == "int4" => String::from("serial"),
        _ => data_type.to_string(),
    }
}
