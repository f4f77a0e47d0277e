//! SQLite family strategy.

use super::{
    AlterColumnStyle, DatabaseVersion, Dialect, DialectCapability, DialectKind, IncrementStyle,
    TypeRule,
};
use crate::types::{ColumnType, NativeType};
use crate::value::SqlValue;

/// SQLite, better-sqlite3 and sql.js.
///
/// Types are stored with their declared names; SQLite only uses them for
/// affinity. Foreign keys are declared inline with the table and columns
/// cannot be redefined in place.
#[derive(Debug, Clone, Copy)]
pub struct SqliteDialect {
    kind: DialectKind,
}

impl SqliteDialect {
    /// Creates the strategy for one of the SQLite drivers.
    #[must_use]
    pub const fn new(kind: DialectKind) -> Self {
        Self { kind }
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        match column_type {
            ColumnType::SmallInt => TypeRule::Native(NativeType::new("smallint")),
            ColumnType::Integer => TypeRule::Native(NativeType::new("integer")),
            ColumnType::BigInt => TypeRule::Native(NativeType::new("bigint")),
            ColumnType::Float => TypeRule::Native(NativeType::new("real")),
            ColumnType::Double => TypeRule::Native(NativeType::new("double")),
            ColumnType::Decimal => TypeRule::Native(NativeType::new("decimal")),
            ColumnType::Boolean => TypeRule::Native(NativeType::new("boolean")),
            ColumnType::Char => TypeRule::Native(NativeType::new("char")),
            ColumnType::Varchar => TypeRule::Native(NativeType::new("varchar")),
            ColumnType::Text => TypeRule::Native(NativeType::new("text")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Native(NativeType::new("time")),
            ColumnType::Timestamp | ColumnType::TimestampTz => {
                TypeRule::Native(NativeType::new("datetime"))
            }
            ColumnType::Uuid => TypeRule::Fallback(NativeType::with_length("varchar", 36)),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("varchar", 15)),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("varchar", 45)),
            ColumnType::Json | ColumnType::Jsonb => TypeRule::Fallback(NativeType::new("text")),
            ColumnType::Enum => TypeRule::Native(NativeType::new("varchar")),
            ColumnType::Blob => TypeRule::Native(NativeType::new("blob")),
        }
    }

    fn format_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            other => other.to_sql_inline(),
        }
    }

    fn qualifiers<'a>(&self, _schema: Option<&'a str>, _database: Option<&'a str>) -> Vec<&'a str> {
        Vec::new()
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, Some(o)) => format!(" LIMIT -1 OFFSET {o}"),
            (Some(l), Some(o)) => format!(" LIMIT {l} OFFSET {o}"),
            (Some(l), None) => format!(" LIMIT {l}"),
            (None, None) => String::new(),
        }
    }

    fn supports_returning(&self, capability: &DialectCapability) -> bool {
        capability.version_at_least(DatabaseVersion::new(3, 35, 0))
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::Unsupported
    }

    fn supports_add_foreign_key(&self) -> bool {
        false
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::InlinePrimaryKey
    }
}
