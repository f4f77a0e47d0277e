//! SQL Server strategy.

use super::{AlterColumnStyle, Dialect, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, NativeType};
use crate::value::SqlValue;

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Creates a new SQL Server strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MssqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mssql
    }

    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{index}")
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        match column_type {
            ColumnType::SmallInt => TypeRule::Native(NativeType::new("smallint")),
            ColumnType::Integer => TypeRule::Native(NativeType::new("int")),
            ColumnType::BigInt => TypeRule::Native(NativeType::new("bigint")),
            ColumnType::Float => TypeRule::Native(NativeType::new("real")),
            ColumnType::Double => TypeRule::Native(NativeType::new("float")),
            ColumnType::Decimal => TypeRule::Native(NativeType::new("decimal")),
            ColumnType::Boolean => TypeRule::Native(NativeType::new("bit")),
            ColumnType::Char => TypeRule::Native(NativeType::new("nchar")),
            ColumnType::Varchar => TypeRule::Native(NativeType::with_length("nvarchar", 255)),
            ColumnType::Text => TypeRule::Native(NativeType::with_max_length("nvarchar")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Native(NativeType::new("time")),
            ColumnType::Timestamp => TypeRule::Native(NativeType::new("datetime2")),
            ColumnType::TimestampTz => TypeRule::Native(NativeType::new("datetimeoffset")),
            ColumnType::Uuid => TypeRule::Native(NativeType::new("uniqueidentifier")),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("nvarchar", 15)),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("nvarchar", 45)),
            ColumnType::Json | ColumnType::Jsonb => {
                TypeRule::Fallback(NativeType::with_max_length("nvarchar"))
            }
            ColumnType::Enum => TypeRule::Native(NativeType::with_length("nvarchar", 255)),
            ColumnType::Blob => TypeRule::Native(NativeType::with_max_length("varbinary")),
        }
    }

    fn format_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            SqlValue::Text(s) => format!("N'{}'", s.replace('\'', "''")),
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("0x{hex}")
            }
            other => other.to_sql_inline(),
        }
    }

    fn current_timestamp(&self) -> &'static str {
        "getdate()"
    }

    fn qualifiers<'a>(&self, schema: Option<&'a str>, database: Option<&'a str>) -> Vec<&'a str> {
        match (database, schema) {
            (Some(db), Some(s)) => vec![db, s],
            (Some(db), None) => vec![db, "dbo"],
            (None, Some(s)) => vec![s],
            (None, None) => Vec::new(),
        }
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, None) => String::new(),
            (Some(l), o) => format!(" OFFSET {} ROWS FETCH NEXT {l} ROWS ONLY", o.unwrap_or(0)),
            (None, Some(o)) => format!(" OFFSET {o} ROWS"),
        }
    }

    fn pagination_requires_order(&self) -> bool {
        true
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::AlterColumnFull
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::Suffix("IDENTITY(1,1)")
    }

    fn drop_index_needs_table(&self) -> bool {
        true
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(128)
    }
}
