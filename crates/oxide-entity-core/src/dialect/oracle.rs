//! Oracle strategy.

use super::{AlterColumnStyle, DatabaseVersion, Dialect, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, NativeType};
use crate::value::SqlValue;

/// Oracle Database.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates a new Oracle strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn name(&self) -> &'static str {
        "oracle"
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":{index}")
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        match column_type {
            ColumnType::SmallInt => TypeRule::Native(NativeType::with_precision("number", 5, None)),
            ColumnType::Integer => TypeRule::Native(NativeType::with_precision("number", 10, None)),
            ColumnType::BigInt => TypeRule::Native(NativeType::with_precision("number", 19, None)),
            ColumnType::Float => TypeRule::Native(NativeType::new("binary_float")),
            ColumnType::Double => TypeRule::Native(NativeType::new("binary_double")),
            ColumnType::Decimal => TypeRule::Native(NativeType::new("number")),
            ColumnType::Boolean => TypeRule::Native(NativeType::with_precision("number", 1, None)),
            ColumnType::Char => TypeRule::Native(NativeType::new("char")),
            ColumnType::Varchar => TypeRule::Native(NativeType::with_length("varchar2", 255)),
            ColumnType::Text => TypeRule::Native(NativeType::new("clob")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Unsupported,
            ColumnType::Timestamp => TypeRule::Native(NativeType::new("timestamp")),
            ColumnType::TimestampTz => {
                TypeRule::Native(NativeType::new("timestamp with time zone"))
            }
            ColumnType::Uuid => TypeRule::Fallback(NativeType::with_length("varchar2", 36)),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("varchar2", 15)),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("varchar2", 45)),
            ColumnType::Json | ColumnType::Jsonb => TypeRule::Since {
                native: NativeType::new("json"),
                since: DatabaseVersion::new(21, 0, 0),
                fallback: NativeType::new("clob"),
            },
            ColumnType::Enum => TypeRule::Native(NativeType::with_length("varchar2", 255)),
            ColumnType::Blob => TypeRule::Native(NativeType::new("blob")),
        }
    }

    fn format_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("HEXTORAW('{hex}')")
            }
            other => other.to_sql_inline(),
        }
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut sql = String::new();
        if let Some(o) = offset {
            sql.push_str(&format!(" OFFSET {o} ROWS"));
        }
        if let Some(l) = limit {
            sql.push_str(&format!(" FETCH NEXT {l} ROWS ONLY"));
        }
        sql
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::Parenthesized("MODIFY")
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::Suffix("GENERATED BY DEFAULT AS IDENTITY")
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(30)
    }
}
