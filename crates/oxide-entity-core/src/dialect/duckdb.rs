//! DuckDB strategy.

use super::{Dialect, DialectCapability, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, NativeType};

/// DuckDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbDialect;

impl DuckDbDialect {
    /// Creates a new DuckDB strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for DuckDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
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
            ColumnType::Char | ColumnType::Varchar | ColumnType::Enum => {
                TypeRule::Native(NativeType::new("varchar"))
            }
            ColumnType::Text => TypeRule::Native(NativeType::new("text")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Native(NativeType::new("time")),
            ColumnType::Timestamp => TypeRule::Native(NativeType::new("timestamp")),
            ColumnType::TimestampTz => TypeRule::Native(NativeType::new("timestamptz")),
            ColumnType::Uuid => TypeRule::Native(NativeType::new("uuid")),
            ColumnType::Inet4 | ColumnType::Inet6 => {
                TypeRule::Fallback(NativeType::new("varchar"))
            }
            ColumnType::Json => TypeRule::Native(NativeType::new("json")),
            ColumnType::Jsonb => TypeRule::Fallback(NativeType::new("json")),
            ColumnType::Blob => TypeRule::Native(NativeType::new("blob")),
        }
    }

    fn supports_returning(&self, _capability: &DialectCapability) -> bool {
        true
    }

    fn supports_add_foreign_key(&self) -> bool {
        false
    }

    fn increment_style(&self) -> IncrementStyle {
        // sequences only
        IncrementStyle::Unsupported
    }
}
