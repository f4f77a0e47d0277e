//! PostgreSQL family strategy.

use super::{Dialect, DialectCapability, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, NativeType};
use crate::value::SqlValue;

/// PostgreSQL, CockroachDB and Aurora PostgreSQL.
#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect {
    kind: DialectKind,
}

impl PostgresDialect {
    /// Creates the strategy for one of the PostgreSQL engines.
    #[must_use]
    pub const fn new(kind: DialectKind) -> Self {
        Self { kind }
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            DialectKind::CockroachDb => "cockroachdb",
            DialectKind::AuroraPostgres => "aurora-postgres",
            _ => "postgresql",
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        let native = match column_type {
            ColumnType::SmallInt => NativeType::new("smallint"),
            ColumnType::Integer => NativeType::new("integer"),
            ColumnType::BigInt => NativeType::new("bigint"),
            ColumnType::Float => NativeType::new("real"),
            ColumnType::Double => NativeType::new("double precision"),
            ColumnType::Decimal => NativeType::new("numeric"),
            ColumnType::Boolean => NativeType::new("boolean"),
            ColumnType::Char => NativeType::new("char"),
            ColumnType::Varchar => NativeType::new("varchar"),
            ColumnType::Text => NativeType::new("text"),
            ColumnType::Date => NativeType::new("date"),
            ColumnType::Time => NativeType::new("time"),
            ColumnType::Timestamp => NativeType::new("timestamp"),
            ColumnType::TimestampTz => NativeType::new("timestamptz"),
            ColumnType::Uuid => NativeType::new("uuid"),
            ColumnType::Inet4 | ColumnType::Inet6 => NativeType::new("inet"),
            ColumnType::Json if self.kind == DialectKind::CockroachDb => NativeType::new("jsonb"),
            ColumnType::Json => NativeType::new("json"),
            ColumnType::Jsonb => NativeType::new("jsonb"),
            ColumnType::Enum => NativeType::with_length("varchar", 255),
            ColumnType::Blob => NativeType::new("bytea"),
        };
        TypeRule::Native(native)
    }

    fn format_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("'\\x{hex}'")
            }
            other => other.to_sql_inline(),
        }
    }

    fn supports_returning(&self, _capability: &DialectCapability) -> bool {
        true
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::SerialType
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(63)
    }
}
