//! SAP HANA strategy.

use super::{AlterColumnStyle, Dialect, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, NativeType};

/// SAP HANA.
#[derive(Debug, Clone, Copy, Default)]
pub struct SapHanaDialect;

impl SapHanaDialect {
    /// Creates a new SAP HANA strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SapHanaDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SapHana
    }

    fn name(&self) -> &'static str {
        "sap"
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
            ColumnType::Char => TypeRule::Native(NativeType::new("nchar")),
            ColumnType::Varchar => TypeRule::Native(NativeType::with_length("nvarchar", 255)),
            ColumnType::Text => TypeRule::Native(NativeType::new("nclob")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Native(NativeType::new("time")),
            ColumnType::Timestamp => TypeRule::Native(NativeType::new("timestamp")),
            ColumnType::TimestampTz => TypeRule::Fallback(NativeType::new("timestamp")),
            ColumnType::Uuid => TypeRule::Fallback(NativeType::with_length("nvarchar", 36)),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("nvarchar", 15)),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("nvarchar", 45)),
            ColumnType::Json | ColumnType::Jsonb => TypeRule::Fallback(NativeType::new("nclob")),
            ColumnType::Enum => TypeRule::Native(NativeType::with_length("nvarchar", 255)),
            ColumnType::Blob => TypeRule::Native(NativeType::new("blob")),
        }
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::Parenthesized("ALTER")
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::Suffix("GENERATED BY DEFAULT AS IDENTITY")
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(127)
    }
}
