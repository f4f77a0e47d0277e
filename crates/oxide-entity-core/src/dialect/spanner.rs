//! Cloud Spanner strategy.

use super::{AlterColumnStyle, Dialect, DialectKind, IncrementStyle, TypeRule};
use crate::types::{ColumnType, ModifierRules, NativeType};

/// Google Cloud Spanner (GoogleSQL dialect).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannerDialect;

impl SpannerDialect {
    /// Creates a new Spanner strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SpannerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Spanner
    }

    fn name(&self) -> &'static str {
        "spanner"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@param{index}")
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        match column_type {
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                TypeRule::Native(NativeType::new("int64"))
            }
            ColumnType::Float | ColumnType::Double => TypeRule::Native(NativeType::new("float64")),
            ColumnType::Decimal => TypeRule::Native(NativeType::new("numeric")),
            ColumnType::Boolean => TypeRule::Native(NativeType::new("bool")),
            ColumnType::Char | ColumnType::Varchar => {
                TypeRule::Native(NativeType::with_length("string", 255))
            }
            ColumnType::Text => TypeRule::Native(NativeType::with_max_length("string")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Timestamp | ColumnType::TimestampTz => {
                TypeRule::Native(NativeType::new("timestamp"))
            }
            ColumnType::Uuid => TypeRule::Fallback(NativeType::with_length("string", 36)),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("string", 15)),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("string", 45)),
            ColumnType::Json | ColumnType::Jsonb => TypeRule::Native(NativeType::new("json")),
            ColumnType::Blob => TypeRule::Native(NativeType::with_max_length("bytes")),
            ColumnType::Time | ColumnType::Enum => TypeRule::Unsupported,
        }
    }

    fn modifier_rules(&self, native_name: &str) -> ModifierRules {
        match native_name {
            "string" | "bytes" => ModifierRules::LENGTH,
            _ => ModifierRules::NONE,
        }
    }

    fn current_timestamp(&self) -> &'static str {
        "PENDING_COMMIT_TIMESTAMP()"
    }

    fn qualifiers<'a>(&self, _schema: Option<&'a str>, _database: Option<&'a str>) -> Vec<&'a str> {
        Vec::new()
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::AlterColumnFull
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::Unsupported
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(128)
    }
}
