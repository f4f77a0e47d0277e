//! MySQL family strategy.

use super::{
    AlterColumnStyle, DatabaseVersion, Dialect, DialectCapability, DialectKind, IncrementStyle,
    TypeRule,
};
use crate::types::{ColumnType, ModifierRules, NativeType};
use crate::value::SqlValue;

/// MySQL, MariaDB and Aurora MySQL.
///
/// MariaDB differs in its version-gated native types (`uuid` from 10.7,
/// `inet6` from 10.5, `inet4` from 10.10) and in `RETURNING` support.
#[derive(Debug, Clone, Copy)]
pub struct MySqlDialect {
    kind: DialectKind,
}

impl MySqlDialect {
    /// Creates the strategy for one of the MySQL engines.
    #[must_use]
    pub const fn new(kind: DialectKind) -> Self {
        Self { kind }
    }

    const fn is_mariadb(self) -> bool {
        matches!(self.kind, DialectKind::MariaDb)
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            DialectKind::MariaDb => "mariadb",
            DialectKind::AuroraMySql => "aurora-mysql",
            _ => "mysql",
        }
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn type_rule(&self, column_type: ColumnType) -> TypeRule {
        let since = |native: NativeType, since: DatabaseVersion, fallback: NativeType| TypeRule::Since {
            native,
            since,
            fallback,
        };
        match column_type {
            ColumnType::SmallInt => TypeRule::Native(NativeType::new("smallint")),
            ColumnType::Integer => TypeRule::Native(NativeType::new("int")),
            ColumnType::BigInt => TypeRule::Native(NativeType::new("bigint")),
            ColumnType::Float => TypeRule::Native(NativeType::new("float")),
            ColumnType::Double => TypeRule::Native(NativeType::new("double")),
            ColumnType::Decimal => TypeRule::Native(NativeType::new("decimal")),
            ColumnType::Boolean => TypeRule::Native(NativeType::with_length("tinyint", 1)),
            ColumnType::Char => TypeRule::Native(NativeType::new("char")),
            ColumnType::Varchar => TypeRule::Native(NativeType::with_length("varchar", 255)),
            ColumnType::Text => TypeRule::Native(NativeType::new("text")),
            ColumnType::Date => TypeRule::Native(NativeType::new("date")),
            ColumnType::Time => TypeRule::Native(NativeType::new("time")),
            ColumnType::Timestamp => TypeRule::Native(NativeType::new("datetime")),
            ColumnType::TimestampTz => TypeRule::Native(NativeType::new("timestamp")),
            ColumnType::Uuid if self.is_mariadb() => since(
                NativeType::new("uuid"),
                DatabaseVersion::new(10, 7, 0),
                NativeType::with_length("varchar", 36),
            ),
            ColumnType::Uuid => TypeRule::Fallback(NativeType::with_length("varchar", 36)),
            ColumnType::Inet4 if self.is_mariadb() => since(
                NativeType::new("inet4"),
                DatabaseVersion::new(10, 10, 0),
                NativeType::with_length("varchar", 15),
            ),
            ColumnType::Inet4 => TypeRule::Fallback(NativeType::with_length("varchar", 15)),
            ColumnType::Inet6 if self.is_mariadb() => since(
                NativeType::new("inet6"),
                DatabaseVersion::new(10, 5, 0),
                NativeType::with_length("varchar", 45),
            ),
            ColumnType::Inet6 => TypeRule::Fallback(NativeType::with_length("varchar", 45)),
            ColumnType::Json | ColumnType::Jsonb if self.is_mariadb() => since(
                NativeType::new("json"),
                DatabaseVersion::new(10, 2, 7),
                NativeType::new("longtext"),
            ),
            ColumnType::Json | ColumnType::Jsonb => since(
                NativeType::new("json"),
                DatabaseVersion::new(5, 7, 8),
                NativeType::new("longtext"),
            ),
            ColumnType::Enum => TypeRule::Native(NativeType::new("enum")),
            ColumnType::Blob => TypeRule::Native(NativeType::new("blob")),
        }
    }

    fn modifier_rules(&self, native_name: &str) -> ModifierRules {
        match native_name {
            // display width
            "tinyint" | "smallint" | "mediumint" | "int" | "bigint" => ModifierRules::LENGTH,
            "double" => ModifierRules::NUMERIC,
            "char" | "varchar" | "binary" | "varbinary" | "bit" => ModifierRules::LENGTH,
            "decimal" | "numeric" | "dec" => ModifierRules::NUMERIC,
            "float" | "time" | "datetime" | "timestamp" => ModifierRules::PRECISION,
            _ => ModifierRules::NONE,
        }
    }

    fn format_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
            other => other.to_sql_inline(),
        }
    }

    fn qualifiers<'a>(&self, _schema: Option<&'a str>, database: Option<&'a str>) -> Vec<&'a str> {
        database.into_iter().collect()
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!(" LIMIT {l} OFFSET {o}"),
            (Some(l), None) => format!(" LIMIT {l}"),
            // MySQL has no OFFSET without LIMIT
            (None, Some(o)) => format!(" LIMIT 18446744073709551615 OFFSET {o}"),
            (None, None) => String::new(),
        }
    }

    fn supports_returning(&self, capability: &DialectCapability) -> bool {
        self.is_mariadb() && capability.version_at_least(DatabaseVersion::new(10, 5, 0))
    }

    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::ModifyColumn
    }

    fn increment_style(&self) -> IncrementStyle {
        IncrementStyle::Suffix("AUTO_INCREMENT")
    }

    fn drop_foreign_key_keyword(&self) -> &'static str {
        "FOREIGN KEY"
    }

    fn drop_index_needs_table(&self) -> bool {
        true
    }

    fn max_identifier_length(&self) -> Option<usize> {
        Some(64)
    }

    fn normalize_type_name(&self, name: &str) -> String {
        match name.trim().to_ascii_lowercase().as_str() {
            "integer" => String::from("int"),
            "boolean" | "bool" => String::from("tinyint"),
            other => super::normalize_common_type_name(other),
        }
    }
}
