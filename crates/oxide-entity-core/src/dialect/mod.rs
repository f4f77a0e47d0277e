//! Dialect strategies.
//!
//! Every supported engine is described by a strategy object implementing
//! [`Dialect`]. Strategies answer questions (how to quote, which native type,
//! which placeholder) instead of callers branching on the engine. Several
//! engine identifiers share one strategy (e.g. `CockroachDb` and
//! `AuroraPostgres` use [`PostgresDialect`]).

mod capability;
mod duckdb;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sap;
mod spanner;
mod sqlite;
mod version;

pub use capability::DialectCapability;
pub use duckdb::DuckDbDialect;
pub use mssql::MssqlDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sap::SapHanaDialect;
pub use spanner::SpannerDialect;
pub use sqlite::SqliteDialect;
pub use version::DatabaseVersion;

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnType, ModifierRules, NativeType};
use crate::value::SqlValue;

/// Engine identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectKind {
    /// PostgreSQL.
    #[serde(rename = "postgres", alias = "postgresql")]
    Postgres,
    /// CockroachDB.
    #[serde(rename = "cockroachdb")]
    CockroachDb,
    /// Aurora PostgreSQL (data API).
    #[serde(rename = "aurora-postgres")]
    AuroraPostgres,
    /// MySQL.
    #[serde(rename = "mysql")]
    MySql,
    /// MariaDB.
    #[serde(rename = "mariadb")]
    MariaDb,
    /// Aurora MySQL (data API).
    #[serde(rename = "aurora-mysql")]
    AuroraMySql,
    /// SQLite.
    #[serde(rename = "sqlite")]
    Sqlite,
    /// SQLite through better-sqlite3.
    #[serde(rename = "better-sqlite3")]
    BetterSqlite3,
    /// SQLite compiled to WebAssembly.
    #[serde(rename = "sqljs")]
    SqlJs,
    /// Microsoft SQL Server.
    #[serde(rename = "mssql")]
    Mssql,
    /// Oracle Database.
    #[serde(rename = "oracle")]
    Oracle,
    /// SAP HANA.
    #[serde(rename = "sap")]
    SapHana,
    /// Google Cloud Spanner.
    #[serde(rename = "spanner")]
    Spanner,
    /// DuckDB.
    #[serde(rename = "duckdb")]
    DuckDb,
}

impl DialectKind {
    /// Every engine identifier.
    pub const ALL: [Self; 14] = [
        Self::Postgres,
        Self::CockroachDb,
        Self::AuroraPostgres,
        Self::MySql,
        Self::MariaDb,
        Self::AuroraMySql,
        Self::Sqlite,
        Self::BetterSqlite3,
        Self::SqlJs,
        Self::Mssql,
        Self::Oracle,
        Self::SapHana,
        Self::Spanner,
        Self::DuckDb,
    ];

    /// Canonical identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::CockroachDb => "cockroachdb",
            Self::AuroraPostgres => "aurora-postgres",
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::AuroraMySql => "aurora-mysql",
            Self::Sqlite => "sqlite",
            Self::BetterSqlite3 => "better-sqlite3",
            Self::SqlJs => "sqljs",
            Self::Mssql => "mssql",
            Self::Oracle => "oracle",
            Self::SapHana => "sap",
            Self::Spanner => "spanner",
            Self::DuckDb => "duckdb",
        }
    }

    /// MySQL, MariaDB and Aurora MySQL.
    #[must_use]
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb | Self::AuroraMySql)
    }

    /// PostgreSQL, CockroachDB and Aurora PostgreSQL.
    #[must_use]
    pub const fn is_postgres_family(self) -> bool {
        matches!(self, Self::Postgres | Self::CockroachDb | Self::AuroraPostgres)
    }

    /// The SQLite-based drivers.
    #[must_use]
    pub const fn is_sqlite_family(self) -> bool {
        matches!(self, Self::Sqlite | Self::BetterSqlite3 | Self::SqlJs)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = crate::error::ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let kind = match folded.as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            "cockroachdb" | "cockroach" => Self::CockroachDb,
            "aurorapostgres" => Self::AuroraPostgres,
            "mysql" => Self::MySql,
            "mariadb" => Self::MariaDb,
            "auroramysql" => Self::AuroraMySql,
            "sqlite" => Self::Sqlite,
            "bettersqlite3" => Self::BetterSqlite3,
            "sqljs" => Self::SqlJs,
            "mssql" | "sqlserver" => Self::Mssql,
            "oracle" => Self::Oracle,
            "saphana" | "sap" => Self::SapHana,
            "spanner" => Self::Spanner,
            "duckdb" => Self::DuckDb,
            _ => return Err(crate::error::ParseTypeError(s.to_string())),
        };
        Ok(kind)
    }
}

/// How a dialect stores an abstract column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRule {
    /// Always available natively.
    Native(NativeType),
    /// Native from a server version on, `fallback` below it.
    Since {
        /// Native type.
        native: NativeType,
        /// First version with native support.
        since: DatabaseVersion,
        /// Substitute on older servers.
        fallback: NativeType,
    },
    /// Never native here; stored with a documented substitute.
    Fallback(NativeType),
    /// No mapping at all.
    Unsupported,
}

/// How auto-increment is expressed in a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementStyle {
    /// A keyword appended to the column (`AUTO_INCREMENT`, `IDENTITY(1,1)`).
    Suffix(&'static str),
    /// Integer type swapped for a serial type (`serial`, `bigserial`).
    SerialType,
    /// `integer PRIMARY KEY AUTOINCREMENT`, only valid inline.
    InlinePrimaryKey,
    /// Not available.
    Unsupported,
}

/// Statement shape used to change a column definition in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterColumnStyle {
    /// `ALTER COLUMN c TYPE t` plus `SET/DROP NOT NULL`.
    AlterType,
    /// `MODIFY COLUMN <definition>`.
    ModifyColumn,
    /// `ALTER COLUMN c t [NOT] NULL`.
    AlterColumnFull,
    /// `MODIFY (c t [NOT] NULL)` or `ALTER (c t [NOT] NULL)`.
    Parenthesized(&'static str),
    /// Columns cannot be changed in place; the table is rebuilt.
    Unsupported,
}

/// Engine-specific SQL behavior.
///
/// Provided methods hold the ANSI behavior; strategies override what differs.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Engine identifier this strategy was obtained for.
    fn kind(&self) -> DialectKind;

    /// Human-readable dialect name.
    fn name(&self) -> &'static str;

    /// Opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quotes an identifier, doubling embedded closing quotes.
    fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.quote_chars();
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Placeholder for the 1-based parameter `index`.
    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }

    /// Storage rule for an abstract type.
    fn type_rule(&self, column_type: ColumnType) -> TypeRule;

    /// Modifiers a native type accepts.
    fn modifier_rules(&self, native_name: &str) -> ModifierRules {
        match native_name {
            "char" | "varchar" | "nchar" | "nvarchar" | "character" | "character varying"
            | "varchar2" | "nvarchar2" | "binary" | "varbinary" | "bit" | "string" | "bytes" => {
                ModifierRules::LENGTH
            }
            "decimal" | "numeric" | "number" | "dec" => ModifierRules::NUMERIC,
            "time" | "timestamp" | "timestamptz" | "datetime" | "datetime2" | "datetimeoffset"
            | "float" => ModifierRules::PRECISION,
            _ => ModifierRules::NONE,
        }
    }

    /// Renders a literal for a `DEFAULT` clause.
    fn format_literal(&self, value: &SqlValue) -> String {
        value.to_sql_inline()
    }

    /// Expression for the current timestamp.
    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Qualifiers that prefix a table name (outermost first).
    fn qualifiers<'a>(&self, schema: Option<&'a str>, _database: Option<&'a str>) -> Vec<&'a str> {
        schema.into_iter().collect()
    }

    /// Quoted, qualified table path.
    fn table_path(&self, table: &str, schema: Option<&str>, database: Option<&str>) -> String {
        let mut parts: Vec<String> = self
            .qualifiers(schema, database)
            .into_iter()
            .map(|q| self.quote_identifier(q))
            .collect();
        parts.push(self.quote_identifier(table));
        parts.join(".")
    }

    /// `LIMIT`/`OFFSET` clause, prefixed with a space, or empty.
    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(l), Some(o)) => format!(" LIMIT {l} OFFSET {o}"),
            (Some(l), None) => format!(" LIMIT {l}"),
            (None, Some(o)) => format!(" OFFSET {o}"),
            (None, None) => String::new(),
        }
    }

    /// Whether `OFFSET` pagination requires an `ORDER BY` clause.
    fn pagination_requires_order(&self) -> bool {
        false
    }

    /// Whether `INSERT ... RETURNING` is available on this server.
    fn supports_returning(&self, _capability: &DialectCapability) -> bool {
        false
    }

    /// In-place column redefinition shape.
    fn alter_column_style(&self) -> AlterColumnStyle {
        AlterColumnStyle::AlterType
    }

    /// Whether foreign keys can be added to an existing table.
    fn supports_add_foreign_key(&self) -> bool {
        true
    }

    /// Whether columns can be dropped.
    fn supports_drop_column(&self) -> bool {
        true
    }

    /// Auto-increment rendering.
    fn increment_style(&self) -> IncrementStyle;

    /// Keyword after `DROP` when removing a foreign key.
    fn drop_foreign_key_keyword(&self) -> &'static str {
        "CONSTRAINT"
    }

    /// Whether `DROP INDEX` needs `ON <table>`.
    fn drop_index_needs_table(&self) -> bool {
        false
    }

    /// Longest identifier the engine accepts, if limited.
    fn max_identifier_length(&self) -> Option<usize> {
        None
    }

    /// Folds an introspected native type name onto the name this dialect
    /// emits, so snapshots compare equal.
    fn normalize_type_name(&self, name: &str) -> String {
        normalize_common_type_name(name)
    }
}

/// Folds engine-independent aliases of native type names.
#[must_use]
pub fn normalize_common_type_name(name: &str) -> String {
    let lowered = name.trim().to_ascii_lowercase();
    let folded = match lowered.as_str() {
        "int" | "int4" => "integer",
        "int2" => "smallint",
        "int8" => "bigint",
        "bool" => "boolean",
        "character varying" => "varchar",
        "character" => "char",
        "double precision" | "float8" => "double precision",
        "float4" => "real",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "time without time zone" => "time",
        "dec" => "decimal",
        other => other,
    };
    folded.to_string()
}

static POSTGRES: PostgresDialect = PostgresDialect::new(DialectKind::Postgres);
static COCKROACH: PostgresDialect = PostgresDialect::new(DialectKind::CockroachDb);
static AURORA_POSTGRES: PostgresDialect = PostgresDialect::new(DialectKind::AuroraPostgres);
static MYSQL: MySqlDialect = MySqlDialect::new(DialectKind::MySql);
static MARIADB: MySqlDialect = MySqlDialect::new(DialectKind::MariaDb);
static AURORA_MYSQL: MySqlDialect = MySqlDialect::new(DialectKind::AuroraMySql);
static SQLITE: SqliteDialect = SqliteDialect::new(DialectKind::Sqlite);
static BETTER_SQLITE3: SqliteDialect = SqliteDialect::new(DialectKind::BetterSqlite3);
static SQLJS: SqliteDialect = SqliteDialect::new(DialectKind::SqlJs);
static MSSQL: MssqlDialect = MssqlDialect::new();
static ORACLE: OracleDialect = OracleDialect::new();
static SAP_HANA: SapHanaDialect = SapHanaDialect::new();
static SPANNER: SpannerDialect = SpannerDialect::new();
static DUCKDB: DuckDbDialect = DuckDbDialect::new();

/// Returns the shared strategy for an engine.
#[must_use]
pub fn dialect_for(kind: DialectKind) -> &'static dyn Dialect {
    match kind {
        DialectKind::Postgres => &POSTGRES,
        DialectKind::CockroachDb => &COCKROACH,
        DialectKind::AuroraPostgres => &AURORA_POSTGRES,
        DialectKind::MySql => &MYSQL,
        DialectKind::MariaDb => &MARIADB,
        DialectKind::AuroraMySql => &AURORA_MYSQL,
        DialectKind::Sqlite => &SQLITE,
        DialectKind::BetterSqlite3 => &BETTER_SQLITE3,
        DialectKind::SqlJs => &SQLJS,
        DialectKind::Mssql => &MSSQL,
        DialectKind::Oracle => &ORACLE,
        DialectKind::SapHana => &SAP_HANA,
        DialectKind::Spanner => &SPANNER,
        DialectKind::DuckDb => &DUCKDB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_strategy() {
        for kind in DialectKind::ALL {
            assert_eq!(dialect_for(kind).kind(), kind);
        }
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(
            dialect_for(DialectKind::Postgres).quote_identifier("we\"ird"),
            "\"we\"\"ird\""
        );
        assert_eq!(
            dialect_for(DialectKind::MySql).quote_identifier("order"),
            "`order`"
        );
        assert_eq!(
            dialect_for(DialectKind::Mssql).quote_identifier("a]b"),
            "[a]]b]"
        );
    }

    #[test]
    fn placeholders_per_dialect() {
        assert_eq!(dialect_for(DialectKind::Postgres).placeholder(2), "$2");
        assert_eq!(dialect_for(DialectKind::MySql).placeholder(2), "?");
        assert_eq!(dialect_for(DialectKind::Mssql).placeholder(2), "@p2");
        assert_eq!(dialect_for(DialectKind::Oracle).placeholder(2), ":2");
        assert_eq!(dialect_for(DialectKind::Spanner).placeholder(2), "@param2");
    }

    #[test]
    fn kind_parsing_is_lenient() {
        assert_eq!("MariaDB".parse::<DialectKind>().unwrap(), DialectKind::MariaDb);
        assert_eq!(
            "better-sqlite3".parse::<DialectKind>().unwrap(),
            DialectKind::BetterSqlite3
        );
        assert!("db2".parse::<DialectKind>().is_err());
        let kind: DialectKind = serde_json::from_str("\"mariadb\"").unwrap();
        assert_eq!(kind, DialectKind::MariaDb);
    }

    #[test]
    fn table_paths_qualify_per_dialect() {
        assert_eq!(
            dialect_for(DialectKind::Postgres).table_path("user", Some("public"), Some("db")),
            "\"public\".\"user\""
        );
        assert_eq!(
            dialect_for(DialectKind::MySql).table_path("user", Some("ignored"), Some("test")),
            "`test`.`user`"
        );
        assert_eq!(
            dialect_for(DialectKind::Sqlite).table_path("user", Some("s"), Some("d")),
            "\"user\""
        );
    }

    #[test]
    fn common_type_aliases_fold() {
        assert_eq!(normalize_common_type_name("INT"), "integer");
        assert_eq!(normalize_common_type_name("character varying"), "varchar");
        assert_eq!(normalize_common_type_name("uuid"), "uuid");
    }
}
