//! SQLite driver over a sqlx pool.

use std::collections::BTreeMap;

use oxide_entity_core::dialect::DialectKind;
use oxide_entity_core::metadata::ReferentialAction;
use oxide_entity_core::value::SqlValue;
use oxide_entity_query::Row;
use oxide_entity_sync::{
    ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, SchemaSnapshot, TableName, TableSnapshot,
};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

use super::{Driver, QueryResult};
use crate::error::{OrmError, Result};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Driver for SQLite databases.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` (`sqlite://app.db`, `sqlite::memory:`).
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(SqlitePool::connect(url).await?))
    }

    /// Opens a private in-memory database.
    ///
    /// Every pooled connection would see its own empty database, so the
    /// pool is limited to one connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn table(&self, name: &str, sql: &str) -> Result<TableSnapshot> {
        let mut table = TableSnapshot::new(TableName::new(name));

        let rows = sqlx::query(
            r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        let mut primary: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let column_name: String = row.try_get("name")?;
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                primary.push((pk, column_name.clone()));
            }
        }
        let autoincrement = primary.len() == 1 && sql.to_ascii_uppercase().contains("AUTOINCREMENT");
        for row in &rows {
            let column_name: String = row.try_get("name")?;
            let mut column = ColumnSnapshot::new(column_name.as_str(), row.try_get::<String, _>("type")?);
            if row.try_get::<i64, _>("notnull")? != 0 {
                column = column.not_null();
            }
            if let Some(default) = row.try_get::<Option<String>, _>("dflt_value")? {
                column = column.default(default);
            }
            if autoincrement && row.try_get::<i64, _>("pk")? > 0 {
                column = column.autoincrement();
            }
            table = table.column(column);
        }
        primary.sort_by_key(|(position, _)| *position);
        table = table.primary_key(primary.into_iter().map(|(_, column)| column));

        for foreign_key in self.foreign_keys(name).await? {
            table = table.foreign_key(foreign_key);
        }

        let indexes = sqlx::query(r#"SELECT name, "unique", origin FROM pragma_index_list(?1)"#)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        for row in &indexes {
            let index_name: String = row.try_get("name")?;
            let unique = row.try_get::<i64, _>("unique")? != 0;
            let origin: String = row.try_get("origin")?;
            let columns = self.index_columns(&index_name).await?;
            match origin.as_str() {
                "pk" => {}
                // a UNIQUE column constraint
                "u" if columns.len() == 1 => {
                    if let Some(snapshot) = table.columns.iter_mut().find(|c| c.name == columns[0]) {
                        snapshot.unique = true;
                    }
                }
                _ => {
                    table = table.index(IndexSnapshot {
                        name: index_name,
                        columns,
                        unique,
                    });
                }
            }
        }
        table.indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(table)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeySnapshot>> {
        let rows = sqlx::query(
            r#"SELECT id, seq, "table", "from", "to", on_update, on_delete
               FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<i64, ForeignKeySnapshot> = BTreeMap::new();
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let referenced: String = row.try_get("table")?;
            let on_delete = referential_action(&row.try_get::<String, _>("on_delete")?)?;
            let on_update = referential_action(&row.try_get::<String, _>("on_update")?)?;
            let foreign_key = grouped.entry(id).or_insert_with(|| ForeignKeySnapshot {
                name: None,
                columns: Vec::new(),
                referenced_table: TableName::new(referenced),
                referenced_columns: Vec::new(),
                on_delete: Some(on_delete),
                on_update: Some(on_update),
            });
            foreign_key.columns.push(row.try_get("from")?);
            foreign_key.referenced_columns.push(row.try_get("to")?);
        }
        Ok(grouped.into_values().collect())
    }

    async fn index_columns(&self, index: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
            .bind(index)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get("name").map_err(OrmError::from))
            .collect()
    }
}

impl Driver for SqliteDriver {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(QueryResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(convert_row).collect()
    }

    async fn introspect_schema(&self) -> Result<SchemaSnapshot> {
        let tables = sqlx::query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = SchemaSnapshot::new();
        for row in &tables {
            let name: String = row.try_get("name")?;
            let sql: Option<String> = row.try_get("sql")?;
            snapshot.add_table(self.table(&name, sql.as_deref().unwrap_or_default()).await?);
        }
        debug!(tables = snapshot.tables.len(), "sqlite schema introspected");
        Ok(snapshot)
    }

    async fn database_version(&self) -> Result<String> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }
}

fn referential_action(action: &str) -> Result<ReferentialAction> {
    ReferentialAction::from_sql(action)
        .ok_or_else(|| OrmError::Introspection(format!("unknown referential action `{action}`")))
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &'q [SqlValue]) -> SqliteQuery<'q> {
    for param in params {
        query = bind_param(query, param);
    }
    query
}

fn bind_param<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Blob(b) => query.bind(b.as_slice()),
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}

/// Reads every column by its label, keeping SQLite's storage class.
fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let storage = raw.type_info().name().to_ascii_uppercase();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked(index)?),
                "REAL" => SqlValue::Float(row.try_get_unchecked(index)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
                _ => SqlValue::Text(row.try_get_unchecked(index)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
