//! The boundary between generated SQL and a database connection.
//!
//! Query builders only produce [`CompiledQuery`](oxide_entity_query::CompiledQuery)
//! values; a [`Driver`] executes them, reports the server version used for
//! capability detection and introspects the live schema for
//! synchronization.

mod sqlite;

use std::future::Future;

use oxide_entity_core::dialect::DialectKind;
use oxide_entity_core::value::SqlValue;
use oxide_entity_query::Row;
use oxide_entity_sync::SchemaSnapshot;

use crate::error::Result;

pub use sqlite::SqliteDriver;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Key generated by the last insert, when the engine reports one.
    pub last_insert_id: Option<i64>,
}

/// A database connection able to run compiled statements.
pub trait Driver: Send + Sync {
    /// Engine the driver talks to.
    fn kind(&self) -> DialectKind;

    /// Executes a statement that returns no rows.
    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Runs a query and returns its rows keyed by column label.
    fn query(&self, sql: &str, params: &[SqlValue]) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Reads the tables, columns, indexes and foreign keys of the database.
    fn introspect_schema(&self) -> impl Future<Output = Result<SchemaSnapshot>> + Send;

    /// Vendor version string of the server.
    fn database_version(&self) -> impl Future<Output = Result<String>> + Send;
}
