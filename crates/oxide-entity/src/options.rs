//! Data source configuration.

use oxide_entity_core::dialect::DialectKind;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options of a [`DataSource`](crate::DataSource).
///
/// ```rust
/// use oxide_entity::DataSourceOptions;
///
/// let options = DataSourceOptions::from_json(r#"{"synchronize": true, "schema": "app"}"#).unwrap();
/// assert!(options.synchronize);
/// assert_eq!(options.schema.as_deref(), Some("app"));
/// assert!(!options.acknowledge_data_loss);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSourceOptions {
    /// Dialect override; the driver's engine when absent.
    #[serde(alias = "type")]
    pub dialect: Option<DialectKind>,
    /// Default database for entities that name none.
    pub database: Option<String>,
    /// Default schema for entities that name none.
    pub schema: Option<String>,
    /// Server version override; asked from the driver when absent.
    pub version: Option<String>,
    /// Assume the newest feature set when the version is unknown.
    pub assume_latest_version: bool,
    /// Fail instead of falling back when a type needs a newer server.
    pub strict_types: bool,
    /// Synchronize the schema during initialization.
    pub synchronize: bool,
    /// Apply plans that drop tables or columns.
    pub acknowledge_data_loss: bool,
    /// Log every executed statement at info level.
    pub log_sql: bool,
}

impl DataSourceOptions {
    /// Reads options from a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enables synchronization during initialization.
    #[must_use]
    pub const fn synchronize(mut self) -> Self {
        self.synchronize = true;
        self
    }

    /// Allows synchronization to drop data.
    #[must_use]
    pub const fn acknowledge_data_loss(mut self) -> Self {
        self.acknowledge_data_loss = true;
        self
    }

    /// Sets the default schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the default database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Overrides the server version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_and_flags_from_json() {
        let options = DataSourceOptions::from_json(
            r#"{"type": "postgres", "version": "PostgreSQL 9.6.24", "strictTypes": true, "logSql": true}"#,
        )
        .unwrap();
        assert_eq!(options.dialect, Some(DialectKind::Postgres));
        assert_eq!(options.version.as_deref(), Some("PostgreSQL 9.6.24"));
        assert!(options.strict_types);
        assert!(options.log_sql);
        assert!(!options.synchronize);
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        assert!(DataSourceOptions::from_json(r#"{"dialect": "db2"}"#).is_err());
    }
}
