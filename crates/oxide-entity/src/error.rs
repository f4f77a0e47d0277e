//! Error types for the data source and repositories.

use oxide_entity_core::error::MetadataError;
use oxide_entity_query::QueryError;
use oxide_entity_sync::SyncError;
use thiserror::Error;

/// Errors raised while talking to a database through entity metadata.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity metadata could not be built or failed validation.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A statement could not be generated or a result not hydrated.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Schema synchronization refused or failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Options could not be read.
    #[error("invalid data source options: {0}")]
    Options(#[from] serde_json::Error),

    /// A database-generated key was not reported back.
    #[error("entity `{entity}`: database did not return the generated `{property}`")]
    MissingGeneratedKey {
        /// Entity name.
        entity: String,
        /// Key property.
        property: String,
    },

    /// A saved row could not be read back.
    #[error("entity `{0}`: saved row not found")]
    NotFound(String),

    /// The schema reported by the database could not be read.
    #[error("schema introspection failed: {0}")]
    Introspection(String),
}

/// Result type alias for data source operations.
pub type Result<T> = std::result::Result<T, OrmError>;
