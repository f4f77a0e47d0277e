//! Error types for query building and hydration.

use thiserror::Error;

/// Errors raised while building a statement or hydrating rows.
///
/// Every error is raised when the statement is built, never deferred to
/// execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The entity is not registered.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// An expression or join refers to an alias that is not in the query.
    #[error("unknown alias `{0}`")]
    UnknownAlias(String),

    /// An explicit alias is already taken.
    #[error("alias `{0}` is already used in this query")]
    DuplicateAlias(String),

    /// A property path does not name a column.
    #[error("entity `{entity}` has no property `{property}`")]
    UnknownProperty {
        /// Entity name.
        entity: String,
        /// Property path.
        property: String,
    },

    /// A join path does not name a relation.
    #[error("entity `{entity}` has no relation `{relation}`")]
    UnknownRelation {
        /// Entity name.
        entity: String,
        /// Relation property.
        relation: String,
    },

    /// A required value was not supplied for an insert.
    #[error("entity `{entity}`: no value for non-nullable property `{property}`")]
    MissingValue {
        /// Entity name.
        entity: String,
        /// Property path.
        property: String,
    },

    /// A primary-key value is missing where a row must be identified.
    #[error("entity `{entity}`: primary key `{property}` has no value")]
    MissingPrimaryKey {
        /// Entity name.
        entity: String,
        /// Primary-key property.
        property: String,
    },

    /// `take`/`skip` need a single-column primary key on the root entity.
    #[error("entity `{entity}`: take/skip need a single-column primary key")]
    CompositeKeyPagination {
        /// Entity name.
        entity: String,
    },

    /// An update spanning several tables needs a primary-key filter.
    #[error("entity `{entity}`: updates across inherited tables must filter by primary key")]
    MultiTableFilter {
        /// Entity name.
        entity: String,
    },

    /// An update without any assignment.
    #[error("entity `{entity}`: nothing to update")]
    EmptyUpdate {
        /// Entity name.
        entity: String,
    },

    /// A result row lacks a label the plan selected.
    #[error("result row has no column `{0}`")]
    MissingColumn(String),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
