//! # oxide-entity-query
//!
//! Statement builders and result hydration over entity metadata.
//!
//! Statements are written against entity properties and relations; the
//! builders resolve them through a [`MetadataRegistry`], quote identifiers
//! for the registry's dialect and bind every value as a parameter.
//!
//! - [`SelectQuery`]: joins, eager relations, filters, ordering, pagination
//! - [`InsertQuery`], [`UpdateQuery`], [`DeleteQuery`]: writes, including
//!   multi-table inheritance chains
//! - [`Hydrator`]: collapses joined rows into [`EntityInstance`] trees
//!
//! [`MetadataRegistry`]: oxide_entity_core::metadata::MetadataRegistry

pub mod delete;
pub mod error;
pub mod expr;
pub mod hydrator;
pub mod insert;
pub mod instance;
pub mod select;
pub mod update;

pub use delete::DeleteQuery;
pub use error::{QueryError, Result};
pub use expr::{prop, CompiledQuery, Expr, PropertyResolver, SqlWriter};
pub use hydrator::{Hydrator, Row};
pub use insert::{InsertPlan, InsertQuery, InsertStep, Values};
pub use instance::{EntityInstance, FieldValue};
pub use select::{CompiledSelect, JoinKind, OrderBy, OrderDirection, SelectPlan, SelectQuery};
pub use update::UpdateQuery;
