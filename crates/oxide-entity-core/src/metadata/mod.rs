//! The normalized entity metadata graph.
//!
//! Relations point at their targets by [`EntityId`] rather than by reference,
//! so circular entity graphs need no shared ownership.

mod column;
mod entity;
mod registry;
mod relation;

pub use column::{ColumnDefault, ColumnMetadata, TypeModifiers};
pub use entity::{
    EntityId, EntityMetadata, ForeignKeyMetadata, IndexMetadata, InheritanceStrategy, TableType,
};
pub use registry::MetadataRegistry;
pub use relation::{JoinColumn, JunctionMetadata, ReferentialAction, RelationKind, RelationMetadata};
