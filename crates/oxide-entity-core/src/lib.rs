//! # oxide-entity-core
//!
//! Entity metadata for a multi-dialect ORM.
//!
//! This crate provides:
//! - Declarative entity descriptors, loadable from JSON
//! - Per-engine dialect strategies with version-gated type capabilities
//! - A type mapper resolving abstract column types to native ones
//! - A metadata builder normalizing descriptors into an entity graph
//! - A validator collecting every semantic rule violation
//!
//! ## Building metadata
//!
//! ```rust
//! use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor};
//! use oxide_entity_core::dialect::{DatabaseVersion, DialectCapability, DialectKind};
//! use oxide_entity_core::metadata::MetadataRegistry;
//! use oxide_entity_core::types::ColumnType;
//!
//! let capability = DialectCapability::new(DialectKind::MariaDb)
//!     .with_version(DatabaseVersion::new(10, 10, 0));
//! let registry = MetadataRegistry::build(
//!     capability,
//!     &[EntityDescriptor::new("User")
//!         .column(ColumnDescriptor::uuid_primary("id"))
//!         .column(ColumnDescriptor::new("ip", ColumnType::Inet6).nullable())],
//! )
//! .unwrap();
//!
//! let user = registry.find("User").unwrap();
//! assert_eq!(user.column("id").unwrap().native.to_sql(), "uuid");
//! assert_eq!(user.column("ip").unwrap().native.to_sql(), "inet6");
//! ```

pub mod builder;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod metadata;
pub mod type_mapper;
pub mod types;
pub mod validator;
pub mod value;

pub use builder::MetadataBuilder;
pub use descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
pub use dialect::{Dialect, DialectCapability, DialectKind};
pub use error::{BuildError, MetadataError, ValidationError, ValidationErrors};
pub use metadata::{EntityId, EntityMetadata, MetadataRegistry};
pub use type_mapper::TypeMapper;
pub use types::{ColumnType, GenerationStrategy, NativeType};
pub use validator::MetadataValidator;
pub use value::{SqlValue, ToSqlValue};
