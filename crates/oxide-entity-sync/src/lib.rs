//! Schema synchronization for entity metadata.
//!
//! `oxide-entity-sync` compares the tables a database has with the tables
//! entity metadata expects and plans the DDL that reconciles them:
//!
//! - **Snapshots** - [`SchemaSnapshot`]s describe tables, columns, indexes
//!   and foreign keys, either derived from metadata or introspected
//! - **Synchronizer** - [`SchemaSynchronizer::diff`] orders the
//!   [`Operation`]s so that every statement is valid when it runs
//! - **DDL** - [`DdlRenderer`] renders operations for the registry's dialect
//!
//! Plans that drop tables, drop columns or recreate columns carry
//! [`DataLossWarning`]s and are refused until acknowledged.
//!
//! # Example
//!
//! ```rust
//! use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor};
//! use oxide_entity_core::dialect::{DialectCapability, DialectKind};
//! use oxide_entity_core::metadata::MetadataRegistry;
//! use oxide_entity_core::types::ColumnType;
//! use oxide_entity_sync::{SchemaSnapshot, SchemaSynchronizer};
//!
//! let registry = MetadataRegistry::build(
//!     DialectCapability::new(DialectKind::Sqlite),
//!     &[EntityDescriptor::new("Tag")
//!         .column(ColumnDescriptor::increment_primary("id"))
//!         .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(64))],
//! )
//! .unwrap();
//!
//! let target = SchemaSnapshot::from_metadata(&registry);
//! let plan = SchemaSynchronizer::new(registry.dialect()).diff(&SchemaSnapshot::new(), &target);
//! assert_eq!(
//!     plan.statements,
//!     [r#"CREATE TABLE "tag" ("id" integer PRIMARY KEY AUTOINCREMENT NOT NULL, "name" varchar(64) NOT NULL)"#]
//! );
//!
//! // a schema in sync produces no work
//! assert!(SchemaSynchronizer::new(registry.dialect()).diff(&target, &target).is_empty());
//! ```

pub mod ddl;
pub mod error;
pub mod operations;
pub mod snapshot;
pub mod synchronizer;

pub use ddl::DdlRenderer;
pub use error::{Result, SyncError};
pub use operations::{ColumnChange, Operation};
pub use snapshot::{
    ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, SchemaSnapshot, TableName, TableSnapshot,
};
pub use synchronizer::{DataLossWarning, SchemaSynchronizer, SyncPlan};
