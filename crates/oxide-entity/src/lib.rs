//! Data sources and repositories over entity metadata.
//!
//! `oxide-entity` ties the metadata, query and synchronization crates to a
//! live database:
//!
//! - **Drivers** - the [`Driver`] trait executes compiled statements and
//!   introspects schemas; [`SqliteDriver`] implements it over sqlx
//! - **Data sources** - [`DataSource::initialize`] detects the server
//!   version, publishes validated metadata and optionally synchronizes
//! - **Repositories** - [`Repository`] saves, finds, counts, updates and
//!   deletes hydrated [`EntityInstance`]s
//!
//! # Example
//!
//! ```rust
//! use oxide_entity::{DataSource, DataSourceOptions, SqliteDriver};
//! use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor};
//! use oxide_entity_core::types::ColumnType;
//! use oxide_entity_core::value::SqlValue;
//! use oxide_entity_query::{prop, Values};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> oxide_entity::Result<()> {
//! let entities = [EntityDescriptor::new("Tag")
//!     .column(ColumnDescriptor::increment_primary("id"))
//!     .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(64))];
//!
//! let source = DataSource::initialize(
//!     SqliteDriver::in_memory().await?,
//!     DataSourceOptions::default().synchronize(),
//!     &entities,
//! )
//! .await?;
//!
//! let tags = source.repository("Tag")?;
//! let saved = tags
//!     .save(Values::from([(String::from("name"), SqlValue::Text(String::from("rust")))]))
//!     .await?;
//! assert_eq!(saved.scalar("id"), Some(&SqlValue::Int(1)));
//!
//! let found = tags.find_one_by(prop("name").eq("rust")).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod data_source;
pub mod driver;
pub mod error;
pub mod options;
pub mod repository;

pub use data_source::DataSource;
pub use driver::{Driver, QueryResult, SqliteDriver};
pub use error::{OrmError, Result};
pub use oxide_entity_query::EntityInstance;
pub use options::DataSourceOptions;
pub use repository::{FindOptions, Repository};
