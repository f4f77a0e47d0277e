//! Connection plus published metadata.

use std::sync::Arc;

use oxide_entity_core::descriptor::EntityDescriptor;
use oxide_entity_core::dialect::DialectCapability;
use oxide_entity_core::metadata::MetadataRegistry;
use oxide_entity_query::{CompiledQuery, QueryError, Row};
use oxide_entity_sync::{SchemaSnapshot, SchemaSynchronizer, SyncPlan};
use tracing::{debug, info};

use crate::driver::{Driver, QueryResult};
use crate::error::Result;
use crate::options::DataSourceOptions;
use crate::repository::Repository;

/// A database connection together with the validated metadata of its
/// entities.
///
/// Metadata is built once during [`initialize`](Self::initialize) and shared
/// read-only afterwards.
#[derive(Debug)]
pub struct DataSource<D: Driver> {
    driver: D,
    options: DataSourceOptions,
    registry: Arc<MetadataRegistry>,
}

impl<D: Driver> DataSource<D> {
    /// Detects the server capability, builds and validates metadata for
    /// `descriptors`, then synchronizes the schema when
    /// [`DataSourceOptions::synchronize`] is set.
    pub async fn initialize(
        driver: D,
        options: DataSourceOptions,
        descriptors: &[EntityDescriptor],
    ) -> Result<Self> {
        let version = match &options.version {
            Some(version) => version.clone(),
            None => driver.database_version().await?,
        };
        let kind = options.dialect.unwrap_or_else(|| driver.kind());
        let mut capability = DialectCapability::detect(kind, &version);
        if options.assume_latest_version {
            capability = capability.assume_latest();
        }
        if options.strict_types {
            capability = capability.strict();
        }

        let descriptors: Vec<EntityDescriptor> = descriptors
            .iter()
            .cloned()
            .map(|mut descriptor| {
                if descriptor.database.is_none() {
                    descriptor.database.clone_from(&options.database);
                }
                if descriptor.schema.is_none() {
                    descriptor.schema.clone_from(&options.schema);
                }
                descriptor
            })
            .collect();
        let registry = MetadataRegistry::build(capability, &descriptors)?;
        info!(
            dialect = %capability.kind,
            version = %version,
            entities = registry.len(),
            "data source initialized"
        );

        let source = Self {
            driver,
            options,
            registry,
        };
        if source.options.synchronize {
            source.synchronize().await?;
        }
        Ok(source)
    }

    /// Published metadata.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// The driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Options the source was initialized with.
    #[must_use]
    pub const fn options(&self) -> &DataSourceOptions {
        &self.options
    }

    /// Diffs the live schema against the metadata. The plan is already
    /// acknowledged when [`DataSourceOptions::acknowledge_data_loss`] is set.
    pub async fn plan_synchronization(&self) -> Result<SyncPlan> {
        let current = self.driver.introspect_schema().await?;
        let target = SchemaSnapshot::from_metadata(&self.registry);
        let mut plan = SchemaSynchronizer::new(self.registry.dialect()).diff(&current, &target);
        if self.options.acknowledge_data_loss {
            plan.acknowledge_data_loss();
        }
        Ok(plan)
    }

    /// Brings the live schema in line with the metadata.
    ///
    /// Statements run one by one without a wrapping transaction; a plan
    /// with unacknowledged data-loss warnings is refused before anything
    /// runs.
    pub async fn synchronize(&self) -> Result<SyncPlan> {
        let plan = self.plan_synchronization().await?;
        plan.ensure_acknowledged()?;
        if plan.is_empty() {
            info!("schema up to date");
            return Ok(plan);
        }
        for statement in &plan.statements {
            self.log(statement);
            self.driver.execute(statement, &[]).await?;
        }
        info!(statements = plan.statements.len(), "schema synchronized");
        Ok(plan)
    }

    /// Runs a compiled query and returns its rows.
    pub async fn query(&self, query: &CompiledQuery) -> Result<Vec<Row>> {
        self.log(&query.sql);
        self.driver.query(&query.sql, &query.parameters).await
    }

    /// Executes a compiled statement.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<QueryResult> {
        self.log(&query.sql);
        self.driver.execute(&query.sql, &query.parameters).await
    }

    /// Repository for the entity named `entity`.
    pub fn repository(&self, entity: &str) -> Result<Repository<'_, D>> {
        let id = self
            .registry
            .find(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?
            .id;
        Ok(Repository::new(self, id))
    }

    fn log(&self, sql: &str) {
        if self.options.log_sql {
            info!(sql = %sql, "executing");
        } else {
            debug!(sql = %sql, "executing");
        }
    }
}
