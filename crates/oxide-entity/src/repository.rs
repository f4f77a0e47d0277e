//! Entity-scoped reads and writes.

use std::collections::HashSet;

use oxide_entity_core::metadata::{EntityId, EntityMetadata};
use oxide_entity_core::value::{SqlValue, ToSqlValue};
use oxide_entity_query::{
    prop, DeleteQuery, EntityInstance, Expr, Hydrator, InsertQuery, OrderBy, QueryError,
    SelectQuery, UpdateQuery, Values,
};
use tracing::debug;

use crate::data_source::DataSource;
use crate::driver::Driver;
use crate::error::{OrmError, Result};

/// What [`Repository::find`] loads.
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// Relation paths to join, relative to the entity (`posts`,
    /// `posts.tags`).
    pub relations: Vec<String>,
    /// Join relations marked eager.
    pub eager: bool,
    /// Filter over property paths.
    pub filter: Option<Expr>,
    /// Ordering.
    pub order: Vec<OrderBy>,
    /// Maximum number of entities.
    pub take: Option<u64>,
    /// Entities to skip.
    pub skip: Option<u64>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            relations: Vec::new(),
            eager: true,
            filter: None,
            order: Vec::new(),
            take: None,
            skip: None,
        }
    }
}

impl FindOptions {
    /// Loads every entity with its eager relations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the relation at `path`.
    #[must_use]
    pub fn relation(mut self, path: impl Into<String>) -> Self {
        self.relations.push(path.into());
        self
    }

    /// Skips eager relations.
    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.eager = false;
        self
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Adds an ordering.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Limits the number of entities.
    #[must_use]
    pub const fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Skips the first `skip` entities.
    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Reads and writes instances of one entity.
#[derive(Debug)]
pub struct Repository<'a, D: Driver> {
    source: &'a DataSource<D>,
    entity: EntityId,
}

impl<'a, D: Driver> Repository<'a, D> {
    pub(crate) const fn new(source: &'a DataSource<D>, entity: EntityId) -> Self {
        Self { source, entity }
    }

    /// Metadata of the entity.
    #[must_use]
    pub fn metadata(&self) -> &'a EntityMetadata {
        self.source.registry().get(self.entity)
    }

    /// Inserts an entity and returns it as stored, generated values
    /// included.
    pub async fn save(&self, values: Values) -> Result<EntityInstance> {
        let registry = self.source.registry();
        let entity = self.metadata();
        let mut plan = InsertQuery::new(registry, &entity.name)?.values(values).build()?;

        for index in 0..plan.steps().len() {
            let step = plan.steps()[index].clone();
            let query = plan.compile(registry, index)?;
            let Some(property) = step.generated_key else {
                self.source.execute(&query).await?;
                continue;
            };
            let missing = || OrmError::MissingGeneratedKey {
                entity: entity.name.clone(),
                property: property.clone(),
            };
            let generated = if step.returning {
                let column = registry
                    .get(step.entity)
                    .column(&property)
                    .map_or_else(|| property.clone(), |c| c.database_name.clone());
                let rows = self.source.query(&query).await?;
                rows.first()
                    .and_then(|row| row.get(&column))
                    .filter(|value| !value.is_null())
                    .cloned()
                    .ok_or_else(missing)?
            } else {
                let result = self.source.execute(&query).await?;
                SqlValue::Int(result.last_insert_id.ok_or_else(missing)?)
            };
            debug!(entity = %entity.name, property = %property, "generated key read back");
            plan.set_value(&property, generated);
        }

        let mut key: Option<Expr> = None;
        for column in entity.primary_columns() {
            let value = plan.values().get(&column.property_path).cloned().unwrap_or(SqlValue::Null);
            let condition = prop(&column.property_path).eq(value);
            key = Some(match key {
                Some(expr) => expr.and(condition),
                None => condition,
            });
        }
        let mut options = FindOptions::new();
        options.filter = key;
        self.find(options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::NotFound(entity.name.clone()))
    }

    /// Loads entities with their joined relations.
    pub async fn find(&self, options: FindOptions) -> Result<Vec<EntityInstance>> {
        let select = self.select(&options);
        let compiled = select.build()?;
        let rows = self.source.query(&compiled.query).await?;
        let instances = Hydrator::new(self.source.registry(), &compiled.plan).hydrate(&rows)?;
        debug!(
            entity = %self.metadata().name,
            rows = rows.len(),
            instances = instances.len(),
            "entities loaded"
        );
        Ok(instances)
    }

    /// First entity matching `filter`.
    pub async fn find_one_by(&self, filter: Expr) -> Result<Option<EntityInstance>> {
        let found = self.find(FindOptions::new().filter(filter)).await?;
        Ok(found.into_iter().next())
    }

    /// Entity with the single-column primary key `id`.
    pub async fn find_by_id<T: ToSqlValue>(&self, id: T) -> Result<Option<EntityInstance>> {
        let id = id.to_sql_value();
        let entity = self.metadata();
        let key = entity
            .primary_columns()
            .next()
            .ok_or_else(|| QueryError::MissingPrimaryKey {
                entity: entity.name.clone(),
                property: String::from("id"),
            })?;
        let found = self
            .find(FindOptions::new().filter(prop(&key.property_path).eq(id)))
            .await?;
        Ok(found.into_iter().next())
    }

    /// Number of entities matching `filter`.
    pub async fn count(&self, filter: Option<Expr>) -> Result<u64> {
        let mut options = FindOptions::new().lazy();
        options.filter = filter;
        let query = self.select(&options).build_count()?;
        let rows = self.source.query(&query).await?;
        let count = match rows.first().and_then(|row| row.get("cnt")) {
            Some(SqlValue::Int(n)) => u64::try_from(*n).unwrap_or_default(),
            _ => 0,
        };
        Ok(count)
    }

    /// Updates the entity with the single-column primary key `id` and
    /// returns the number of rows written.
    pub async fn update_by_id<T: ToSqlValue>(&self, id: T, values: Values) -> Result<u64> {
        let statements = UpdateQuery::new(self.source.registry(), &self.metadata().name)?
            .set_all(values)
            .where_id(id)
            .build()?;
        let mut affected = 0;
        for statement in &statements {
            affected += self.source.execute(statement).await?.rows_affected;
        }
        Ok(affected)
    }

    /// Deletes the entity with the single-column primary key `id` and
    /// returns the number of rows removed.
    pub async fn delete_by_id<T: ToSqlValue>(&self, id: T) -> Result<u64> {
        let query = DeleteQuery::new(self.source.registry(), &self.metadata().name)?
            .where_id(id)
            .build()?;
        Ok(self.source.execute(&query).await?.rows_affected)
    }

    fn select(&self, options: &FindOptions) -> SelectQuery<'a> {
        let alias = self.metadata().table_name.clone();
        let mut select = SelectQuery::for_entity(self.source.registry(), self.entity, &alias);

        // nested paths join each prefix once, under its generated alias
        let mut joined = HashSet::new();
        for path in &options.relations {
            let mut parent = alias.clone();
            for property in path.split('.') {
                if joined.insert(format!("{parent}.{property}")) {
                    select = select.with_relation(&format!("{parent}.{property}"));
                }
                parent = format!("{parent}_{property}");
            }
        }
        if options.eager {
            select = select.with_eager_relations();
        }
        if let Some(filter) = &options.filter {
            select = select.where_(filter.clone());
        }
        for order in &options.order {
            select = select.order_by(order.clone());
        }
        if let Some(take) = options.take {
            select = select.take(take);
        }
        if let Some(skip) = options.skip {
            select = select.skip(skip);
        }
        select
    }
}
