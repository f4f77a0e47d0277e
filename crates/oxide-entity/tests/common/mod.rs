#![allow(dead_code)]

use oxide_entity::{DataSource, DataSourceOptions, SqliteDriver};
use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, IndexDescriptor, RelationDescriptor};
use oxide_entity_core::metadata::{InheritanceStrategy, ReferentialAction};
use oxide_entity_core::types::ColumnType;
use oxide_entity_core::value::SqlValue;
use oxide_entity_query::Values;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn blog_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("User")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(100))
            .column(ColumnDescriptor::new("active", ColumnType::Boolean).default_value(true))
            .column(ColumnDescriptor::new("ipv6", ColumnType::Inet6).nullable())
            .index(IndexDescriptor::on(["name"]))
            .relation(RelationDescriptor::one_to_many("posts", "Post", "author")),
        EntityDescriptor::new("Post")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("title", ColumnType::Varchar).length(200))
            .relation(RelationDescriptor {
                on_delete: Some(ReferentialAction::Cascade),
                ..RelationDescriptor::many_to_one("author", "User")
            })
            .relation(RelationDescriptor::many_to_many("tags", "Tag")),
        EntityDescriptor::new("Tag")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(64).unique()),
    ]
}

pub fn inheritance_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("Content")
            .inheritance_root(InheritanceStrategy::SingleTable)
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("title", ColumnType::Varchar).length(200)),
        EntityDescriptor::new("Photo")
            .extends("Content")
            .column(ColumnDescriptor::new("size", ColumnType::Integer)),
        EntityDescriptor::new("Employee")
            .inheritance_root(InheritanceStrategy::ClassTable)
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(100)),
        EntityDescriptor::new("Manager")
            .extends("Employee")
            .column(ColumnDescriptor::new("level", ColumnType::Integer)),
    ]
}

/// In-memory data source with its schema created.
pub async fn source(entities: &[EntityDescriptor]) -> DataSource<SqliteDriver> {
    init_tracing();
    let driver = SqliteDriver::in_memory().await.unwrap();
    DataSource::initialize(driver, DataSourceOptions::default().synchronize(), entities)
        .await
        .unwrap()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

pub fn values(pairs: &[(&str, SqlValue)]) -> Values {
    pairs
        .iter()
        .map(|(property, value)| ((*property).to_string(), value.clone()))
        .collect()
}

pub fn id_of(instance: &oxide_entity::EntityInstance) -> i64 {
    match instance.scalar("id") {
        Some(SqlValue::Int(id)) => *id,
        other => panic!("no integer id: {other:?}"),
    }
}
