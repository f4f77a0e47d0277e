#![allow(dead_code)]

use std::sync::Arc;

use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
use oxide_entity_core::dialect::{DatabaseVersion, DialectCapability, DialectKind};
use oxide_entity_core::metadata::{InheritanceStrategy, MetadataRegistry};
use oxide_entity_core::types::ColumnType;
use oxide_entity_query::Row;
use oxide_entity_core::value::SqlValue;

pub fn postgres() -> DialectCapability {
    DialectCapability::new(DialectKind::Postgres).with_version(DatabaseVersion::new(15, 3, 0))
}

pub fn sqlite() -> DialectCapability {
    DialectCapability::new(DialectKind::Sqlite).with_version(DatabaseVersion::new(3, 45, 1))
}

pub fn mssql() -> DialectCapability {
    DialectCapability::new(DialectKind::Mssql).assume_latest()
}

/// Users writing posts, posts tagged many-to-many, and a self-referencing
/// category tree.
pub fn blog_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("User")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar))
            .column(ColumnDescriptor::new("ipv6", ColumnType::Inet6).nullable())
            .relation(RelationDescriptor::one_to_many("posts", "Post", "author")),
        EntityDescriptor::new("Post")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("title", ColumnType::Varchar))
            .relation(RelationDescriptor::many_to_one("author", "User"))
            .relation(RelationDescriptor::many_to_many("tags", "Tag")),
        EntityDescriptor::new("Tag")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar)),
        EntityDescriptor::new("Category")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar))
            .relation(RelationDescriptor::many_to_one("parent", "Category"))
            .relation(RelationDescriptor::one_to_many("children", "Category", "parent")),
    ]
}

/// Single-table content hierarchy and class-table staff hierarchy.
pub fn inheritance_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("Content")
            .inheritance_root(InheritanceStrategy::SingleTable)
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("title", ColumnType::Varchar)),
        EntityDescriptor::new("Photo")
            .extends("Content")
            .column(ColumnDescriptor::new("size", ColumnType::Integer).nullable()),
        EntityDescriptor::new("Video")
            .extends("Content")
            .column(ColumnDescriptor::new("length", ColumnType::Integer).nullable()),
        EntityDescriptor::new("Employee")
            .inheritance_root(InheritanceStrategy::ClassTable)
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar)),
        EntityDescriptor::new("Manager")
            .extends("Employee")
            .column(ColumnDescriptor::new("level", ColumnType::Integer)),
    ]
}

pub fn blog(capability: DialectCapability) -> Arc<MetadataRegistry> {
    MetadataRegistry::build(capability, &blog_entities()).unwrap()
}

pub fn inheritance(capability: DialectCapability) -> Arc<MetadataRegistry> {
    MetadataRegistry::build(capability, &inheritance_entities()).unwrap()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}
