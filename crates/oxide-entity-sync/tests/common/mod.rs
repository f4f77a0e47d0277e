#![allow(dead_code)]

use std::sync::Arc;

use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, IndexDescriptor, RelationDescriptor};
use oxide_entity_core::dialect::{DatabaseVersion, DialectCapability, DialectKind};
use oxide_entity_core::metadata::{InheritanceStrategy, MetadataRegistry, ReferentialAction};
use oxide_entity_core::types::ColumnType;
use oxide_entity_sync::{Operation, SchemaSnapshot, SyncPlan};

pub fn capability(kind: DialectKind) -> DialectCapability {
    match kind {
        DialectKind::Postgres => DialectCapability::new(kind).with_version(DatabaseVersion::new(15, 3, 0)),
        DialectKind::MySql => DialectCapability::new(kind).with_version(DatabaseVersion::new(8, 0, 36)),
        DialectKind::Sqlite => DialectCapability::new(kind).with_version(DatabaseVersion::new(3, 45, 1)),
        other => DialectCapability::new(other).assume_latest(),
    }
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

pub fn registry(kind: DialectKind, entities: &[EntityDescriptor]) -> Arc<MetadataRegistry> {
    MetadataRegistry::build(capability(kind), entities).unwrap()
}

pub fn target(kind: DialectKind, entities: &[EntityDescriptor]) -> SchemaSnapshot {
    SchemaSnapshot::from_metadata(&registry(kind, entities))
}

/// Variant names of the plan's operations, in order.
pub fn kinds(plan: &SyncPlan) -> Vec<&'static str> {
    plan.operations
        .iter()
        .map(|op| match op {
            Operation::CreateTable(_) => "CreateTable",
            Operation::DropTable(_) => "DropTable",
            Operation::AddColumn { .. } => "AddColumn",
            Operation::DropColumn { .. } => "DropColumn",
            Operation::AlterColumn { .. } => "AlterColumn",
            Operation::RebuildTable { .. } => "RebuildTable",
            Operation::CreateIndex { .. } => "CreateIndex",
            Operation::DropIndex { .. } => "DropIndex",
            Operation::AddForeignKey { .. } => "AddForeignKey",
            Operation::DropForeignKey { .. } => "DropForeignKey",
        })
        .collect()
}
