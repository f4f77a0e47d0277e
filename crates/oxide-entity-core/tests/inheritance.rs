//! Single-table, class-table and table-per-class hierarchies.

mod common;

use common::{postgres, sqlite};
use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
use oxide_entity_core::error::{MetadataError, ValidationError};
use oxide_entity_core::metadata::{InheritanceStrategy, MetadataRegistry, TableType};
use oxide_entity_core::types::ColumnType;

/// A single-table tree of `depth` levels with `width` children per node.
fn generated_tree(depth: usize, width: usize, database: &str) -> Vec<EntityDescriptor> {
    let mut descriptors = vec![EntityDescriptor::new("Node")
        .database(database)
        .inheritance_root(InheritanceStrategy::SingleTable)
        .column(ColumnDescriptor::increment_primary("id"))];
    let mut level = vec![String::from("Node")];
    for d in 0..depth {
        let mut next = Vec::new();
        for parent in &level {
            for w in 0..width {
                let name = format!("{parent}L{d}W{w}");
                descriptors.push(
                    EntityDescriptor::new(&name)
                        .extends(parent.as_str())
                        .column(ColumnDescriptor::new(format!("f{d}{w}"), ColumnType::Integer).nullable()),
                );
                next.push(name);
            }
        }
        level = next;
    }
    descriptors
}

#[test]
fn single_table_children_inherit_root_database() {
    for depth in 1..=3 {
        for width in 1..=3 {
            let database = format!("db_{depth}_{width}");
            let descriptors = generated_tree(depth, width, &database);
            let registry = MetadataRegistry::build(sqlite(), &descriptors).unwrap();
            let root = registry.find("Node").unwrap();
            assert_eq!(registry.descendants(root.id).len(), descriptors.len());
            for entity in registry.iter() {
                assert_eq!(entity.database.as_deref(), Some(database.as_str()), "{}", entity.name);
                assert_eq!(entity.table_name, "node");
            }
            assert_eq!(registry.tables().count(), 1);
        }
    }
}

#[test]
fn single_table_child_overriding_database_is_a_validation_error() {
    let mut descriptors = generated_tree(2, 2, "test");
    let last = descriptors.len() - 1;
    descriptors[last] = descriptors[last].clone().database("elsewhere");
    let err = MetadataRegistry::build(sqlite(), &descriptors).unwrap_err();
    let MetadataError::Validation(errors) = err else {
        panic!("expected validation error, got {err}");
    };
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors.first(),
        Some(ValidationError::InheritedOptionMismatch { option: "database", .. })
    ));
}

#[test]
fn single_table_root_holds_union_of_columns() {
    let descriptors = generated_tree(2, 2, "test");
    let registry = MetadataRegistry::build(sqlite(), &descriptors).unwrap();
    let root = registry.find("Node").unwrap();
    // id, discriminator, then one column per descendant
    assert_eq!(root.columns.len(), 2 + descriptors.len() - 1);
    assert!(root.columns.iter().skip(2).all(|c| c.nullable));
    let leaf = registry.find("NodeL0W1L1W0").unwrap();
    assert_eq!(leaf.table_type, TableType::StiChild);
    assert_eq!(leaf.discriminator_value.as_deref(), Some("NodeL0W1L1W0"));
    assert!(leaf.column("f01").is_some());
    assert!(leaf.column("f10").is_some());
    assert!(leaf.column("f00").is_none());
}

#[test]
fn declared_discriminator_column_is_reused() {
    let registry = MetadataRegistry::build(
        sqlite(),
        &[
            EntityDescriptor::new("Vehicle")
                .inheritance_root(InheritanceStrategy::SingleTable)
                .discriminator_column("kind")
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("kind", ColumnType::Varchar).length(20)),
            EntityDescriptor::new("Car").extends("Vehicle").discriminator_value("car"),
        ],
    )
    .unwrap();
    let vehicle = registry.find("Vehicle").unwrap();
    assert_eq!(vehicle.columns.len(), 2);
    let discriminator = vehicle.discriminator().unwrap();
    assert_eq!(discriminator.database_name, "kind");
    assert_eq!(discriminator.native.to_sql(), "varchar(20)");
}

#[test]
fn child_relations_are_inherited_in_single_table() {
    let registry = MetadataRegistry::build(
        postgres(),
        &[
            EntityDescriptor::new("Account").column(ColumnDescriptor::increment_primary("id")),
            EntityDescriptor::new("Content")
                .inheritance_root(InheritanceStrategy::SingleTable)
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::many_to_one("owner", "Account")),
            EntityDescriptor::new("Photo")
                .extends("Content")
                .relation(RelationDescriptor::many_to_one("approver", "Account")),
        ],
    )
    .unwrap();
    let photo = registry.find("Photo").unwrap();
    let names: Vec<&str> = photo.relations.iter().map(|r| r.property.as_str()).collect();
    assert_eq!(names, vec!["owner", "approver"]);
    assert!(photo.column_by_name("owner_id").is_some());

    let content = registry.find("Content").unwrap();
    assert!(content.column_by_name("approver_id").unwrap().nullable);
    assert_eq!(content.foreign_keys.len(), 2);
}

#[test]
fn class_table_hierarchy_has_one_table_per_entity() {
    let registry = MetadataRegistry::build(
        postgres(),
        &[
            EntityDescriptor::new("Person")
                .schema("hr")
                .inheritance_root(InheritanceStrategy::ClassTable)
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar)),
            EntityDescriptor::new("Employee")
                .extends("Person")
                .column(ColumnDescriptor::new("salary", ColumnType::Decimal).precision(12, Some(2))),
            EntityDescriptor::new("Manager")
                .extends("Employee")
                .column(ColumnDescriptor::new("level", ColumnType::SmallInt)),
        ],
    )
    .unwrap();
    assert_eq!(registry.tables().count(), 3);
    let manager = registry.find("Manager").unwrap();
    assert_eq!(manager.schema.as_deref(), Some("hr"));
    assert_eq!(manager.primary_key_count(), 1);
    assert_eq!(manager.foreign_keys[0].referenced_table, "employee");
    assert!(!manager.primary_columns().next().unwrap().is_increment());
}
