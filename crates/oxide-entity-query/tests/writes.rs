mod common;

use common::{blog, inheritance, postgres, sqlite, text};
use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor};
use oxide_entity_core::metadata::MetadataRegistry;
use oxide_entity_core::types::ColumnType;
use oxide_entity_core::value::SqlValue;
use oxide_entity_query::{prop, DeleteQuery, InsertQuery, QueryError, UpdateQuery, Values};
use uuid::Uuid;

#[test]
fn insert_generates_uuid_keys() {
    let registry = MetadataRegistry::build(
        postgres(),
        &[EntityDescriptor::new("Session")
            .column(ColumnDescriptor::uuid_primary("id"))
            .column(ColumnDescriptor::new("token", ColumnType::Varchar))],
    )
    .unwrap();
    let plan = InsertQuery::new(&registry, "Session")
        .unwrap()
        .value("token", text("abc"))
        .build()
        .unwrap();
    let id = plan.values()["id"].as_text().unwrap();
    assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);

    let insert = plan.compile(&registry, 0).unwrap();
    assert_eq!(insert.sql, "INSERT INTO \"session\" (\"id\", \"token\") VALUES ($1, $2)");
    assert_eq!(insert.parameters[1], text("abc"));
}

#[test]
fn insert_returns_increment_keys_where_supported() {
    let registry = blog(postgres());
    let plan = InsertQuery::new(&registry, "Post")
        .unwrap()
        .value("title", text("hi"))
        .value("author", SqlValue::Int(3))
        .build()
        .unwrap();
    let insert = plan.compile(&registry, 0).unwrap();
    assert_eq!(
        insert.sql,
        "INSERT INTO \"post\" (\"title\", \"author_id\") VALUES ($1, $2) RETURNING \"id\""
    );
    assert_eq!(plan.steps()[0].generated_key.as_deref(), Some("id"));
}

#[test]
fn insert_requires_non_nullable_values() {
    let registry = blog(sqlite());
    let err = InsertQuery::new(&registry, "User").unwrap().build().unwrap_err();
    assert_eq!(
        err,
        QueryError::MissingValue {
            entity: "User".into(),
            property: "name".into(),
        }
    );
    let err = InsertQuery::new(&registry, "User")
        .unwrap()
        .value("nickname", text("x"))
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::UnknownProperty { .. }));
}

#[test]
fn insert_single_table_child_writes_discriminator() {
    let registry = inheritance(sqlite());
    let plan = InsertQuery::new(&registry, "Photo")
        .unwrap()
        .value("title", text("sunset"))
        .build()
        .unwrap();
    assert_eq!(plan.values()["type"], text("Photo"));
    let insert = plan.compile(&registry, 0).unwrap();
    assert!(insert.sql.starts_with("INSERT INTO \"content\" ("));
}

#[test]
fn insert_class_table_child_writes_root_first() {
    let registry = inheritance(sqlite());
    let mut plan = InsertQuery::new(&registry, "Manager")
        .unwrap()
        .value("name", text("Ada"))
        .value("level", SqlValue::Int(2))
        .build()
        .unwrap();
    assert_eq!(plan.steps().len(), 2);
    let root = plan.compile(&registry, 0).unwrap();
    assert_eq!(root.sql, "INSERT INTO \"employee\" (\"name\") VALUES (?) RETURNING \"id\"");

    assert!(matches!(
        plan.compile(&registry, 1),
        Err(QueryError::MissingPrimaryKey { .. })
    ));
    plan.set_value("id", SqlValue::Int(41));
    let child = plan.compile(&registry, 1).unwrap();
    assert_eq!(child.sql, "INSERT INTO \"manager\" (\"id\", \"level\") VALUES (?, ?)");
    assert_eq!(child.parameters, vec![SqlValue::Int(41), SqlValue::Int(2)]);
}

#[test]
fn update_by_key() {
    let registry = blog(postgres());
    let updates = UpdateQuery::new(&registry, "User")
        .unwrap()
        .set("name", "bob")
        .where_id(1)
        .build()
        .unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].sql, "UPDATE \"user\" SET \"name\" = $1 WHERE \"id\" = $2");
    assert_eq!(updates[0].parameters, vec![text("bob"), SqlValue::Int(1)]);
}

#[test]
fn update_with_filter() {
    let registry = blog(sqlite());
    let updates = UpdateQuery::new(&registry, "Post")
        .unwrap()
        .set("title", "x")
        .where_(prop("author").eq(2).or(prop("title").like("draft%")))
        .build()
        .unwrap();
    assert_eq!(
        updates[0].sql,
        "UPDATE \"post\" SET \"title\" = ? WHERE \"author_id\" = ? OR \"title\" LIKE ?"
    );
}

#[test]
fn update_across_class_tables_needs_a_key() {
    let registry = inheritance(sqlite());
    let err = UpdateQuery::new(&registry, "Manager")
        .unwrap()
        .set("name", "x")
        .set("level", 3)
        .where_(prop("level").gt(1))
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::MultiTableFilter { .. }));

    let updates = UpdateQuery::new(&registry, "Manager")
        .unwrap()
        .set("name", "x")
        .set("level", 3)
        .where_id(9)
        .build()
        .unwrap();
    let sql: Vec<&str> = updates.iter().map(|u| u.sql.as_str()).collect();
    assert_eq!(
        sql,
        vec![
            "UPDATE \"employee\" SET \"name\" = ? WHERE \"id\" = ?",
            "UPDATE \"manager\" SET \"level\" = ? WHERE \"id\" = ?",
        ]
    );
}

#[test]
fn empty_update_is_rejected() {
    let registry = blog(sqlite());
    let err = UpdateQuery::new(&registry, "User").unwrap().where_id(1).build().unwrap_err();
    assert_eq!(err, QueryError::EmptyUpdate { entity: "User".into() });
}

#[test]
fn delete_single_table_child_keeps_siblings() {
    let registry = inheritance(postgres());
    let delete = DeleteQuery::new(&registry, "Photo")
        .unwrap()
        .where_(prop("size").gt(10))
        .build()
        .unwrap();
    assert_eq!(
        delete.sql,
        "DELETE FROM \"content\" WHERE (\"size\" > $1) AND \"type\" IN ($2)"
    );
}

#[test]
fn delete_class_table_child_through_root() {
    let registry = inheritance(postgres());
    let delete = DeleteQuery::new(&registry, "Manager").unwrap().where_id(4).build().unwrap();
    assert_eq!(delete.sql, "DELETE FROM \"employee\" WHERE \"id\" = $1");
}

#[test]
fn composite_key_requires_every_part() {
    let registry = blog(postgres());
    let mut key = Values::new();
    key.insert("post_id".into(), SqlValue::Int(1));
    let err = DeleteQuery::new(&registry, "post_tags_tag")
        .unwrap()
        .where_key(key)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::MissingPrimaryKey {
            entity: "post_tags_tag".into(),
            property: "tag_id".into(),
        }
    );
}
