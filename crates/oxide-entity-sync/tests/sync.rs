//! Diff planning against metadata-derived snapshots.

mod common;

use common::{blog_entities, inheritance_entities, kinds, target};
use oxide_entity_core::dialect::{dialect_for, DialectKind};
use oxide_entity_core::metadata::ReferentialAction;
use oxide_entity_sync::{
    ColumnChange, ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, Operation, SchemaSnapshot,
    SchemaSynchronizer, SyncError, TableName, TableSnapshot,
};

fn synchronizer(kind: DialectKind) -> SchemaSynchronizer<'static> {
    SchemaSynchronizer::new(dialect_for(kind))
}

/// What a SQLite connection reports for `snapshot`: upper-case type names,
/// unnamed foreign keys and explicit `NO ACTION`s.
fn as_introspected(snapshot: &SchemaSnapshot) -> SchemaSnapshot {
    let mut introspected = snapshot.clone();
    for table in introspected.tables.values_mut() {
        for column in &mut table.columns {
            column.data_type = column.data_type.to_ascii_uppercase();
            column.enum_values.clear();
        }
        for fk in &mut table.foreign_keys {
            fk.name = None;
            fk.on_delete = fk.on_delete.or(Some(ReferentialAction::NoAction));
            fk.on_update = fk.on_update.or(Some(ReferentialAction::NoAction));
        }
    }
    introspected
}

#[test]
fn metadata_tables_include_junctions() {
    let snapshot = target(DialectKind::Sqlite, &blog_entities());
    let keys: Vec<&str> = snapshot.tables.keys().map(String::as_str).collect();
    assert_eq!(keys, ["post", "post_tags_tag", "tag", "user"]);

    let junction = snapshot.table("post_tags_tag").unwrap();
    assert_eq!(junction.primary_key, ["post_id", "tag_id"]);
    assert_eq!(junction.foreign_keys.len(), 2);
    assert!(junction
        .foreign_keys
        .iter()
        .all(|fk| fk.on_delete == Some(ReferentialAction::Cascade)));

    let user = snapshot.table("user").unwrap();
    assert!(user.get_column("id").unwrap().autoincrement);
    assert!(!user.get_column("name").unwrap().nullable);
    assert!(user.get_column("ipv6").unwrap().nullable);
    assert_eq!(user.get_column("ipv6").unwrap().data_type, "varchar(45)");
    assert_eq!(user.get_column("active").unwrap().default.as_deref(), Some("1"));
}

#[test]
fn single_table_children_share_the_root_table() {
    let snapshot = target(DialectKind::Postgres, &inheritance_entities());
    let keys: Vec<&str> = snapshot.tables.keys().map(String::as_str).collect();
    assert_eq!(keys, ["content", "employee", "manager"]);

    let content = snapshot.table("content").unwrap();
    let columns: Vec<&str> = content.columns.iter().map(|c| c.name.as_str()).collect();
    assert!(columns.contains(&"type"));
    assert!(columns.contains(&"size"));
    // declared NOT NULL on the child, nullable in the shared table
    assert!(content.get_column("size").unwrap().nullable);

    let manager = snapshot.table("manager").unwrap();
    assert_eq!(manager.primary_key, ["id"]);
    assert!(manager
        .foreign_keys
        .iter()
        .any(|fk| fk.referenced_table == TableName::new("employee")));
}

#[test]
fn empty_database_creates_tables_in_dependency_order() {
    let plan = synchronizer(DialectKind::Postgres)
        .diff(&SchemaSnapshot::new(), &target(DialectKind::Postgres, &blog_entities()));

    let created: Vec<String> = plan
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::CreateTable(table) => Some(table.name.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(created, ["tag", "user", "post", "post_tags_tag"]);
    assert_eq!(
        kinds(&plan),
        [
            "CreateTable",
            "CreateTable",
            "CreateTable",
            "CreateTable",
            "CreateIndex",
            "CreateIndex",
            "CreateIndex",
            "AddForeignKey",
            "AddForeignKey",
            "AddForeignKey",
        ]
    );
    assert!(plan.warnings.is_empty());
    assert!(plan.statements.contains(
        &r#"CREATE TABLE "post" ("id" serial NOT NULL, "title" varchar(200) NOT NULL, "author_id" integer, PRIMARY KEY ("id"))"#
            .to_string()
    ));
    assert!(plan.statements.contains(
        &r#"ALTER TABLE "post" ADD CONSTRAINT "FK_post_author_id" FOREIGN KEY ("author_id") REFERENCES "user" ("id") ON DELETE CASCADE"#
            .to_string()
    ));
}

#[test]
fn sqlite_creates_foreign_keys_with_the_table() {
    let plan = synchronizer(DialectKind::Sqlite)
        .diff(&SchemaSnapshot::new(), &target(DialectKind::Sqlite, &blog_entities()));
    assert!(!kinds(&plan).contains(&"AddForeignKey"));
    assert!(plan
        .statements
        .iter()
        .any(|s| s.starts_with(r#"CREATE TABLE "post""#) && s.contains("REFERENCES \"user\" (\"id\") ON DELETE CASCADE")));
}

#[test]
fn diffing_a_schema_against_itself_is_empty() {
    for kind in [DialectKind::Postgres, DialectKind::MySql, DialectKind::Sqlite, DialectKind::Mssql] {
        let snapshot = target(kind, &blog_entities());
        let plan = synchronizer(kind).diff(&snapshot, &snapshot);
        assert!(plan.is_empty(), "{kind}: {:?}", plan.operations);
        assert!(plan.statements.is_empty());
    }
}

#[test]
fn introspected_spelling_does_not_produce_changes() {
    let wanted = target(DialectKind::Sqlite, &blog_entities());
    let plan = synchronizer(DialectKind::Sqlite).diff(&as_introspected(&wanted), &wanted);
    assert!(plan.is_empty(), "{:?}", plan.operations);

    let wanted = target(DialectKind::MySql, &blog_entities());
    let mut current = wanted.clone();
    for column in &mut current.tables.get_mut("user").unwrap().columns {
        if column.data_type == "int" {
            column.data_type = String::from("INTEGER");
        }
    }
    assert!(synchronizer(DialectKind::MySql).diff(&current, &wanted).is_empty());
}

#[test]
fn dropped_columns_need_acknowledgement() {
    let wanted = target(DialectKind::Postgres, &blog_entities());
    let mut current = wanted.clone();
    current.add_table(
        current
            .table("tag")
            .unwrap()
            .clone()
            .column(ColumnSnapshot::new("legacy", "text")),
    );

    let mut plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["DropColumn"]);
    assert_eq!(plan.statements, [r#"ALTER TABLE "tag" DROP COLUMN "legacy""#]);
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].column.as_deref(), Some("legacy"));

    let error = plan.ensure_acknowledged().unwrap_err();
    assert!(matches!(error, SyncError::SynchronizationDataLossWarning(ref w) if w.len() == 1));
    assert!(error.to_string().contains("tag.legacy"));

    plan.acknowledge_data_loss();
    assert!(plan.ensure_acknowledged().is_ok());
}

#[test]
fn type_family_change_recreates_the_column() {
    let wanted = SchemaSnapshot::new().with_table(
        TableSnapshot::new(TableName::new("item"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("code", "integer"))
            .column(ColumnSnapshot::new("label", "varchar(255)"))
            .primary_key(["id"]),
    );
    let current = SchemaSnapshot::new().with_table(
        TableSnapshot::new(TableName::new("item"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("code", "varchar(20)"))
            .column(ColumnSnapshot::new("label", "varchar(36)"))
            .primary_key(["id"]),
    );

    let plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["DropColumn", "AddColumn", "AlterColumn"]);
    assert_eq!(
        plan.statements,
        [
            r#"ALTER TABLE "item" DROP COLUMN "code""#,
            r#"ALTER TABLE "item" ADD COLUMN "code" integer"#,
            r#"ALTER TABLE "item" ALTER COLUMN "label" TYPE varchar(255)"#,
        ]
    );
    // widening keeps the data
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].column.as_deref(), Some("code"));
    let Operation::AlterColumn { changes, .. } = &plan.operations[2] else {
        panic!("expected an alter");
    };
    assert_eq!(changes, &[ColumnChange::Type]);
}

#[test]
fn sqlite_type_change_recreates_the_column() {
    let wanted = SchemaSnapshot::new().with_table(
        TableSnapshot::new(TableName::new("item"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("label", "varchar(255)"))
            .primary_key(["id"]),
    );
    let current = SchemaSnapshot::new().with_table(
        TableSnapshot::new(TableName::new("item"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("label", "varchar(36)"))
            .primary_key(["id"]),
    );
    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["DropColumn", "AddColumn"]);
    assert_eq!(plan.warnings.len(), 1);
}

#[test]
fn sqlite_rebuilds_tables_for_required_or_unique_columns() {
    let item = || {
        TableSnapshot::new(TableName::new("item"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("label", "varchar(36)"))
            .primary_key(["id"])
    };
    let current = SchemaSnapshot::new().with_table(item());

    let wanted = SchemaSnapshot::new()
        .with_table(item().column(ColumnSnapshot::new("rank", "integer").not_null()));
    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["RebuildTable"]);
    assert!(plan.statements.contains(
        &r#"INSERT INTO "temporary_item" ("id", "label", "rank") SELECT "id", "label", 0 FROM "item""#.to_string()
    ));
    // engines with column alteration add it in place
    let plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["AddColumn"]);

    let wanted = SchemaSnapshot::new()
        .with_table(item().column(ColumnSnapshot::new("code", "varchar(8)").unique()));
    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["RebuildTable"]);
    assert!(plan.statements.contains(
        &r#"INSERT INTO "temporary_item" ("id", "label") SELECT "id", "label" FROM "item""#.to_string()
    ));

    // a default fills existing rows, so a plain ADD COLUMN works
    let wanted = SchemaSnapshot::new().with_table(
        item().column(ColumnSnapshot::new("rank", "integer").not_null().default("0")),
    );
    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["AddColumn"]);
}

#[test]
fn sqlite_rebuilds_tables_for_nullability_changes() {
    let wanted = target(DialectKind::Sqlite, &blog_entities());
    let mut current = wanted.clone();
    for column in &mut current.tables.get_mut("tag").unwrap().columns {
        if column.name == "name" {
            column.nullable = true;
        }
    }

    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["RebuildTable"]);
    assert!(plan.warnings.is_empty());
    assert_eq!(plan.statements.first().map(String::as_str), Some("PRAGMA foreign_keys = OFF"));
    assert!(plan
        .statements
        .contains(&r#"ALTER TABLE "temporary_tag" RENAME TO "tag""#.to_string()));

    let plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(plan.statements, [r#"ALTER TABLE "tag" ALTER COLUMN "name" SET NOT NULL"#]);
}

#[test]
fn operations_follow_dependency_phases() {
    let user = || {
        TableSnapshot::new(TableName::new("user"))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("name", "varchar(100)").not_null())
            .primary_key(["id"])
    };
    let referencing = |name: &str| {
        TableSnapshot::new(TableName::new(name))
            .column(ColumnSnapshot::new("id", "integer").not_null())
            .column(ColumnSnapshot::new("user_id", "integer"))
            .primary_key(["id"])
            .foreign_key(ForeignKeySnapshot {
                name: Some(format!("FK_{name}_user_id")),
                columns: vec!["user_id".into()],
                referenced_table: TableName::new("user"),
                referenced_columns: vec!["id".into()],
                on_delete: None,
                on_update: None,
            })
    };
    let current = SchemaSnapshot::new()
        .with_table(user().index(IndexSnapshot {
            name: "IDX_user_name".into(),
            columns: vec!["name".into()],
            unique: false,
        }))
        .with_table(referencing("legacy"));
    let wanted = SchemaSnapshot::new()
        .with_table(
            user()
                .column(ColumnSnapshot::new("email", "varchar(255)"))
                .index(IndexSnapshot {
                    name: "IDX_user_email".into(),
                    columns: vec!["email".into()],
                    unique: true,
                }),
        )
        .with_table(referencing("comment"));

    let plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(
        kinds(&plan),
        [
            "DropIndex",
            "DropTable",
            "CreateTable",
            "AddColumn",
            "CreateIndex",
            "AddForeignKey",
        ]
    );
    assert_eq!(
        plan.statements,
        [
            r#"DROP INDEX "IDX_user_name""#,
            r#"DROP TABLE "legacy""#,
            r#"CREATE TABLE "comment" ("id" integer NOT NULL, "user_id" integer, PRIMARY KEY ("id"))"#,
            r#"ALTER TABLE "user" ADD COLUMN "email" varchar(255)"#,
            r#"CREATE UNIQUE INDEX "IDX_user_email" ON "user" ("email")"#,
            r#"ALTER TABLE "comment" ADD CONSTRAINT "FK_comment_user_id" FOREIGN KEY ("user_id") REFERENCES "user" ("id")"#,
        ]
    );
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].table, "legacy");
}

#[test]
fn referencing_tables_are_dropped_first() {
    let current = target(DialectKind::Postgres, &blog_entities());
    let plan = synchronizer(DialectKind::Postgres).diff(&current, &SchemaSnapshot::new());
    let dropped: Vec<String> = plan
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::DropTable(table) => Some(table.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(dropped, ["post_tags_tag", "post", "user", "tag"]);
    assert_eq!(plan.warnings.len(), 4);
    assert!(plan.ensure_acknowledged().is_err());
}

#[test]
fn changed_foreign_key_actions_are_replaced() {
    let wanted = target(DialectKind::Postgres, &blog_entities());
    let mut current = wanted.clone();
    for fk in &mut current.tables.get_mut("post").unwrap().foreign_keys {
        fk.on_delete = Some(ReferentialAction::SetNull);
    }
    let plan = synchronizer(DialectKind::Postgres).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["DropForeignKey", "AddForeignKey"]);
    assert_eq!(
        plan.statements[0],
        r#"ALTER TABLE "post" DROP CONSTRAINT "FK_post_author_id""#
    );

    let wanted = target(DialectKind::Sqlite, &blog_entities());
    let mut current = wanted.clone();
    for fk in &mut current.tables.get_mut("post").unwrap().foreign_keys {
        fk.on_delete = None;
    }
    let plan = synchronizer(DialectKind::Sqlite).diff(&current, &wanted);
    assert_eq!(kinds(&plan), ["RebuildTable"]);
}
