#![allow(dead_code)]

use oxide_entity_core::descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
use oxide_entity_core::dialect::{DatabaseVersion, DialectCapability, DialectKind};
use oxide_entity_core::types::ColumnType;

pub fn mariadb_10_10() -> DialectCapability {
    DialectCapability::new(DialectKind::MariaDb).with_version(DatabaseVersion::new(10, 10, 0))
}

pub fn mysql_8() -> DialectCapability {
    DialectCapability::new(DialectKind::MySql).with_version(DatabaseVersion::new(8, 0, 36))
}

pub fn sqlite() -> DialectCapability {
    DialectCapability::new(DialectKind::Sqlite).with_version(DatabaseVersion::new(3, 45, 1))
}

pub fn postgres() -> DialectCapability {
    DialectCapability::new(DialectKind::Postgres).with_version(DatabaseVersion::new(15, 3, 0))
}

/// `User` with uuid key and both inet columns, plus its addresses.
pub fn user_entities() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("User")
            .database("test")
            .column(ColumnDescriptor::uuid_primary("id"))
            .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(100))
            .column(ColumnDescriptor::new("ipv4", ColumnType::Inet4).nullable())
            .column(ColumnDescriptor::new("ipv6", ColumnType::Inet6).nullable())
            .relation(RelationDescriptor::one_to_many("addresses", "Address", "user")),
        EntityDescriptor::new("Address")
            .database("test")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("city", ColumnType::Varchar))
            .relation(RelationDescriptor::many_to_one("user", "User")),
    ]
}
