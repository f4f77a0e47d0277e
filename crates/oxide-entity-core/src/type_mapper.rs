//! Mapping of abstract column types onto dialect-native types.

use crate::dialect::{Dialect, DialectCapability, TypeRule};
use crate::error::UnsupportedType;
use crate::types::{ColumnType, MappedType};

/// Resolves abstract column types against a dialect and server version.
///
/// The mapper is a pure function of its inputs; fallbacks are reported on
/// the returned [`MappedType`] and logged by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMapper;

impl TypeMapper {
    /// Maps `column_type` for `dialect` at the server version described by
    /// `capability`.
    ///
    /// A version-gated type below its threshold is an error in strict mode
    /// and a documented fallback otherwise. A type the dialect never stores
    /// natively always maps to its substitute; a type with no mapping at all
    /// is always an error.
    pub fn map_column_type(
        column_type: ColumnType,
        dialect: &dyn Dialect,
        capability: &DialectCapability,
    ) -> Result<MappedType, UnsupportedType> {
        match dialect.type_rule(column_type) {
            TypeRule::Native(native) => Ok(MappedType::native(native)),
            TypeRule::Since {
                native,
                since,
                fallback,
            } => {
                if capability.version_at_least(since) {
                    return Ok(MappedType::native(native));
                }
                let found = capability
                    .version
                    .map_or_else(|| String::from("unknown version"), |v| format!("version {v}"));
                let reason = format!(
                    "native `{}` requires {} {since} or newer ({found})",
                    native.name,
                    dialect.name()
                );
                if capability.strict_types {
                    return Err(UnsupportedType {
                        column_type,
                        dialect: dialect.kind(),
                        version: capability.version,
                        reason,
                    });
                }
                Ok(MappedType {
                    native: fallback,
                    fallback: Some(reason),
                })
            }
            TypeRule::Fallback(native) => Ok(MappedType {
                fallback: Some(format!(
                    "{} has no native `{column_type}`, stored as `{native}`",
                    dialect.name()
                )),
                native,
            }),
            TypeRule::Unsupported => Err(UnsupportedType {
                column_type,
                dialect: dialect.kind(),
                version: capability.version,
                reason: format!("{} has no mapping for `{column_type}`", dialect.name()),
            }),
        }
    }

    /// Maps using the dialect the capability points at.
    pub fn map_for(
        column_type: ColumnType,
        capability: &DialectCapability,
    ) -> Result<MappedType, UnsupportedType> {
        Self::map_column_type(column_type, capability.dialect(), capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DatabaseVersion, DialectKind};
    use crate::types::NativeType;

    fn mariadb(major: u32, minor: u32) -> DialectCapability {
        DialectCapability::new(DialectKind::MariaDb).with_version(DatabaseVersion::new(major, minor, 0))
    }

    #[test]
    fn mariadb_10_10_maps_native_network_types() {
        let cap = mariadb(10, 10);
        for (ty, name) in [
            (ColumnType::Uuid, "uuid"),
            (ColumnType::Inet4, "inet4"),
            (ColumnType::Inet6, "inet6"),
        ] {
            let mapped = TypeMapper::map_for(ty, &cap).unwrap();
            assert_eq!(mapped.native, NativeType::new(name));
            assert!(!mapped.is_fallback());
        }
    }

    #[test]
    fn old_mariadb_falls_back_unless_strict() {
        let cap = mariadb(10, 4);
        let mapped = TypeMapper::map_for(ColumnType::Uuid, &cap).unwrap();
        assert_eq!(mapped.native, NativeType::with_length("varchar", 36));
        assert!(mapped.fallback.unwrap().contains("10.7.0"));

        let err = TypeMapper::map_for(ColumnType::Uuid, &cap.strict()).unwrap_err();
        assert_eq!(err.dialect, DialectKind::MariaDb);
        assert_eq!(err.column_type, ColumnType::Uuid);
    }

    #[test]
    fn mysql_uuid_fallback_is_not_an_error_in_strict_mode() {
        let cap = DialectCapability::new(DialectKind::MySql).strict();
        let mapped = TypeMapper::map_for(ColumnType::Uuid, &cap).unwrap();
        assert_eq!(mapped.native, NativeType::with_length("varchar", 36));
        assert!(mapped.is_fallback());
    }

    #[test]
    fn unsupported_in_every_mode() {
        let cap = DialectCapability::new(DialectKind::Spanner);
        assert!(TypeMapper::map_for(ColumnType::Enum, &cap).is_err());
        assert!(TypeMapper::map_for(ColumnType::Enum, &cap.assume_latest()).is_err());
    }

    #[test]
    fn every_type_maps_on_postgres() {
        let cap = DialectCapability::new(DialectKind::Postgres);
        for ty in ColumnType::ALL {
            assert!(TypeMapper::map_for(ty, &cap).is_ok(), "{ty}");
        }
    }
}
