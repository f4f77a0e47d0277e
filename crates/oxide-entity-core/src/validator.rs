//! Semantic checks over built metadata.
//!
//! The validator runs every rule and collects all violations, so one pass
//! reports everything wrong with a model. Callers that want fail-fast
//! behavior use [`MetadataValidator::validate_first`].

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::dialect::{Dialect, DialectCapability, IncrementStyle};
use crate::error::{ValidationError, ValidationErrors};
use crate::metadata::{EntityMetadata, ReferentialAction, RelationKind, TableType};
use crate::types::ColumnType;

/// Checks built metadata against the rules of one dialect capability.
#[derive(Debug, Clone, Copy)]
pub struct MetadataValidator {
    capability: DialectCapability,
}

impl MetadataValidator {
    /// Creates a validator for `capability`.
    #[must_use]
    pub const fn new(capability: DialectCapability) -> Self {
        Self { capability }
    }

    /// Validates one entity. `all` is the full entity set, indexed by id.
    pub fn validate(&self, entity: &EntityMetadata, all: &[EntityMetadata]) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        self.collect(entity, all, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Validates every entity and reports every violation.
    pub fn validate_all(&self, all: &[EntityMetadata]) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        for entity in all {
            self.collect(entity, all, &mut errors);
        }
        if errors.is_empty() {
            debug!(entities = all.len(), "metadata validated");
            return Ok(());
        }
        for error in &errors {
            warn!(rule = error.rule(), entity = error.entity(), "{error}");
        }
        Err(ValidationErrors(errors))
    }

    /// Validates every entity and stops at the first violation.
    pub fn validate_first(&self, all: &[EntityMetadata]) -> Result<(), ValidationError> {
        for entity in all {
            if let Err(errors) = self.validate(entity, all) {
                if let Some(first) = errors.into_first() {
                    return Err(first);
                }
            }
        }
        Ok(())
    }

    fn collect(&self, entity: &EntityMetadata, all: &[EntityMetadata], errors: &mut Vec<ValidationError>) {
        let dialect = self.capability.dialect();
        check_modifiers(dialect, entity, errors);
        check_inherited_options(entity, all, errors);
        check_join_columns(entity, all, errors);
        check_duplicate_columns(entity, errors);
        check_primary_key(entity, errors);
        check_enum_values(entity, errors);
        check_generation(dialect, entity, errors);
        check_relation_options(entity, all, errors);
    }
}

// uuid and inet values have a fixed textual width, so a length is rejected
// even where they are stored in a varchar substitute.
fn check_modifiers(dialect: &dyn Dialect, entity: &EntityMetadata, errors: &mut Vec<ValidationError>) {
    for column in entity.columns.iter().filter(|c| c.declared_by == entity.id && !c.is_inherited) {
        if column.requested.is_empty() {
            continue;
        }
        let rules = dialect.modifier_rules(&column.native.name);
        let fixed_width = matches!(
            column.column_type,
            ColumnType::Uuid | ColumnType::Inet4 | ColumnType::Inet6
        );
        if column.requested.length.is_some() && (fixed_width || !rules.length) {
            errors.push(ValidationError::LengthNotSupported {
                entity: entity.name.clone(),
                column: column.property_path.clone(),
                native_type: column.native.name.clone(),
            });
        }
        if column.requested.precision.is_some() && !rules.precision {
            errors.push(ValidationError::PrecisionNotSupported {
                entity: entity.name.clone(),
                column: column.property_path.clone(),
                native_type: column.native.name.clone(),
                modifier: "precision",
            });
        }
        if column.requested.scale.is_some() && !rules.scale {
            errors.push(ValidationError::PrecisionNotSupported {
                entity: entity.name.clone(),
                column: column.property_path.clone(),
                native_type: column.native.name.clone(),
                modifier: "scale",
            });
        }
    }
}

// Single-table children live in the root's table, so they cannot be placed
// in another database or schema.
fn check_inherited_options(entity: &EntityMetadata, all: &[EntityMetadata], errors: &mut Vec<ValidationError>) {
    if entity.table_type != TableType::StiChild {
        return;
    }
    let root = &all[entity.root.index()];
    let options = [
        ("database", &root.database, &entity.database),
        ("schema", &root.schema, &entity.schema),
    ];
    for (option, expected, found) in options {
        if expected != found {
            errors.push(ValidationError::InheritedOptionMismatch {
                entity: entity.name.clone(),
                root: root.name.clone(),
                option,
                expected: expected.clone(),
                found: found.clone(),
            });
        }
    }
}

fn check_join_columns(entity: &EntityMetadata, all: &[EntityMetadata], errors: &mut Vec<ValidationError>) {
    for relation in entity.relations.iter().filter(|r| r.owning && r.declared_by == entity.id) {
        let target_keys = all[relation.target.index()].primary_key_count();
        let mut check = |expected: usize, found: usize| {
            if expected != found {
                errors.push(ValidationError::JoinColumnCountMismatch {
                    entity: entity.name.clone(),
                    relation: relation.property.clone(),
                    expected,
                    found,
                });
            }
        };
        match (&relation.junction, relation.kind) {
            (Some(junction), RelationKind::ManyToMany) => {
                check(entity.primary_key_count(), junction.owner_columns.len());
                check(target_keys, junction.inverse_columns.len());
            }
            _ => check(target_keys, relation.join_columns.len()),
        }
    }
}

fn check_duplicate_columns(entity: &EntityMetadata, errors: &mut Vec<ValidationError>) {
    if !entity.has_own_table() {
        return;
    }
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for column in &entity.columns {
        let name = column.database_name.as_str();
        if !seen.insert(name) && reported.insert(name) {
            errors.push(ValidationError::DuplicateColumn {
                entity: entity.name.clone(),
                table: entity.table_name.clone(),
                column: name.to_string(),
            });
        }
    }
}

fn check_primary_key(entity: &EntityMetadata, errors: &mut Vec<ValidationError>) {
    if !entity.is_abstract && entity.primary_key_count() == 0 {
        errors.push(ValidationError::MissingPrimaryKey {
            entity: entity.name.clone(),
        });
    }
}

fn check_enum_values(entity: &EntityMetadata, errors: &mut Vec<ValidationError>) {
    for column in &entity.columns {
        if column.declared_by == entity.id
            && !column.is_inherited
            && column.column_type == ColumnType::Enum
            && column.enum_values.is_empty()
        {
            errors.push(ValidationError::EnumWithoutValues {
                entity: entity.name.clone(),
                column: column.property_path.clone(),
            });
        }
    }
}

fn check_generation(dialect: &dyn Dialect, entity: &EntityMetadata, errors: &mut Vec<ValidationError>) {
    let style = dialect.increment_style();
    for column in entity.columns.iter().filter(|c| c.declared_by == entity.id && !c.is_inherited) {
        let reason = if column.is_increment() {
            if !column.column_type.is_integer() {
                Some(format!("increment generation on non-integer type `{}`", column.column_type))
            } else if style == IncrementStyle::Unsupported {
                Some(format!("{} has no auto-increment columns", dialect.name()))
            } else {
                None
            }
        } else if column.is_generated_uuid() {
            (!matches!(
                column.column_type,
                ColumnType::Uuid | ColumnType::Varchar | ColumnType::Char | ColumnType::Text
            ))
            .then(|| format!("uuid generation on type `{}`", column.column_type))
        } else {
            None
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::InvalidGeneration {
                entity: entity.name.clone(),
                column: column.property_path.clone(),
                reason,
            });
        }
    }

    // Postgres-style serial types may repeat; every other engine allows one
    // identity column per table.
    if entity.has_own_table() && style != IncrementStyle::SerialType {
        let increments = entity.columns.iter().filter(|c| c.is_increment()).count();
        if increments > 1 {
            errors.push(ValidationError::MultipleGeneratedColumns {
                entity: entity.name.clone(),
                table: entity.table_name.clone(),
            });
        }
    }
}

fn check_relation_options(entity: &EntityMetadata, all: &[EntityMetadata], errors: &mut Vec<ValidationError>) {
    for relation in entity.relations.iter().filter(|r| r.declared_by == entity.id) {
        if relation.owning
            && relation.on_delete == Some(ReferentialAction::SetNull)
            && !relation.nullable
        {
            errors.push(ValidationError::SetNullOnNonNullable {
                entity: entity.name.clone(),
                relation: relation.property.clone(),
            });
        }

        if !(relation.owning && relation.eager) {
            continue;
        }
        let Some(inverse) = &relation.inverse_property else {
            continue;
        };
        let target = &all[relation.target.index()];
        if target.relation(inverse).is_some_and(|r| r.eager) {
            errors.push(ValidationError::EagerBothSides {
                entity: entity.name.clone(),
                relation: relation.property.clone(),
                target: target.name.clone(),
                inverse: inverse.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MetadataBuilder;
    use crate::descriptor::{ColumnDescriptor, EntityDescriptor, RelationDescriptor};
    use crate::dialect::{DatabaseVersion, DialectKind};
    use crate::metadata::InheritanceStrategy;
    use crate::types::GenerationStrategy;

    fn check(cap: DialectCapability, descriptors: &[EntityDescriptor]) -> Result<(), ValidationErrors> {
        let entities = MetadataBuilder::new(cap).build(descriptors).unwrap();
        MetadataValidator::new(cap).validate_all(&entities)
    }

    fn sqlite() -> DialectCapability {
        DialectCapability::new(DialectKind::Sqlite)
    }

    #[test]
    fn length_on_native_uuid_is_rejected() {
        let cap = DialectCapability::new(DialectKind::MariaDb).with_version(DatabaseVersion::new(10, 10, 0));
        let errors = check(
            cap,
            &[EntityDescriptor::new("User").column(ColumnDescriptor::uuid_primary("id").length(36))],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.first(),
            Some(ValidationError::LengthNotSupported { native_type, .. }) if native_type == "uuid"
        ));
    }

    #[test]
    fn length_on_fixed_width_type_is_rejected_on_fallback_too() {
        let cap = DialectCapability::new(DialectKind::MySql).with_version(DatabaseVersion::new(8, 0, 0));
        let errors = check(
            cap,
            &[EntityDescriptor::new("User")
                .column(ColumnDescriptor::uuid_primary("id").length(36))
                .column(ColumnDescriptor::new("ip", ColumnType::Inet4).length(15))],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.rule() == "length-not-supported"));
    }

    #[test]
    fn length_on_varchar_is_accepted() {
        check(
            sqlite(),
            &[EntityDescriptor::new("User")
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar).length(100))],
        )
        .unwrap();
    }

    #[test]
    fn scale_on_integer_is_rejected() {
        let errors = check(
            DialectCapability::new(DialectKind::Postgres),
            &[EntityDescriptor::new("Item")
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("qty", ColumnType::Integer).precision(10, Some(2)))],
        )
        .unwrap_err();
        let modifiers: Vec<&str> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::PrecisionNotSupported { modifier, .. } => Some(*modifier),
                _ => None,
            })
            .collect();
        assert_eq!(modifiers, vec!["precision", "scale"]);
    }

    #[test]
    fn single_table_child_in_other_database_is_rejected() {
        let errors = check(
            sqlite(),
            &[
                EntityDescriptor::new("Content")
                    .database("test")
                    .inheritance_root(InheritanceStrategy::SingleTable)
                    .column(ColumnDescriptor::increment_primary("id")),
                EntityDescriptor::new("Photo").extends("Content").database("other"),
            ],
        )
        .unwrap_err();
        match errors.first() {
            Some(ValidationError::InheritedOptionMismatch {
                entity,
                option,
                expected,
                found,
                ..
            }) => {
                assert_eq!(entity, "Photo");
                assert_eq!(*option, "database");
                assert_eq!(expected.as_deref(), Some("test"));
                assert_eq!(found.as_deref(), Some("other"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_primary_key_and_enum_values_are_collected() {
        let errors = check(
            sqlite(),
            &[EntityDescriptor::new("Log").column(ColumnDescriptor::new("level", ColumnType::Enum))],
        )
        .unwrap_err();
        let rules: Vec<&str> = errors.iter().map(ValidationError::rule).collect();
        assert!(rules.contains(&"missing-primary-key"));
        assert!(rules.contains(&"enum-without-values"));
        assert!(errors.to_string().starts_with("2 validation error(s):"));
    }

    #[test]
    fn duplicate_column_names_are_rejected() {
        let errors = check(
            sqlite(),
            &[EntityDescriptor::new("User")
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("a", ColumnType::Text).name("x"))
                .column(ColumnDescriptor::new("b", ColumnType::Text).name("x"))],
        )
        .unwrap_err();
        assert!(matches!(errors.first(), Some(ValidationError::DuplicateColumn { column, .. }) if column == "x"));
    }

    #[test]
    fn increment_on_text_is_rejected() {
        let errors = check(
            sqlite(),
            &[EntityDescriptor::new("Tag").column(
                ColumnDescriptor::new("id", ColumnType::Text)
                    .primary()
                    .generated(GenerationStrategy::Increment),
            )],
        )
        .unwrap_err();
        assert_eq!(errors.first().map(ValidationError::rule), Some("invalid-generation"));
    }

    #[test]
    fn eager_on_both_sides_is_rejected() {
        let errors = check(
            sqlite(),
            &[
                EntityDescriptor::new("Post")
                    .column(ColumnDescriptor::increment_primary("id"))
                    .relation(RelationDescriptor::many_to_one("author", "User").eager()),
                EntityDescriptor::new("User")
                    .column(ColumnDescriptor::increment_primary("id"))
                    .relation(RelationDescriptor::one_to_many("posts", "Post", "author").eager()),
            ],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().map(ValidationError::entity), Some("Post"));
    }

    #[test]
    fn set_null_requires_nullable_relation() {
        let errors = check(
            sqlite(),
            &[
                EntityDescriptor::new("Post")
                    .column(ColumnDescriptor::increment_primary("id"))
                    .relation(
                        RelationDescriptor::many_to_one("author", "User")
                            .not_null()
                            .on_delete(ReferentialAction::SetNull),
                    ),
                EntityDescriptor::new("User").column(ColumnDescriptor::increment_primary("id")),
            ],
        )
        .unwrap_err();
        assert_eq!(errors.first().map(ValidationError::rule), Some("set-null-on-non-nullable"));
    }

    #[test]
    fn validate_first_stops_early() {
        let entities = MetadataBuilder::new(sqlite())
            .build(&[
                EntityDescriptor::new("A").column(ColumnDescriptor::new("x", ColumnType::Text)),
                EntityDescriptor::new("B").column(ColumnDescriptor::new("y", ColumnType::Text)),
            ])
            .unwrap();
        let first = MetadataValidator::new(sqlite()).validate_first(&entities).unwrap_err();
        assert_eq!(first.entity(), "A");
    }
}
