//! Builds normalized metadata from entity descriptors.
//!
//! The build runs in two phases. Phase one allocates an [`EntityId`] for
//! every descriptor, keyed by entity name. Phase two resolves parents,
//! columns, relations and indices by name lookup, so descriptors may refer
//! to each other in any order and relation cycles need no special casing.
//! Any error aborts the whole build; no partial metadata is returned.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::descriptor::{
    ColumnDescriptor, DefaultDescriptor, EntityDescriptor, JoinColumnDescriptor, RelationDescriptor,
};
use crate::dialect::{Dialect, DialectCapability};
use crate::error::BuildError;
use crate::metadata::{
    ColumnDefault, ColumnMetadata, EntityId, EntityMetadata, ForeignKeyMetadata, IndexMetadata,
    InheritanceStrategy, JoinColumn, JunctionMetadata, ReferentialAction, RelationKind,
    RelationMetadata, TableType, TypeModifiers,
};
use crate::type_mapper::TypeMapper;
use crate::types::{ColumnType, MappedType, NativeType, TypeLength};
use crate::value::SqlValue;

/// Default discriminator column of single-table hierarchies.
pub const DEFAULT_DISCRIMINATOR_COLUMN: &str = "type";

/// Turns descriptors into [`EntityMetadata`] for one dialect capability.
#[derive(Debug, Clone, Copy)]
pub struct MetadataBuilder {
    capability: DialectCapability,
}

impl MetadataBuilder {
    /// Creates a builder for `capability`.
    #[must_use]
    pub const fn new(capability: DialectCapability) -> Self {
        Self { capability }
    }

    /// Builds metadata for every descriptor plus generated junction
    /// entities. The result is indexed by [`EntityId`].
    pub fn build(&self, descriptors: &[EntityDescriptor]) -> Result<Vec<EntityMetadata>, BuildError> {
        info!(
            entities = descriptors.len(),
            dialect = %self.capability.kind,
            "building entity metadata"
        );
        let mut ctx = BuildContext::new(self.capability, descriptors)?;
        ctx.resolve_inheritance()?;
        ctx.resolve_columns()?;
        ctx.resolve_relations()?;
        ctx.resolve_inverse_sides()?;
        ctx.inherit_relations();
        ctx.merge_single_table_columns();
        ctx.resolve_indices()?;
        let entities = ctx.entities;
        for entity in &entities {
            debug!(
                entity = %entity.name,
                table = %entity.table_name,
                columns = entity.columns.len(),
                relations = entity.relations.len(),
                "entity metadata built"
            );
        }
        Ok(entities)
    }
}

struct PendingInverse {
    entity: EntityId,
    relation: usize,
}

struct BuildContext<'a> {
    capability: DialectCapability,
    dialect: &'static dyn Dialect,
    descriptors: &'a [EntityDescriptor],
    ids: HashMap<String, EntityId>,
    entities: Vec<EntityMetadata>,
    /// User entities, parents before children.
    order: Vec<EntityId>,
    pending: Vec<PendingInverse>,
}

impl<'a> BuildContext<'a> {
    fn new(capability: DialectCapability, descriptors: &'a [EntityDescriptor]) -> Result<Self, BuildError> {
        let mut ids = HashMap::with_capacity(descriptors.len());
        let mut entities = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            let id = EntityId(index);
            if ids.insert(descriptor.name.clone(), id).is_some() {
                return Err(BuildError::DuplicateEntity {
                    entity: descriptor.name.clone(),
                });
            }
            entities.push(EntityMetadata {
                id,
                name: descriptor.name.clone(),
                table_name: descriptor
                    .table
                    .clone()
                    .unwrap_or_else(|| snake_case(&descriptor.name)),
                database: descriptor.database.clone(),
                schema: descriptor.schema.clone(),
                table_type: TableType::Regular,
                inheritance: None,
                parent: None,
                root: id,
                children: Vec::new(),
                discriminator_column: None,
                discriminator_value: None,
                columns: Vec::new(),
                relations: Vec::new(),
                indices: Vec::new(),
                foreign_keys: Vec::new(),
                is_junction: false,
                is_abstract: descriptor.abstract_entity,
            });
        }
        Ok(Self {
            capability,
            dialect: capability.dialect(),
            descriptors,
            ids,
            entities,
            order: Vec::new(),
            pending: Vec::new(),
        })
    }

    fn descriptor(&self, id: EntityId) -> &'a EntityDescriptor {
        &self.descriptors[id.0]
    }

    fn entity(&self, id: EntityId) -> &EntityMetadata {
        &self.entities[id.0]
    }

    fn entity_mut(&mut self, id: EntityId) -> &mut EntityMetadata {
        &mut self.entities[id.0]
    }

    fn lookup_target(&self, entity: &str, relation: &RelationDescriptor) -> Result<EntityId, BuildError> {
        self.ids
            .get(&relation.target)
            .copied()
            .ok_or_else(|| BuildError::UnknownRelationTarget {
                entity: entity.to_string(),
                property: relation.property.clone(),
                target: relation.target.clone(),
            })
    }

    fn strategy(&self, id: EntityId) -> Option<InheritanceStrategy> {
        self.entity(id).inheritance
    }

    /// Links parents, computes roots, orders entities parents first and
    /// settles each hierarchy's strategy, tables and discriminators.
    fn resolve_inheritance(&mut self) -> Result<(), BuildError> {
        let count = self.descriptors.len();
        for index in 0..count {
            let id = EntityId(index);
            let descriptor = self.descriptor(id);
            let Some(parent_name) = descriptor.inheritance.as_ref().and_then(|i| i.parent.as_ref()) else {
                continue;
            };
            let parent = self
                .ids
                .get(parent_name)
                .copied()
                .ok_or_else(|| BuildError::UnknownParent {
                    entity: descriptor.name.clone(),
                    parent: parent_name.clone(),
                })?;
            self.entity_mut(id).parent = Some(parent);
        }

        let mut depths = Vec::with_capacity(count);
        for index in 0..count {
            let id = EntityId(index);
            let mut current = id;
            let mut depth = 0;
            while let Some(parent) = self.entity(current).parent {
                depth += 1;
                if depth > count {
                    return Err(BuildError::InheritanceCycle {
                        entity: self.entity(id).name.clone(),
                    });
                }
                current = parent;
            }
            self.entity_mut(id).root = current;
            depths.push((depth, id));
        }
        depths.sort();
        self.order = depths.into_iter().map(|(_, id)| id).collect();

        for id in self.order.clone() {
            if let Some(parent) = self.entity(id).parent {
                self.entity_mut(parent).children.push(id);
            }
        }

        let roots: Vec<EntityId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.entity(*id).parent.is_none())
            .collect();
        for root in roots {
            self.resolve_hierarchy(root)?;
        }
        Ok(())
    }

    fn resolve_hierarchy(&mut self, root: EntityId) -> Result<(), BuildError> {
        let members: Vec<EntityId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.entity(*id).root == root)
            .collect();
        let mut strategy: Option<InheritanceStrategy> = None;
        for &member in &members {
            let declared = self
                .descriptor(member)
                .inheritance
                .as_ref()
                .and_then(|i| i.strategy);
            match (strategy, declared) {
                (Some(current), Some(declared)) if current != declared => {
                    return Err(BuildError::InvalidInheritance {
                        entity: self.entity(member).name.clone(),
                        reason: format!("strategy {declared:?} conflicts with {current:?} of its hierarchy"),
                    });
                }
                (None, Some(declared)) => strategy = Some(declared),
                _ => {}
            }
        }
        if members.len() > 1 {
            strategy = Some(strategy.unwrap_or(InheritanceStrategy::TablePerClass));
        }
        let Some(strategy) = strategy else {
            return Ok(());
        };

        let discriminator_column = (strategy == InheritanceStrategy::SingleTable).then(|| {
            self.descriptor(root)
                .inheritance
                .as_ref()
                .and_then(|i| i.discriminator_column.clone())
                .unwrap_or_else(|| DEFAULT_DISCRIMINATOR_COLUMN.to_string())
        });
        let mut discriminator_values: HashMap<String, String> = HashMap::new();

        for &member in &members {
            let descriptor = self.descriptor(member);
            let parent = self.entity(member).parent;
            let (root_table, parent_database, parent_schema) = match parent {
                Some(p) => {
                    let parent = self.entity(p);
                    (
                        self.entity(root).table_name.clone(),
                        parent.database.clone(),
                        parent.schema.clone(),
                    )
                }
                None => (self.entity(root).table_name.clone(), None, None),
            };

            let entity = self.entity_mut(member);
            entity.inheritance = Some(strategy);
            if parent.is_some() {
                if entity.database.is_none() {
                    entity.database = parent_database;
                }
                if entity.schema.is_none() {
                    entity.schema = parent_schema;
                }
            }

            if strategy != InheritanceStrategy::SingleTable {
                continue;
            }
            if parent.is_some() {
                if descriptor.table.as_ref().is_some_and(|t| *t != root_table) {
                    return Err(BuildError::InvalidInheritance {
                        entity: descriptor.name.clone(),
                        reason: String::from("single-table children share the table of their root"),
                    });
                }
                entity.table_name = root_table;
                entity.table_type = TableType::StiChild;
            }
            entity.discriminator_column = discriminator_column.clone();
            let value = descriptor
                .inheritance
                .as_ref()
                .and_then(|i| i.discriminator_value.clone())
                .unwrap_or_else(|| descriptor.name.clone());
            if let Some(other) = discriminator_values.insert(value.clone(), descriptor.name.clone()) {
                return Err(BuildError::DuplicateDiscriminator {
                    entity: descriptor.name.clone(),
                    value,
                    other,
                });
            }
            entity.discriminator_value = Some(value);
        }
        Ok(())
    }

    /// Resolves scalar, embedded, inherited and discriminator columns.
    fn resolve_columns(&mut self) -> Result<(), BuildError> {
        for id in self.order.clone() {
            let descriptor = self.descriptor(id);
            let mut columns = Vec::new();

            if let Some(parent_id) = self.entity(id).parent {
                let parent = self.entity(parent_id);
                match self.strategy(id) {
                    Some(InheritanceStrategy::ClassTable) => {
                        let keys: Vec<ColumnMetadata> = parent
                            .primary_columns()
                            .map(|c| ColumnMetadata {
                                generation: None,
                                is_inherited: true,
                                default: None,
                                ..c.clone()
                            })
                            .collect();
                        if keys.is_empty() {
                            return Err(BuildError::InvalidInheritance {
                                entity: descriptor.name.clone(),
                                reason: format!("class-table parent `{}` has no primary key", parent.name),
                            });
                        }
                        let names: Vec<String> = keys.iter().map(|c| c.database_name.clone()).collect();
                        let foreign_key = ForeignKeyMetadata {
                            columns: names.clone(),
                            referenced_entity: parent_id,
                            referenced_table: parent.table_name.clone(),
                            referenced_columns: names,
                            on_delete: Some(ReferentialAction::Cascade),
                            on_update: None,
                        };
                        columns.extend(keys);
                        self.entity_mut(id).foreign_keys.push(foreign_key);
                    }
                    _ => {
                        columns.extend(parent.columns.iter().map(|c| ColumnMetadata {
                            is_inherited: true,
                            ..c.clone()
                        }));
                    }
                }
            }

            for column in &descriptor.columns {
                columns.push(self.resolve_column(id, column, None)?);
            }
            for embedded in &descriptor.embedded {
                let prefix = embedded
                    .prefix
                    .clone()
                    .unwrap_or_else(|| embedded.property.clone());
                for column in &embedded.columns {
                    columns.push(self.resolve_column(id, column, Some((&embedded.property, &prefix)))?);
                }
            }

            let is_sti_root = self.entity(id).parent.is_none()
                && self.strategy(id) == Some(InheritanceStrategy::SingleTable);
            if is_sti_root {
                let name = self
                    .entity(id)
                    .discriminator_column
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DISCRIMINATOR_COLUMN.to_string());
                match columns.iter().position(|c| c.database_name == name) {
                    Some(pos) => columns[pos].is_discriminator = true,
                    None => columns.push(self.discriminator_column(id, &name)?),
                }
            }

            self.entity_mut(id).columns = columns;
        }
        Ok(())
    }

    fn resolve_column(
        &self,
        id: EntityId,
        column: &ColumnDescriptor,
        embedded: Option<(&String, &String)>,
    ) -> Result<ColumnMetadata, BuildError> {
        let entity = &self.entity(id).name;
        let column_type: ColumnType =
            column
                .column_type
                .parse()
                .map_err(|_| BuildError::UnknownColumnType {
                    entity: entity.clone(),
                    property: column.property.clone(),
                    type_name: column.column_type.clone(),
                })?;
        let mapped = match &column.native_type {
            Some(native) => MappedType::native(NativeType::parse(native).map_err(|_| {
                BuildError::InvalidNativeType {
                    entity: entity.clone(),
                    property: column.property.clone(),
                    native: native.clone(),
                }
            })?),
            None => TypeMapper::map_column_type(column_type, self.dialect, &self.capability).map_err(
                |source| BuildError::UnsupportedType {
                    entity: entity.clone(),
                    property: column.property.clone(),
                    source,
                },
            )?,
        };
        if let Some(reason) = &mapped.fallback {
            warn!(
                entity = %entity,
                column = %column.property,
                native = %mapped.native,
                reason = %reason,
                "column type substituted"
            );
        }

        let requested = TypeModifiers {
            length: column.length,
            precision: column.precision,
            scale: column.scale,
        };
        let mut native = mapped.native;
        if let Some(length) = column.length {
            native.length = Some(TypeLength::Fixed(length));
        }
        if let Some(precision) = column.precision {
            native.precision = Some(precision);
        }
        if let Some(scale) = column.scale {
            native.scale = Some(scale);
        }

        let name = column.name.clone().unwrap_or_else(|| column.property.clone());
        let (property_path, database_name, embedded_path) = match embedded {
            Some((property, prefix)) => (
                format!("{property}.{}", column.property),
                if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}_{name}")
                },
                Some(property.clone()),
            ),
            None => (column.property.clone(), name, None),
        };

        Ok(ColumnMetadata {
            property_path,
            database_name,
            column_type,
            requested,
            native,
            fallback: mapped.fallback,
            nullable: column.nullable && !column.primary,
            default: column.default.as_ref().map(|d| match d {
                DefaultDescriptor::Value(v) => ColumnDefault::Value(SqlValue::from_json(v)),
                DefaultDescriptor::Expression(e) => ColumnDefault::Expression(e.clone()),
                DefaultDescriptor::CurrentTimestamp => ColumnDefault::CurrentTimestamp,
            }),
            generation: column.generated,
            primary: column.primary,
            unique: column.unique,
            enum_values: column.enum_values.clone(),
            embedded_path,
            relation: None,
            is_discriminator: false,
            is_inherited: false,
            declared_by: id,
        })
    }

    fn discriminator_column(&self, id: EntityId, name: &str) -> Result<ColumnMetadata, BuildError> {
        let descriptor = ColumnDescriptor::new(name, ColumnType::Varchar).length(255);
        let mut column = self.resolve_column(id, &descriptor, None)?;
        column.is_discriminator = true;
        Ok(column)
    }

    /// Creates relation metadata, foreign-key columns of owning sides and
    /// junction entities. Inverse sides are completed afterwards.
    fn resolve_relations(&mut self) -> Result<(), BuildError> {
        for index in 0..self.descriptors.len() {
            let id = EntityId(index);
            let descriptor = self.descriptor(id);
            for relation in &descriptor.relations {
                let target = self.lookup_target(&descriptor.name, relation)?;
                let target_entity = self.entity(target);
                if target_entity.is_abstract && target_entity.inheritance != Some(InheritanceStrategy::SingleTable) {
                    return Err(BuildError::AbstractRelationTarget {
                        entity: descriptor.name.clone(),
                        property: relation.property.clone(),
                        target: relation.target.clone(),
                    });
                }
                let owning = relation.is_owning();
                let mut metadata = RelationMetadata {
                    property: relation.property.clone(),
                    kind: relation.kind,
                    owning,
                    target,
                    inverse_property: relation.inverse_side.clone(),
                    join_columns: Vec::new(),
                    junction: None,
                    eager: relation.eager,
                    nullable: relation.nullable,
                    on_delete: relation.on_delete,
                    on_update: relation.on_update,
                    declared_by: id,
                };
                match (relation.kind, owning) {
                    (RelationKind::ManyToOne | RelationKind::OneToOne, true) => {
                        metadata.join_columns = self.add_foreign_key_columns(id, target, relation)?;
                    }
                    (RelationKind::ManyToMany, true) => {
                        metadata.junction = Some(self.add_junction(id, target, relation)?);
                    }
                    _ => {
                        if relation.inverse_side.is_none() {
                            return Err(BuildError::NoOwningSide {
                                entity: descriptor.name.clone(),
                                property: relation.property.clone(),
                            });
                        }
                        let relation = self.entity(id).relations.len();
                        self.pending.push(PendingInverse { entity: id, relation });
                    }
                }
                self.entity_mut(id).relations.push(metadata);
            }
        }
        Ok(())
    }

    fn referenced_columns(
        &self,
        entity: &str,
        property: &str,
        target: EntityId,
        specs: &[JoinColumnDescriptor],
    ) -> Result<Vec<(Option<String>, ColumnMetadata)>, BuildError> {
        let target_entity = self.entity(target);
        let keys: Vec<&ColumnMetadata> = target_entity.primary_columns().collect();
        if keys.is_empty() {
            return Err(BuildError::MissingPrimaryKeyForRelation {
                entity: entity.to_string(),
                property: property.to_string(),
                target: target_entity.name.clone(),
            });
        }
        if specs.is_empty() {
            return Ok(keys.into_iter().map(|k| (None, k.clone())).collect());
        }
        specs
            .iter()
            .map(|spec| {
                let referenced = match &spec.referenced_column {
                    Some(name) => target_entity
                        .column_by_name(name)
                        .or_else(|| target_entity.column(name)),
                    None if keys.len() == 1 => Some(keys[0]),
                    None => None,
                };
                referenced
                    .map(|c| (spec.name.clone(), c.clone()))
                    .ok_or_else(|| BuildError::UnresolvedJoinColumn {
                        entity: entity.to_string(),
                        property: property.to_string(),
                        column: spec
                            .referenced_column
                            .clone()
                            .unwrap_or_else(|| String::from("<primary key>")),
                    })
            })
            .collect()
    }

    fn add_foreign_key_columns(
        &mut self,
        id: EntityId,
        target: EntityId,
        relation: &RelationDescriptor,
    ) -> Result<Vec<JoinColumn>, BuildError> {
        let entity_name = self.entity(id).name.clone();
        let referenced = self.referenced_columns(&entity_name, &relation.property, target, &relation.join_columns)?;
        let single = referenced.len() == 1;
        let mut join_columns = Vec::with_capacity(referenced.len());
        for (name, key) in referenced {
            let name = name.unwrap_or_else(|| format!("{}_{}", relation.property, key.database_name));
            let entity = self.entity_mut(id);
            if let Some(pos) = entity.columns.iter().position(|c| c.database_name == name) {
                entity.columns[pos].relation = Some(relation.property.clone());
            } else {
                entity.columns.push(ColumnMetadata {
                    property_path: name.clone(),
                    database_name: name.clone(),
                    requested: TypeModifiers::default(),
                    nullable: relation.nullable,
                    default: None,
                    generation: None,
                    primary: false,
                    unique: single && relation.kind == RelationKind::OneToOne,
                    embedded_path: None,
                    relation: Some(relation.property.clone()),
                    is_discriminator: false,
                    is_inherited: false,
                    declared_by: id,
                    ..key.clone()
                });
            }
            join_columns.push(JoinColumn {
                name,
                referenced_column: key.database_name,
            });
        }
        let referenced_table = self.entity(target).table_name.clone();
        self.entity_mut(id).foreign_keys.push(ForeignKeyMetadata {
            columns: join_columns.iter().map(|j| j.name.clone()).collect(),
            referenced_entity: target,
            referenced_table,
            referenced_columns: join_columns.iter().map(|j| j.referenced_column.clone()).collect(),
            on_delete: relation.on_delete,
            on_update: relation.on_update,
        });
        Ok(join_columns)
    }

    fn add_junction(
        &mut self,
        owner: EntityId,
        target: EntityId,
        relation: &RelationDescriptor,
    ) -> Result<JunctionMetadata, BuildError> {
        let owner_name = self.entity(owner).name.clone();
        let owner_table = self.entity(owner).table_name.clone();
        let target_table = self.entity(target).table_name.clone();
        let join_table = relation.join_table.clone().unwrap_or_default();
        let table_name = join_table
            .name
            .clone()
            .unwrap_or_else(|| format!("{owner_table}_{}_{target_table}", relation.property));

        let owner_keys = self.referenced_columns(&owner_name, &relation.property, owner, &join_table.join_columns)?;
        let target_keys =
            self.referenced_columns(&owner_name, &relation.property, target, &join_table.inverse_join_columns)?;

        let mut owner_names: Vec<String> = owner_keys
            .iter()
            .map(|(n, k)| n.clone().unwrap_or_else(|| format!("{owner_table}_{}", k.database_name)))
            .collect();
        let mut target_names: Vec<String> = target_keys
            .iter()
            .map(|(n, k)| n.clone().unwrap_or_else(|| format!("{target_table}_{}", k.database_name)))
            .collect();
        if owner_names.iter().any(|n| target_names.contains(n)) {
            for name in &mut owner_names {
                name.push_str("_1");
            }
            for name in &mut target_names {
                name.push_str("_2");
            }
        }

        let junction_id = EntityId(self.entities.len());
        if self.ids.insert(table_name.clone(), junction_id).is_some() {
            return Err(BuildError::DuplicateEntity { entity: table_name });
        }

        let key_column = |name: &str, key: &ColumnMetadata| ColumnMetadata {
            property_path: name.to_string(),
            database_name: name.to_string(),
            requested: TypeModifiers::default(),
            nullable: false,
            default: None,
            generation: None,
            primary: true,
            unique: false,
            embedded_path: None,
            relation: None,
            is_discriminator: false,
            is_inherited: false,
            declared_by: junction_id,
            ..key.clone()
        };
        let mut columns = Vec::new();
        let mut owner_columns = Vec::new();
        let mut inverse_columns = Vec::new();
        for (name, (_, key)) in owner_names.iter().zip(&owner_keys) {
            columns.push(key_column(name, key));
            owner_columns.push(JoinColumn {
                name: name.clone(),
                referenced_column: key.database_name.clone(),
            });
        }
        for (name, (_, key)) in target_names.iter().zip(&target_keys) {
            columns.push(key_column(name, key));
            inverse_columns.push(JoinColumn {
                name: name.clone(),
                referenced_column: key.database_name.clone(),
            });
        }

        let foreign_key = |columns: &[JoinColumn], entity: EntityId, table: &str| ForeignKeyMetadata {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            referenced_entity: entity,
            referenced_table: table.to_string(),
            referenced_columns: columns.iter().map(|c| c.referenced_column.clone()).collect(),
            on_delete: Some(ReferentialAction::Cascade),
            on_update: relation.on_update,
        };
        let index = |columns: &[JoinColumn]| {
            let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
            IndexMetadata {
                name: format!("IDX_{table_name}_{}", names.join("_")),
                columns: names,
                unique: false,
            }
        };

        let owner_entity = self.entity(owner);
        let junction = EntityMetadata {
            id: junction_id,
            name: table_name.clone(),
            table_name: table_name.clone(),
            database: owner_entity.database.clone(),
            schema: owner_entity.schema.clone(),
            table_type: TableType::Junction,
            inheritance: None,
            parent: None,
            root: junction_id,
            children: Vec::new(),
            discriminator_column: None,
            discriminator_value: None,
            columns,
            relations: Vec::new(),
            indices: vec![index(&owner_columns), index(&inverse_columns)],
            foreign_keys: vec![
                foreign_key(&owner_columns, owner, &owner_table),
                foreign_key(&inverse_columns, target, &target_table),
            ],
            is_junction: true,
            is_abstract: false,
        };
        self.entities.push(junction);

        Ok(JunctionMetadata {
            entity: junction_id,
            table_name,
            owner_columns,
            inverse_columns,
        })
    }

    fn ancestors_and_self(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.entity(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Completes inverse sides from the owning relation on the target.
    fn resolve_inverse_sides(&mut self) -> Result<(), BuildError> {
        let pending = std::mem::take(&mut self.pending);
        for PendingInverse { entity, relation } in pending {
            let inverse = self.entity(entity).relations[relation].clone();
            let entity_name = self.entity(entity).name.clone();
            let inverse_property = inverse.inverse_property.clone().unwrap_or_default();

            let mut found: Option<(EntityId, usize)> = None;
            for candidate in self.ancestors_and_self(inverse.target) {
                if let Some(pos) = self
                    .entity(candidate)
                    .relations
                    .iter()
                    .position(|r| r.property == inverse_property)
                {
                    found = Some((candidate, pos));
                    break;
                }
            }
            let Some((owner, position)) = found else {
                return Err(BuildError::UnknownInverseSide {
                    entity: entity_name,
                    property: inverse.property,
                    target: self.entity(inverse.target).name.clone(),
                    inverse: inverse_property,
                });
            };
            let owning = self.entity(owner).relations[position].clone();
            if !owning.owning {
                return Err(BuildError::NoOwningSide {
                    entity: entity_name,
                    property: inverse.property,
                });
            }
            if owning.kind != inverse.kind.inverse() || !self.ancestors_and_self(entity).contains(&owning.target) {
                return Err(BuildError::RelationKindMismatch {
                    entity: entity_name,
                    property: inverse.property,
                    inverse: inverse_property,
                });
            }

            let resolved = &mut self.entity_mut(entity).relations[relation];
            resolved.join_columns = owning.join_columns.clone();
            resolved.nullable = owning.nullable;
            resolved.junction = owning.junction.as_ref().map(|j| JunctionMetadata {
                entity: j.entity,
                table_name: j.table_name.clone(),
                owner_columns: j.inverse_columns.clone(),
                inverse_columns: j.owner_columns.clone(),
            });
            let owning_side = &mut self.entity_mut(owner).relations[position];
            if owning_side.inverse_property.is_none() {
                owning_side.inverse_property = Some(inverse.property.clone());
            }
        }
        Ok(())
    }

    /// Single-table and table-per-class children inherit their parent's
    /// relations together with the foreign-key columns backing them.
    /// Class-table children reach inherited relations through the parent.
    fn inherit_relations(&mut self) {
        for id in self.order.clone() {
            let Some(parent_id) = self.entity(id).parent else {
                continue;
            };
            if self.strategy(id) == Some(InheritanceStrategy::ClassTable) {
                continue;
            }
            let parent = self.entity(parent_id);
            let inherited_relations = parent.relations.clone();
            let relation_columns: Vec<ColumnMetadata> = parent
                .columns
                .iter()
                .filter(|c| c.relation.is_some())
                .map(|c| ColumnMetadata {
                    is_inherited: true,
                    ..c.clone()
                })
                .collect();
            let inherited_keys = parent.foreign_keys.clone();

            let entity = self.entity_mut(id);
            for column in relation_columns {
                if !entity.columns.iter().any(|c| c.database_name == column.database_name) {
                    entity.columns.push(column);
                }
            }
            for foreign_key in inherited_keys {
                if !entity.foreign_keys.contains(&foreign_key) {
                    entity.foreign_keys.push(foreign_key);
                }
            }
            let own = std::mem::take(&mut entity.relations);
            entity.relations = inherited_relations;
            entity.relations.extend(own);
        }
    }

    /// The root of a single-table hierarchy holds the union of all columns;
    /// columns declared below the root are nullable there.
    fn merge_single_table_columns(&mut self) {
        for id in self.order.clone() {
            let entity = self.entity(id);
            if entity.table_type != TableType::StiChild {
                continue;
            }
            let root = entity.root;
            let own: Vec<ColumnMetadata> = entity
                .columns
                .iter()
                .filter(|c| c.declared_by == id)
                .map(|c| ColumnMetadata {
                    nullable: true,
                    ..c.clone()
                })
                .collect();
            let keys = entity.foreign_keys.clone();
            let root_entity = self.entity_mut(root);
            root_entity.columns.extend(own);
            for foreign_key in keys {
                if !root_entity.foreign_keys.contains(&foreign_key) {
                    root_entity.foreign_keys.push(foreign_key);
                }
            }
        }
    }

    fn resolve_indices(&mut self) -> Result<(), BuildError> {
        for id in self.order.clone() {
            let descriptor = self.descriptor(id);
            let entity = self.entity(id);
            let mut indices = Vec::new();
            let resolve = |property: &String, index_name: &str| {
                entity
                    .column(property)
                    .or_else(|| entity.column_by_name(property))
                    .map(|c| c.database_name.clone())
                    .ok_or_else(|| BuildError::UnknownIndexColumn {
                        entity: entity.name.clone(),
                        index: index_name.to_string(),
                        column: property.clone(),
                    })
            };
            for index in &descriptor.indices {
                let label = index.name.clone().unwrap_or_else(|| index.columns.join("_"));
                let columns = index
                    .columns
                    .iter()
                    .map(|p| resolve(p, &label))
                    .collect::<Result<Vec<_>, _>>()?;
                indices.push(IndexMetadata {
                    name: index
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("IDX_{}_{}", entity.table_name, columns.join("_"))),
                    columns,
                    unique: index.unique,
                });
            }
            for unique in &descriptor.uniques {
                let label = unique.join("_");
                let columns = unique
                    .iter()
                    .map(|p| resolve(p, &label))
                    .collect::<Result<Vec<_>, _>>()?;
                indices.push(IndexMetadata {
                    name: format!("UQ_{}_{}", entity.table_name, columns.join("_")),
                    columns,
                    unique: true,
                });
            }
            if indices.is_empty() {
                continue;
            }
            let root = entity.root;
            let shares_root_table = entity.table_type == TableType::StiChild;
            self.entity_mut(id).indices.extend(indices.iter().cloned());
            if shares_root_table {
                let root_entity = self.entity_mut(root);
                let existing: HashSet<String> = root_entity.indices.iter().map(|i| i.name.clone()).collect();
                root_entity
                    .indices
                    .extend(indices.into_iter().filter(|i| !existing.contains(&i.name)));
            }
        }
        Ok(())
    }
}

/// `UserProfile` becomes `user_profile`, `HTTPServer` becomes `http_server`.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                || (prev.is_some_and(char::is_uppercase) && next.is_some_and(|n| n.is_lowercase()));
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EmbeddedDescriptor, IndexDescriptor, RelationDescriptor};
    use crate::dialect::{DatabaseVersion, DialectKind};

    fn sqlite() -> DialectCapability {
        DialectCapability::new(DialectKind::Sqlite)
    }

    fn build(descriptors: &[EntityDescriptor]) -> Vec<EntityMetadata> {
        MetadataBuilder::new(sqlite()).build(descriptors).unwrap()
    }

    fn find<'a>(entities: &'a [EntityMetadata], name: &str) -> &'a EntityMetadata {
        entities.iter().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("User"), "user");
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("Address2Line"), "address2_line");
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[EntityDescriptor::new("User"), EntityDescriptor::new("User")])
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateEntity { entity } if entity == "User"));
    }

    #[test]
    fn unknown_relation_target_names_entity_and_field() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[EntityDescriptor::new("Post")
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::many_to_one("author", "Ghost"))])
            .unwrap_err();
        match err {
            BuildError::UnknownRelationTarget {
                entity,
                property,
                target,
            } => {
                assert_eq!(entity, "Post");
                assert_eq!(property, "author");
                assert_eq!(target, "Ghost");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn unknown_column_type_is_a_build_error() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[EntityDescriptor::new("Shape").column(ColumnDescriptor::named_type("area", "geometry"))])
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownColumnType { type_name, .. } if type_name == "geometry"));
    }

    #[test]
    fn unsupported_type_surfaces_with_entity_and_property() {
        let err = MetadataBuilder::new(DialectCapability::new(DialectKind::Spanner))
            .build(&[EntityDescriptor::new("Ticket")
                .column(ColumnDescriptor::new("id", ColumnType::BigInt).primary())
                .column(ColumnDescriptor::new("state", ColumnType::Enum).enum_values(["open"]))])
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedType { entity, property, .. }
            if entity == "Ticket" && property == "state"));
    }

    #[test]
    fn forward_and_circular_references_resolve() {
        let entities = build(&[
            EntityDescriptor::new("Post")
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::many_to_one("author", "User")),
            EntityDescriptor::new("User")
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::one_to_many("posts", "Post", "author")),
        ]);
        let post = find(&entities, "Post");
        let user = find(&entities, "User");
        let author = post.relation("author").unwrap();
        assert_eq!(author.target, user.id);
        assert_eq!(author.inverse_property.as_deref(), Some("posts"));
        assert_eq!(
            author.join_columns,
            vec![JoinColumn {
                name: "author_id".into(),
                referenced_column: "id".into()
            }]
        );
        let fk = post.column_by_name("author_id").unwrap();
        assert_eq!(fk.column_type, ColumnType::Integer);
        assert_eq!(fk.relation.as_deref(), Some("author"));
        assert!(fk.nullable);

        let posts = user.relation("posts").unwrap();
        assert!(!posts.owning);
        assert_eq!(posts.join_columns, author.join_columns);
        assert_eq!(post.foreign_keys.len(), 1);
        assert_eq!(post.foreign_keys[0].referenced_table, "user");
    }

    #[test]
    fn missing_inverse_side_is_reported() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[
                EntityDescriptor::new("User")
                    .column(ColumnDescriptor::increment_primary("id"))
                    .relation(RelationDescriptor::one_to_many("posts", "Post", "writer")),
                EntityDescriptor::new("Post").column(ColumnDescriptor::increment_primary("id")),
            ])
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownInverseSide { inverse, .. } if inverse == "writer"));
    }

    #[test]
    fn single_table_children_share_root_table_and_database() {
        let entities = build(&[
            EntityDescriptor::new("Content")
                .database("test")
                .inheritance_root(InheritanceStrategy::SingleTable)
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("title", ColumnType::Varchar)),
            EntityDescriptor::new("Photo")
                .extends("Content")
                .column(ColumnDescriptor::new("size", ColumnType::Integer)),
            EntityDescriptor::new("Question")
                .extends("Content")
                .discriminator_value("q")
                .column(ColumnDescriptor::new("answers", ColumnType::Integer)),
        ]);
        let content = find(&entities, "Content");
        let photo = find(&entities, "Photo");
        let question = find(&entities, "Question");

        for entity in [photo, question] {
            assert_eq!(entity.table_name, "content");
            assert_eq!(entity.database.as_deref(), Some("test"));
            assert_eq!(entity.table_type, TableType::StiChild);
        }
        assert_eq!(photo.discriminator_value.as_deref(), Some("Photo"));
        assert_eq!(question.discriminator_value.as_deref(), Some("q"));

        let discriminator = content.discriminator().unwrap();
        assert_eq!(discriminator.database_name, "type");
        assert_eq!(discriminator.native.to_sql(), "varchar(255)");

        let size = content.column_by_name("size").unwrap();
        assert!(size.nullable);
        assert_eq!(size.declared_by, photo.id);
        assert!(content.column_by_name("answers").is_some());
        assert!(photo.column_by_name("answers").is_none());
        assert!(photo.column_by_name("title").unwrap().is_inherited);
    }

    #[test]
    fn explicit_child_database_is_kept_as_declared() {
        let entities = build(&[
            EntityDescriptor::new("Content")
                .database("test")
                .inheritance_root(InheritanceStrategy::SingleTable)
                .column(ColumnDescriptor::increment_primary("id")),
            EntityDescriptor::new("Photo").extends("Content").database("other"),
        ]);
        assert_eq!(find(&entities, "Photo").database.as_deref(), Some("other"));
    }

    #[test]
    fn duplicate_discriminator_values_are_rejected() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[
                EntityDescriptor::new("Content")
                    .inheritance_root(InheritanceStrategy::SingleTable)
                    .column(ColumnDescriptor::increment_primary("id")),
                EntityDescriptor::new("Photo").extends("Content").discriminator_value("x"),
                EntityDescriptor::new("Video").extends("Content").discriminator_value("x"),
            ])
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateDiscriminator { value, .. } if value == "x"));
    }

    #[test]
    fn class_table_child_copies_parent_key() {
        let entities = build(&[
            EntityDescriptor::new("Person")
                .inheritance_root(InheritanceStrategy::ClassTable)
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("name", ColumnType::Varchar)),
            EntityDescriptor::new("Employee")
                .extends("Person")
                .column(ColumnDescriptor::new("salary", ColumnType::Decimal)),
        ]);
        let employee = find(&entities, "Employee");
        assert_eq!(employee.table_name, "employee");
        let id = employee.column("id").unwrap();
        assert!(id.primary);
        assert_eq!(id.generation, None);
        assert!(employee.column("name").is_none());
        assert_eq!(employee.foreign_keys[0].referenced_table, "person");
        assert!(employee.is_class_table_child());
    }

    #[test]
    fn table_per_class_copies_every_column() {
        let entities = build(&[
            EntityDescriptor::new("Base")
                .abstract_entity()
                .column(ColumnDescriptor::increment_primary("id"))
                .column(ColumnDescriptor::new("created", ColumnType::Timestamp)),
            EntityDescriptor::new("Note")
                .extends("Base")
                .column(ColumnDescriptor::new("body", ColumnType::Text)),
        ]);
        let note = find(&entities, "Note");
        assert_eq!(note.inheritance, Some(InheritanceStrategy::TablePerClass));
        assert!(note.column("created").is_some());
        assert!(!find(&entities, "Base").has_own_table());
        assert!(note.has_own_table());
    }

    #[test]
    fn inheritance_cycle_is_detected() {
        let err = MetadataBuilder::new(sqlite())
            .build(&[
                EntityDescriptor::new("A").extends("B"),
                EntityDescriptor::new("B").extends("A"),
            ])
            .unwrap_err();
        assert!(matches!(err, BuildError::InheritanceCycle { .. }));
    }

    #[test]
    fn embedded_columns_are_flattened() {
        let entities = build(&[EntityDescriptor::new("User")
            .column(ColumnDescriptor::increment_primary("id"))
            .embedded(
                EmbeddedDescriptor::new("address")
                    .column(ColumnDescriptor::new("city", ColumnType::Varchar))
                    .column(ColumnDescriptor::new("zip", ColumnType::Varchar)),
            )
            .embedded(
                EmbeddedDescriptor::new("meta")
                    .prefix("")
                    .column(ColumnDescriptor::new("tag", ColumnType::Varchar)),
            )]);
        let user = &entities[0];
        let city = user.column("address.city").unwrap();
        assert_eq!(city.database_name, "address_city");
        assert_eq!(city.embedded_path.as_deref(), Some("address"));
        assert_eq!(user.column("meta.tag").unwrap().database_name, "tag");
    }

    #[test]
    fn many_to_many_generates_junction() {
        let entities = build(&[
            EntityDescriptor::new("Post")
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::many_to_many("tags", "Tag")),
            EntityDescriptor::new("Tag")
                .column(ColumnDescriptor::increment_primary("id"))
                .relation(RelationDescriptor::many_to_many("posts", "Post").inverse_side("tags")),
        ]);
        let junction = find(&entities, "post_tags_tag");
        assert!(junction.is_junction);
        assert_eq!(junction.primary_key_count(), 2);
        assert!(junction.column_by_name("post_id").is_some());
        assert!(junction.column_by_name("tag_id").is_some());
        assert_eq!(junction.foreign_keys.len(), 2);

        let posts = find(&entities, "Tag").relation("posts").unwrap();
        let swapped = posts.junction.as_ref().unwrap();
        assert_eq!(swapped.owner_columns[0].name, "tag_id");
        assert_eq!(swapped.inverse_columns[0].name, "post_id");
    }

    #[test]
    fn self_referencing_many_to_many_suffixes_columns() {
        let entities = build(&[EntityDescriptor::new("User")
            .column(ColumnDescriptor::increment_primary("id"))
            .relation(RelationDescriptor::many_to_many("friends", "User"))]);
        let junction = find(&entities, "user_friends_user");
        assert!(junction.column_by_name("user_id_1").is_some());
        assert!(junction.column_by_name("user_id_2").is_some());
    }

    #[test]
    fn fallback_types_are_recorded() {
        let cap = DialectCapability::new(DialectKind::MariaDb).with_version(DatabaseVersion::new(10, 4, 0));
        let entities = MetadataBuilder::new(cap)
            .build(&[EntityDescriptor::new("User").column(ColumnDescriptor::uuid_primary("id"))])
            .unwrap();
        let id = entities[0].column("id").unwrap();
        assert_eq!(id.native.to_sql(), "varchar(36)");
        assert!(id.fallback.is_some());
    }

    #[test]
    fn indices_resolve_properties() {
        let entities = build(&[EntityDescriptor::new("User")
            .column(ColumnDescriptor::increment_primary("id"))
            .column(ColumnDescriptor::new("email", ColumnType::Varchar).name("email_address"))
            .index(IndexDescriptor::on(["email"]).unique())
            .unique(["id", "email"])]);
        let user = &entities[0];
        assert_eq!(user.indices[0].name, "IDX_user_email_address");
        assert_eq!(user.indices[0].columns, vec!["email_address".to_string()]);
        assert_eq!(user.indices[1].name, "UQ_user_id_email_address");

        let err = MetadataBuilder::new(sqlite())
            .build(&[EntityDescriptor::new("User")
                .column(ColumnDescriptor::increment_primary("id"))
                .index(IndexDescriptor::on(["missing"]))])
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownIndexColumn { column, .. } if column == "missing"));
    }
}
