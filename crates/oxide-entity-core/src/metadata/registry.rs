//! The published, immutable metadata set.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{EntityId, EntityMetadata, InheritanceStrategy};
use crate::builder::MetadataBuilder;
use crate::descriptor::EntityDescriptor;
use crate::dialect::{Dialect, DialectCapability};
use crate::error::Result;
use crate::validator::MetadataValidator;

/// Every entity of one data source after building and validation.
///
/// A registry is only published once the whole set validated; it is shared
/// read-only behind an [`Arc`] afterwards.
#[derive(Debug)]
pub struct MetadataRegistry {
    entities: Vec<EntityMetadata>,
    by_name: HashMap<String, EntityId>,
    capability: DialectCapability,
}

impl MetadataRegistry {
    /// Builds, validates and publishes metadata for `descriptors`.
    pub fn build(capability: DialectCapability, descriptors: &[EntityDescriptor]) -> Result<Arc<Self>> {
        let entities = MetadataBuilder::new(capability).build(descriptors)?;
        MetadataValidator::new(capability).validate_all(&entities)?;
        let registry = Self::from_validated(capability, entities);
        info!(
            entities = registry.len(),
            dialect = %capability.kind,
            "metadata registry published"
        );
        Ok(Arc::new(registry))
    }

    fn from_validated(capability: DialectCapability, entities: Vec<EntityMetadata>) -> Self {
        let by_name = entities.iter().map(|e| (e.name.clone(), e.id)).collect();
        Self {
            entities,
            by_name,
            capability,
        }
    }

    /// Capability the metadata was built for.
    #[must_use]
    pub const fn capability(&self) -> &DialectCapability {
        &self.capability
    }

    /// Dialect strategy of the capability.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.capability.dialect()
    }

    /// Entity by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn get(&self, id: EntityId) -> &EntityMetadata {
        &self.entities[id.0]
    }

    /// Entity by name (junction entities are named after their table).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&EntityMetadata> {
        self.by_name.get(name).map(|id| self.get(*id))
    }

    /// All entities, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.iter()
    }

    /// Number of entities, junctions included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Root of the hierarchy `id` belongs to.
    #[must_use]
    pub fn root(&self, id: EntityId) -> &EntityMetadata {
        self.get(self.get(id).root)
    }

    /// `id` and every entity below it, parents before children.
    #[must_use]
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.get(current).children.iter().rev().copied());
        }
        out
    }

    /// Entity of a single-table hierarchy whose discriminator value is
    /// `value`.
    #[must_use]
    pub fn entity_for_discriminator(&self, root: EntityId, value: &str) -> Option<&EntityMetadata> {
        if self.get(root).inheritance != Some(InheritanceStrategy::SingleTable) {
            return None;
        }
        self.descendants(root)
            .into_iter()
            .map(|id| self.get(id))
            .find(|e| e.discriminator_value.as_deref() == Some(value))
    }

    /// Entities that own a physical table, in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.iter().filter(|e| e.has_own_table())
    }
}
