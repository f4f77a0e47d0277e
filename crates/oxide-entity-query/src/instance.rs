//! Hydrated entity values.

use std::collections::BTreeMap;

use oxide_entity_core::value::SqlValue;
use serde_json::{Map, Value as JsonValue};

/// A property value of a hydrated entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Column value.
    Scalar(SqlValue),
    /// Embedded value object, keyed by property.
    Embedded(BTreeMap<String, FieldValue>),
    /// Single related entity; `None` when absent.
    One(Option<Box<EntityInstance>>),
    /// Related entities, in first-appearance order.
    Many(Vec<EntityInstance>),
}

impl FieldValue {
    /// Converts into JSON.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Scalar(value) => value.to_json(),
            Self::Embedded(fields) => fields_to_json(fields),
            Self::One(Some(instance)) => instance.to_json(),
            Self::One(None) => JsonValue::Null,
            Self::Many(instances) => {
                JsonValue::Array(instances.iter().map(EntityInstance::to_json).collect())
            }
        }
    }
}

/// A hydrated entity: its concrete entity name and property values.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    /// Concrete entity name (a subclass for inheritance hierarchies).
    pub entity: String,
    /// Property values.
    pub fields: BTreeMap<String, FieldValue>,
}

impl EntityInstance {
    /// Creates an empty instance of `entity`.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Field by property name.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&FieldValue> {
        self.fields.get(property)
    }

    /// Scalar at `path`, descending into embedded values (`address.city`).
    #[must_use]
    pub fn scalar(&self, path: &str) -> Option<&SqlValue> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            match current {
                FieldValue::Embedded(fields) => current = fields.get(segment)?,
                _ => return None,
            }
        }
        match current {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Single related entity.
    #[must_use]
    pub fn one(&self, property: &str) -> Option<&Self> {
        match self.fields.get(property)? {
            FieldValue::One(Some(instance)) => Some(instance),
            _ => None,
        }
    }

    /// Related entities of a collection; empty when absent.
    #[must_use]
    pub fn many(&self, property: &str) -> &[Self] {
        match self.fields.get(property) {
            Some(FieldValue::Many(instances)) => instances,
            _ => &[],
        }
    }

    /// Converts into a JSON object of its fields.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        fields_to_json(&self.fields)
    }
}

fn fields_to_json(fields: &BTreeMap<String, FieldValue>) -> JsonValue {
    let map: Map<String, JsonValue> = fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    JsonValue::Object(map)
}
