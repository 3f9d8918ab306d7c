use super::value::{RecordRef, TagAssignment, Value};
use crate::schema::FieldDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const PLACEHOLDER_PREFIX: char = '-';

/// State of a field carried on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldState {
    Set(Value),
    /// Explicitly emptied. Distinct from the field being absent.
    Cleared,
}

impl FieldState {
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldState::Set(value) => Some(value),
            FieldState::Cleared => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_tag: String,
    pub natural_key: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, FieldState>,
    #[serde(default)]
    pub relations: BTreeMap<String, FieldState>,
    #[serde(default)]
    pub extension_sets: BTreeMap<String, BTreeMap<String, Value>>,
    /// `None` leaves tags untouched; `Some(vec![])` removes them all.
    #[serde(default)]
    pub tags: Option<Vec<TagAssignment>>,
}

impl Record {
    /// New record with a fresh placeholder id.
    pub fn new(type_tag: impl Into<String>, natural_key: impl Into<String>) -> Self {
        Self::with_id(type_tag, natural_key, placeholder_id())
    }

    pub fn with_id(
        type_tag: impl Into<String>,
        natural_key: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            type_tag: type_tag.into(),
            natural_key: natural_key.into(),
            id: id.into(),
            attributes: BTreeMap::new(),
            relations: BTreeMap::new(),
            extension_sets: BTreeMap::new(),
            tags: None,
        }
    }

    pub fn has_placeholder_id(&self) -> bool {
        is_placeholder(&self.id)
    }

    /// Sets a schema field, routing it to the attribute, relation or tag slot.
    pub fn set(&mut self, field: &FieldDescriptor, value: Value) {
        if field.is_tags() {
            let tags = match value {
                Value::List(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Tag(tag) => Some(tag),
                        _ => None,
                    })
                    .collect(),
                Value::Tag(tag) => vec![tag],
                _ => Vec::new(),
            };
            self.tags = Some(tags);
        } else if field.is_relation() {
            self.relations
                .insert(field.name.to_string(), FieldState::Set(value));
        } else {
            self.attributes
                .insert(field.name.to_string(), FieldState::Set(value));
        }
    }

    /// Marks a schema field as explicitly empty.
    pub fn clear(&mut self, field: &FieldDescriptor) {
        if field.is_tags() {
            self.tags = Some(Vec::new());
        } else if field.is_relation() {
            self.relations
                .insert(field.name.to_string(), FieldState::Cleared);
        } else {
            self.attributes
                .insert(field.name.to_string(), FieldState::Cleared);
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes
            .insert(name.to_string(), FieldState::Set(value));
    }

    pub fn set_relation(&mut self, name: &str, value: Value) {
        self.relations
            .insert(name.to_string(), FieldState::Set(value));
    }

    /// State of a named attribute or relation, if the record carries it.
    pub fn state(&self, name: &str) -> Option<&FieldState> {
        self.attributes
            .get(name)
            .or_else(|| self.relations.get(name))
    }

    /// Current value of a schema field, `None` when absent or cleared.
    pub fn value_of(&self, field: &FieldDescriptor) -> Option<Value> {
        if field.is_tags() {
            return self
                .tags
                .as_ref()
                .map(|tags| Value::List(tags.iter().cloned().map(Value::Tag).collect()));
        }
        self.state(field.name)
            .and_then(FieldState::value)
            .cloned()
    }

    pub fn set_extension(&mut self, set: &str, attr: &str, value: Value) {
        self.extension_sets
            .entry(set.to_string())
            .or_default()
            .insert(attr.to_string(), value);
    }

    pub fn extension(&self, set: &str, attr: &str) -> Option<&Value> {
        self.extension_sets
            .get(set)
            .and_then(|attrs| attrs.get(attr))
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes
            .get("name")
            .and_then(FieldState::value)
            .and_then(Value::as_str)
    }

    pub fn to_ref(&self) -> RecordRef {
        RecordRef::by_key(&self.type_tag, &self.natural_key).with_id(&self.id)
    }

    /// Minimal copy carrying identity and name only.
    pub fn trim_to_reference(&self) -> Record {
        let mut trimmed = Record::with_id(&self.type_tag, &self.natural_key, &self.id);
        if let Some(name) = self.name() {
            trimmed.set_attribute("name", Value::Str(name.to_string()));
        }
        trimmed
    }
}

/// Generates a placeholder id. Placeholders never collide with store ids.
pub fn placeholder_id() -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, Uuid::new_v4().simple())
}

pub fn is_placeholder(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}
