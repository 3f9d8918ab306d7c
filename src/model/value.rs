use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed value, as held on a record or decoded from a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Enum(String),
    Struct(StructValue),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Ref(RecordRef),
    Embedded(EmbeddedDoc),
    Tag(TagAssignment),
}

impl Value {
    /// True for empty strings and empty collections.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) | Value::Enum(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Record references held directly or inside a list.
    pub fn refs(&self) -> Vec<&RecordRef> {
        match self {
            Value::Ref(r) => vec![r],
            Value::List(items) => items.iter().flat_map(Value::refs).collect(),
            _ => Vec::new(),
        }
    }
}

/// A small structured value, such as starred details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructValue {
    pub type_name: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Human-readable qualified name of a term-like record: `{name}@@@{container}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefLabel {
    pub name: String,
    pub container: String,
}

/// Pointer from one record to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub type_tag: String,
    pub natural_key: String,
    /// Surrogate id of the target, when known.
    pub id: Option<String>,
    pub label: Option<RefLabel>,
}

impl RecordRef {
    pub fn by_key(type_tag: impl Into<String>, natural_key: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            natural_key: natural_key.into(),
            id: None,
            label: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, container: impl Into<String>) -> Self {
        self.label = Some(RefLabel {
            name: name.into(),
            container: container.into(),
        });
        self
    }
}

/// Content of a sub-document that is modelled as an attribute of its owner
/// but persisted as a record of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddedDoc {
    Readme { description: String },
    Link { name: String, url: String },
}

impl EmbeddedDoc {
    /// Type tag of the record this document is persisted as.
    pub fn type_tag(&self) -> &'static str {
        match self {
            EmbeddedDoc::Readme { .. } => "Readme",
            EmbeddedDoc::Link { .. } => "Link",
        }
    }
}

/// How a classification tag spreads to related records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Propagation {
    #[default]
    None,
    Full,
    HierarchyOnly,
}

impl Propagation {
    pub fn as_str(self) -> &'static str {
        match self {
            Propagation::None => "",
            Propagation::Full => "FULL",
            Propagation::HierarchyOnly => "HIERARCHY_ONLY",
        }
    }

    /// Unknown or missing modes turn propagation off.
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_ascii_uppercase().as_str() {
            "FULL" => Propagation::Full,
            "HIERARCHY_ONLY" => Propagation::HierarchyOnly,
            _ => Propagation::None,
        }
    }
}

/// A classification tag attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagAssignment {
    pub tag_name: String,
    pub propagation: Propagation,
    /// Record the tag was assigned on. `None` means directly on the holder.
    pub origin: Option<String>,
}

impl TagAssignment {
    pub fn direct(tag_name: impl Into<String>, propagation: Propagation) -> Self {
        Self {
            tag_name: tag_name.into(),
            propagation,
            origin: None,
        }
    }

    /// Whether the tag was assigned on `owner_id` itself rather than inherited.
    pub fn is_direct_on(&self, owner_id: &str) -> bool {
        self.origin.as_deref().is_none_or(|origin| origin == owner_id)
    }
}
