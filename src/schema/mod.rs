//! Static field-descriptor tables.
//!
//! Every record type shares the common table in [`fields`]; a handful of types
//! add their own fields on top. Lookup checks the type-specific table first so
//! a type can narrow a common field.

mod fields;

pub use fields::*;

/// Column holding the record's type tag. Mandatory in every header.
pub const TYPE_TAG: &str = "typeTag";
/// Column holding the record's natural key. Mandatory in every header.
pub const NATURAL_KEY: &str = "naturalKey";

/// Sub-document flavours persisted as separate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedKind {
    Readme,
    Link,
}

/// Declared type of a field; drives decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Str,
    Bool,
    Int,
    Float,
    Enum(&'static [&'static str]),
    Struct(&'static str),
    Reference,
    TermReference,
    Tag,
    Embedded(EmbedKind),
    Collection(&'static Kind),
    Map(&'static Kind),
}

impl Kind {
    /// Element kind for collections and maps, the kind itself otherwise.
    pub fn element(&self) -> &Kind {
        match self {
            Kind::Collection(inner) | Kind::Map(inner) => inner,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: Kind,
    relate_after_create: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            relate_after_create: false,
        }
    }

    /// Marks the field as only settable by relating a separately created record.
    pub const fn related_after_create(mut self) -> Self {
        self.relate_after_create = true;
        self
    }

    pub fn cardinality(&self) -> Cardinality {
        match self.kind {
            Kind::Collection(_) | Kind::Map(_) => Cardinality::Multi,
            _ => Cardinality::Single,
        }
    }

    pub fn embed_kind(&self) -> Option<EmbedKind> {
        match self.kind.element() {
            Kind::Embedded(embed) => Some(*embed),
            _ => None,
        }
    }

    pub fn relate_after_create(&self) -> bool {
        self.relate_after_create || self.embed_kind().is_some()
    }

    pub fn is_tags(&self) -> bool {
        matches!(self.kind.element(), Kind::Tag)
    }

    /// Reference-valued fields live in a record's relation map.
    pub fn is_relation(&self) -> bool {
        matches!(
            self.kind.element(),
            Kind::Reference | Kind::TermReference | Kind::Embedded(_)
        )
    }
}

/// Resolves a field by type tag and name.
pub fn field_for(type_tag: &str, name: &str) -> Option<&'static FieldDescriptor> {
    type_fields(type_tag)
        .iter()
        .chain(COMMON_FIELDS.iter())
        .copied()
        .find(|field| field.name == name)
}
