use super::EXTENSION_SEPARATOR;
use crate::cache::Lookups;
use crate::codec::{self, LIST_DELIMITER};
use crate::error::{LoaderError, RowError};
use crate::model::{EmbeddedDoc, Record, Value};
use crate::schema::{self, FieldDescriptor, NATURAL_KEY, TYPE_TAG};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeaderCell {
    Blank,
    Sentinel,
    Extension { set: String, attr: String },
    Field(String),
}

/// Validated header of an input file.
#[derive(Debug, Clone)]
pub struct Header {
    names: Vec<String>,
    cells: Vec<HeaderCell>,
    type_tag: usize,
    natural_key: usize,
}

impl Header {
    /// Fails when either sentinel column is missing.
    pub fn parse(names: Vec<String>) -> Result<Self, LoaderError> {
        let position = |wanted: &str| names.iter().position(|name| name == wanted);
        let type_tag = position(TYPE_TAG).ok_or_else(|| {
            LoaderError::Structural(format!("header has no `{TYPE_TAG}` column"))
        })?;
        let natural_key = position(NATURAL_KEY).ok_or_else(|| {
            LoaderError::Structural(format!("header has no `{NATURAL_KEY}` column"))
        })?;

        let cells = names
            .iter()
            .map(|name| match name.as_str() {
                "" => HeaderCell::Blank,
                TYPE_TAG | NATURAL_KEY => HeaderCell::Sentinel,
                other => match other.split_once(EXTENSION_SEPARATOR) {
                    Some((set, attr)) => HeaderCell::Extension {
                        set: set.to_string(),
                        attr: attr.to_string(),
                    },
                    None => HeaderCell::Field(other.to_string()),
                },
            })
            .collect();

        Ok(Self {
            names,
            cells,
            type_tag,
            natural_key,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }
}

/// Everything one row produced.
#[derive(Debug, Clone)]
pub struct RowDeserialization {
    pub primary: Record,
    /// Partial records to create once the primary has a real id, by field.
    pub related: BTreeMap<String, Vec<Record>>,
    /// Cleared fields to verify against the store after the load.
    pub clear_checks: Vec<&'static FieldDescriptor>,
    /// Cells that failed to decode. Their fields were left off the record.
    pub field_errors: Vec<RowError>,
}

pub struct RowDeserializer {
    header: Header,
    clear_fields: Vec<String>,
}

impl RowDeserializer {
    pub fn new(header: Header, clear_fields: Vec<String>) -> Self {
        Self {
            header,
            clear_fields,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn parse_row(
        &self,
        row: &[String],
        lookups: &Lookups,
    ) -> Result<RowDeserialization, RowError> {
        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or_default();
        let type_tag = cell(self.header.type_tag);
        let natural_key = cell(self.header.natural_key);
        if type_tag.is_empty() || natural_key.is_empty() {
            return Err(RowError::MissingSentinel);
        }

        let mut primary = Record::new(type_tag, natural_key);
        let mut related: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        let mut field_errors = Vec::new();

        for (idx, column) in self.header.cells.iter().enumerate() {
            let text = cell(idx);
            match column {
                HeaderCell::Blank | HeaderCell::Sentinel => {}
                HeaderCell::Extension { set, attr } => {
                    if let Some(value) = extension_value(text) {
                        primary.set_extension(set, attr, value);
                    }
                }
                HeaderCell::Field(name) => {
                    let Some(field) = schema::field_for(type_tag, name) else {
                        log::debug!("{} has no field {}, skipping column", type_tag, name);
                        continue;
                    };
                    match codec::decode(text, &field.kind, field.name, lookups) {
                        Ok(Some(value)) if field.relate_after_create() => {
                            let partials = partial_records(&primary, field, value);
                            if !partials.is_empty() {
                                related.insert(field.name.to_string(), partials);
                            }
                        }
                        Ok(Some(value)) => primary.set(field, value),
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!("{} {}: skipping {}: {}", type_tag, natural_key, name, e);
                            field_errors.push(e);
                        }
                    }
                }
            }
        }

        let mut clear_checks = Vec::new();
        for name in &self.clear_fields {
            let Some(idx) = self.header.position(name) else {
                continue;
            };
            if !cell(idx).is_empty() {
                continue;
            }
            let Some(field) = schema::field_for(type_tag, name) else {
                continue;
            };
            primary.clear(field);
            if !related.contains_key(field.name) {
                clear_checks.push(field);
            }
        }

        Ok(RowDeserialization {
            primary,
            related,
            clear_checks,
            field_errors,
        })
    }
}

/// Multi-line extension values become lists of strings.
fn extension_value(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if text.contains(LIST_DELIMITER) {
        Some(Value::List(
            text.split(LIST_DELIMITER)
                .map(|item| Value::Str(item.to_string()))
                .collect(),
        ))
    } else {
        Some(Value::Str(text.to_string()))
    }
}

fn partial_records(owner: &Record, field: &FieldDescriptor, value: Value) -> Vec<Record> {
    if field.embed_kind().is_none() {
        let mut update = Record::new(&owner.type_tag, &owner.natural_key);
        update.set(field, value);
        return vec![update];
    }
    let docs = match value {
        Value::List(items) => items,
        single => vec![single],
    };
    docs.into_iter()
        .filter_map(|item| match item {
            Value::Embedded(doc) => Some(embedded_record(doc)),
            _ => None,
        })
        .collect()
}

/// Partial record holding a sub-document's content, keyed later.
fn embedded_record(doc: EmbeddedDoc) -> Record {
    let mut record = Record::new(doc.type_tag(), "");
    match doc {
        EmbeddedDoc::Readme { description } => {
            record.set_attribute("description", Value::Str(description));
        }
        EmbeddedDoc::Link { name, url } => {
            record.set_attribute("name", Value::Str(name));
            record.set_attribute("link", Value::Str(url));
        }
    }
    record
}
