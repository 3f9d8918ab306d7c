//! Cell codec
//!
//! Converts between typed [`Value`]s and the text of a single delimited cell.
//!
//! ## Encodings
//!
//! - Scalars: locale-independent literals (`true`/`false`, plain numbers)
//! - Collections and maps: elements joined with [`LIST_DELIMITER`], map entries
//!   as `key=value`; element text is never escaped
//! - References: `{typeTag}@{naturalKey}`, or `{name}@@@{container}` when labelled
//! - Embedded documents: a readme's description, a link's JSON literal
//! - Tags: `{tag}>>{mode}`, only where the tag was assigned directly
//! - Structs: compact JSON object literal
//!
//! Decoding empty text yields no value, so an empty readme or string does not
//! survive a round trip. Empty list elements are dropped on encode and
//! element boundaries are not preserved for elements containing
//! [`LIST_DELIMITER`]. Maps cannot be decoded.

mod reference;
mod tag;

pub use reference::{LinkLiteral, REFERENCE_SEPARATOR};
pub use tag::TAG_SEPARATOR;

use crate::cache::Lookups;
use crate::error::RowError;
use crate::model::{StructValue, Value};
use crate::schema::Kind;
use std::collections::BTreeMap;

/// Joins the elements of a multi-valued cell.
pub const LIST_DELIMITER: &str = "\n";

/// Encodes a value for the record identified by `owner_id`.
pub fn encode(owner_id: &str, value: &Value) -> String {
    match value {
        Value::Str(s) | Value::Enum(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Struct(s) => serde_json::to_string(&s.fields).unwrap_or_default(),
        Value::List(items) => join(items.iter().map(|item| encode(owner_id, item))),
        Value::Map(entries) => join(
            entries
                .iter()
                .map(|(key, item)| format!("{}={}", key, encode(owner_id, item))),
        ),
        Value::Ref(target) => reference::encode(target),
        Value::Embedded(doc) => reference::encode_embedded(doc),
        Value::Tag(assignment) => tag::encode(owner_id, assignment),
    }
}

/// Skips empty elements, such as tags inherited from elsewhere.
fn join(elements: impl Iterator<Item = String>) -> String {
    elements
        .filter(|element| !element.is_empty())
        .collect::<Vec<_>>()
        .join(LIST_DELIMITER)
}

/// Decodes a cell for `field` according to its declared kind.
pub fn decode(
    text: &str,
    kind: &Kind,
    field: &str,
    lookups: &Lookups,
) -> Result<Option<Value>, RowError> {
    if text.is_empty() {
        return Ok(None);
    }
    let value = match kind {
        Kind::Str => Value::Str(text.to_string()),
        Kind::Bool => Value::Bool(text.eq_ignore_ascii_case("true")),
        Kind::Int => Value::Int(
            text.parse()
                .map_err(|e| RowError::invalid_cell(field, text, e))?,
        ),
        Kind::Float => Value::Float(
            text.parse()
                .map_err(|e| RowError::invalid_cell(field, text, e))?,
        ),
        Kind::Enum(allowed) => {
            if !allowed.iter().any(|name| *name == text) {
                return Err(RowError::invalid_cell(
                    field,
                    text,
                    format!("expected one of {}", allowed.join(", ")),
                ));
            }
            Value::Enum(text.to_string())
        }
        Kind::Struct(type_name) => {
            let fields: BTreeMap<String, serde_json::Value> =
                serde_json::from_str(text).map_err(|e| RowError::invalid_cell(field, text, e))?;
            Value::Struct(StructValue {
                type_name: type_name.to_string(),
                fields,
            })
        }
        Kind::Reference => Value::Ref(reference::decode(text, field)?),
        Kind::TermReference => Value::Ref(reference::decode_term(text, field, lookups)?),
        Kind::Tag => Value::Tag(tag::decode(text)),
        Kind::Embedded(embed) => Value::Embedded(reference::decode_embedded(text, *embed, field)?),
        Kind::Collection(inner) => {
            let mut items = Vec::new();
            for element in text.split(LIST_DELIMITER) {
                if let Some(item) = decode(element, inner, field, lookups)? {
                    items.push(item);
                }
            }
            Value::List(items)
        }
        Kind::Map(_) => {
            return Err(RowError::Unsupported {
                field: field.to_string(),
                kind: "map",
            });
        }
    };
    Ok(Some(value))
}
