use crate::cache::{Lookups, TERM_SEPARATOR};
use crate::error::RowError;
use crate::model::{EmbeddedDoc, RecordRef};
use crate::schema::EmbedKind;
use serde::{Deserialize, Serialize};

/// Separates a reference's type tag from its natural key.
pub const REFERENCE_SEPARATOR: char = '@';

/// JSON literal carried in a link cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkLiteral {
    pub link: String,
    pub name: String,
}

pub(super) fn encode(target: &RecordRef) -> String {
    match &target.label {
        Some(label) => format!("{}{}{}", label.name, TERM_SEPARATOR, label.container),
        None => format!(
            "{}{}{}",
            target.type_tag, REFERENCE_SEPARATOR, target.natural_key
        ),
    }
}

/// Splits on the first separator; the natural key may contain more.
pub(super) fn decode(text: &str, field: &str) -> Result<RecordRef, RowError> {
    match text.split_once(REFERENCE_SEPARATOR) {
        Some((type_tag, natural_key)) if !type_tag.is_empty() && !natural_key.is_empty() => {
            Ok(RecordRef::by_key(type_tag, natural_key))
        }
        _ => Err(RowError::InvalidReference {
            field: field.to_string(),
            value: text.to_string(),
        }),
    }
}

pub(super) fn decode_term(
    text: &str,
    field: &str,
    lookups: &Lookups,
) -> Result<RecordRef, RowError> {
    let term = lookups.terms.get(text).ok_or_else(|| RowError::LookupMiss {
        field: field.to_string(),
        identity: text.to_string(),
    })?;
    let mut target = term.to_ref();
    if let Some((name, container)) = text.split_once(TERM_SEPARATOR) {
        target = target.with_label(name, container);
    }
    Ok(target)
}

pub(super) fn encode_embedded(doc: &EmbeddedDoc) -> String {
    match doc {
        EmbeddedDoc::Readme { description } => description.clone(),
        EmbeddedDoc::Link { name, url } => serde_json::to_string(&LinkLiteral {
            link: url.clone(),
            name: name.clone(),
        })
        .unwrap_or_default(),
    }
}

pub(super) fn decode_embedded(
    text: &str,
    embed: EmbedKind,
    field: &str,
) -> Result<EmbeddedDoc, RowError> {
    match embed {
        EmbedKind::Readme => Ok(EmbeddedDoc::Readme {
            description: text.to_string(),
        }),
        EmbedKind::Link => {
            let literal: LinkLiteral =
                serde_json::from_str(text).map_err(|e| RowError::invalid_cell(field, text, e))?;
            Ok(EmbeddedDoc::Link {
                name: literal.name,
                url: literal.link,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_on_first_separator() {
        let target = decode("Column@default/db/t1/c@1", "columns").unwrap();
        assert_eq!(target.type_tag, "Column");
        assert_eq!(target.natural_key, "default/db/t1/c@1");
    }

    #[test]
    fn test_decode_rejects_missing_parts() {
        assert!(decode("no-separator", "f").is_err());
        assert!(decode("@key", "f").is_err());
        assert!(decode("Table@", "f").is_err());
    }

    #[test]
    fn test_labelled_reference_encodes_label() {
        let target = RecordRef::by_key("GlossaryTerm", "xyz").with_label("Revenue", "Business");
        assert_eq!(encode(&target), "Revenue@@@Business");
    }

    #[test]
    fn test_link_literal_shape() {
        let text = encode_embedded(&EmbeddedDoc::Link {
            name: "Docs".into(),
            url: "https://example.com".into(),
        });
        assert_eq!(text, r#"{"link":"https://example.com","name":"Docs"}"#);
    }

    #[test]
    fn test_malformed_link_is_invalid_cell() {
        let err = decode_embedded("not json", EmbedKind::Link, "links").unwrap_err();
        assert!(matches!(err, RowError::InvalidCell { .. }));
    }
}
