//! Row mapper
//!
//! Translates between records and rows of cells. Which cell holds which field
//! is decided by the header; how a cell is encoded is decided by the field's
//! descriptor in [`crate::schema`].

mod deserializer;
mod related;
mod serializer;

pub use deserializer::{Header, RowDeserialization, RowDeserializer};
pub use related::build_related;
pub use serializer::{build_row, export_header};

use crate::schema::{self, FieldDescriptor};

/// Separates an extension set from its attribute in a header: `set::attr`.
pub const EXTENSION_SEPARATOR: &str = "::";

/// One exported column after the two sentinel columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Field(&'static FieldDescriptor),
    Extension { set: String, attr: String },
}

impl Column {
    pub fn extension(set: impl Into<String>, attr: impl Into<String>) -> Self {
        Column::Extension {
            set: set.into(),
            attr: attr.into(),
        }
    }
}

/// Header cell naming a column.
pub fn header_for(column: &Column) -> String {
    match column {
        Column::Field(field) => field.name.to_string(),
        Column::Extension { set, attr } => format!("{set}{EXTENSION_SEPARATOR}{attr}"),
    }
}

/// Default export columns followed by every declared extension attribute.
pub fn default_columns(extension_attributes: &[(String, String)]) -> Vec<Column> {
    schema::DEFAULT_EXPORT_FIELDS
        .iter()
        .copied()
        .map(Column::Field)
        .chain(
            extension_attributes
                .iter()
                .map(|(set, attr)| Column::extension(set, attr)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_for_columns() {
        assert_eq!(header_for(&Column::Field(&schema::README)), "readme");
        assert_eq!(header_for(&Column::extension("Quality", "score")), "Quality::score");
    }

    #[test]
    fn test_default_columns_append_extensions() {
        let columns = default_columns(&[("Quality".into(), "score".into())]);
        assert_eq!(columns.len(), schema::DEFAULT_EXPORT_FIELDS.len() + 1);
        assert_eq!(columns.first(), Some(&Column::Field(&schema::NAME)));
        assert_eq!(columns.last(), Some(&Column::extension("Quality", "score")));
    }
}
