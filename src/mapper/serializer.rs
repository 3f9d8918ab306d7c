use super::{Column, header_for};
use crate::codec;
use crate::model::Record;
use crate::schema::{NATURAL_KEY, TYPE_TAG};

/// Header row: the sentinels, then one cell per column.
pub fn export_header(columns: &[Column]) -> Vec<String> {
    [NATURAL_KEY.to_string(), TYPE_TAG.to_string()]
        .into_iter()
        .chain(columns.iter().map(header_for))
        .collect()
}

/// Encodes a record as a row matching [`export_header`].
pub fn build_row(record: &Record, columns: &[Column]) -> Vec<String> {
    let mut row = Vec::with_capacity(columns.len() + 2);
    row.push(record.natural_key.clone());
    row.push(record.type_tag.clone());
    for column in columns {
        let cell = match column {
            Column::Field(field) => record
                .value_of(field)
                .map(|value| codec::encode(&record.id, &value)),
            Column::Extension { set, attr } => record
                .extension(set, attr)
                .map(|value| codec::encode(&record.id, value)),
        };
        row.push(cell.unwrap_or_default());
    }
    row
}
