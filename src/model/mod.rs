//! Typed record model.
//!
//! Everything that moves between the tabular format and the store is expressed
//! with these types:
//!
//! - **`Record`**: one node, identified by `(type_tag, natural_key)` and carrying
//!   a surrogate `id` that is a placeholder until the store resolves it
//! - **`FieldState`**: distinguishes an explicitly cleared field from a set one;
//!   a field that is absent from the record is untouched
//! - **`Value`**: the tagged union every cell decodes into
//!
//! Relation-valued fields (references, term references and embedded
//! sub-documents) live in `Record::relations`; all other schema fields live in
//! `Record::attributes`. Classification tags have their own slot.

mod record;
mod value;

pub use record::{FieldState, Record, is_placeholder, placeholder_id};
pub use value::{EmbeddedDoc, Propagation, RecordRef, RefLabel, StructValue, TagAssignment, Value};
