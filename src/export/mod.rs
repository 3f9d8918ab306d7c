//! Streaming export of store records into a delimited file.
//!
//! Records are pulled from the query service, encoded in parallel and written
//! through a single lock-guarded writer. Row order is not preserved.

mod exporter;
mod writer;

pub use exporter::{ExportStats, Exporter};
pub use writer::SharedWriter;
