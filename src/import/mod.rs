//! Bulk record import system.
//!
//! This module loads a delimited file into the store:
//!
//! 1. **Reading** (`reader`) - Validates the header and streams rows
//! 2. **Coordination** (`coordinator`) - Runs the phased, multi-threaded load
//! 3. **Worker state** (`data_structures`) - Per-worker batches and deferred work
//! 4. **Run context** (`context`) - Resolved ids and natural keys seen this run
//! 5. **Statistics** (`stats`) - Tracks load metrics
//!
//! # Architecture
//!
//! Rows are parsed in parallel on a fixed rayon pool. Each worker owns a slot
//! with its own pending batches, so rows never contend for a batch. Work that
//! needs a real id (creating readmes and links, checking cleared fields) is
//! held against the row's placeholder id and only performed after every
//! primary batch has flushed and published its resolutions.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use bulk_loader::import::{BulkLoader, CsvSource, LoadOptions, RunContext};
//!
//! let source = CsvSource::open("assets.csv", b',')?;
//! let loader = BulkLoader::new(&store, &store, &lookups, LoadOptions::default());
//! let stats = loader.run(&source, &RunContext::new())?;
//!
//! println!("Created {} records", stats.primary.created);
//! ```

pub mod context;
pub mod coordinator;
pub mod data_structures;
pub mod reader;
pub mod stats;

// Re-export main types
pub use context::RunContext;
pub use coordinator::{BulkLoader, LoadOptions, LoadPhase};
pub use reader::CsvSource;
pub use stats::{BatchStats, LoadStats};
