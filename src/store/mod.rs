//! Boundary to the remote object store.
//!
//! The loader only ever talks to the store through these traits:
//!
//! - [`UpsertClient`]: batched create-or-update keyed by `(type_tag, natural_key)`
//! - [`AssetStore`]: fetch a record by id and soft-delete records
//! - [`QueryService`]: count and stream records for export
//! - [`Directory`]: name-based lookups backing the reference caches
//!
//! [`MemoryStore`] implements all four in-process.

mod batch;
mod memory;
mod query;

pub use batch::PendingBatch;
pub use memory::MemoryStore;
pub use query::{EXCLUDED_TYPES, ExportScope, Filter};

use crate::config::ConfigError;
use crate::model::Record;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors reported by store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("request rejected by store: {0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot {path}: {reason}")]
    Snapshot { path: String, reason: String },
}

/// How upserts treat natural keys the store has not seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertMode {
    /// Create missing records, update existing ones.
    Upsert,
    /// Only update existing records; unknown keys fail.
    #[default]
    UpdateOnly,
}

impl FromStr for UpsertMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(UpsertMode::Upsert),
            "update" => Ok(UpsertMode::UpdateOnly),
            other => Err(ConfigError::InvalidChoice {
                key: "UPSERT_SEMANTIC",
                value: other.to_string(),
            }),
        }
    }
}

/// Records the store refused, grouped under one reason.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub reason: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertResponse {
    pub created: Vec<Record>,
    pub updated: Vec<Record>,
    pub failures: Vec<BatchFailure>,
    /// Placeholder id to real id, for every accepted record.
    pub resolved: HashMap<String, String>,
}

pub trait UpsertClient: Send + Sync {
    fn upsert(&self, records: &[Record], mode: UpsertMode) -> Result<UpsertResponse, StoreError>;
}

pub trait AssetStore: Send + Sync {
    /// Fetches a live record by id, populating only the named fields.
    fn fetch(&self, id: &str, fields: &[&str]) -> Result<Option<Record>, StoreError>;

    /// Soft-deletes records, returning the ids that changed state.
    fn soft_delete(&self, ids: &[String]) -> Result<Vec<String>, StoreError>;
}

pub trait QueryService: Send + Sync {
    fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    fn stream(&self, filter: &Filter)
    -> Result<Box<dyn Iterator<Item = Record> + Send>, StoreError>;

    /// Every `(set, attribute)` pair declared by the store, sorted.
    fn extension_attributes(&self) -> Result<Vec<(String, String)>, StoreError>;
}

pub trait Directory: Send + Sync {
    /// Finds a live record of `type_tag` by name, optionally within a container.
    fn find_by_name(
        &self,
        type_tag: &str,
        name: &str,
        container: Option<&str>,
    ) -> Result<Option<Record>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_mode_parse() {
        assert_eq!("upsert".parse::<UpsertMode>().unwrap(), UpsertMode::Upsert);
        assert_eq!("UPDATE".parse::<UpsertMode>().unwrap(), UpsertMode::UpdateOnly);
        assert!("merge".parse::<UpsertMode>().is_err());
        assert_eq!(UpsertMode::default(), UpsertMode::UpdateOnly);
    }
}
