//! Reference caches
//!
//! Memoize identity → record resolution over an external lookup for the
//! duration of a run.
//!
//! ## Design
//!
//! - Uses DashMap for thread-safe concurrent access from every loader worker
//! - Each identity owns a `OnceLock` slot, so concurrent callers asking for the
//!   same identity share a single lookup
//! - Misses are cached too and are never retried within a run; there is no TTL

mod lookups;

pub use lookups::{Lookups, TERM_SEPARATOR, glossary_cache, term_cache};

use crate::model::Record;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

type Lookup = Box<dyn Fn(&str) -> Option<Record> + Send + Sync>;

/// Run-scoped memo of identity → record.
pub struct RecordCache {
    name: &'static str,
    entries: DashMap<String, Arc<OnceLock<Option<Record>>>>,
    lookup: Lookup,
}

impl RecordCache {
    pub fn new(
        name: &'static str,
        lookup: impl Fn(&str) -> Option<Record> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            lookup: Box::new(lookup),
        }
    }

    /// Resolves an identity, calling the lookup at most once per identity.
    pub fn get(&self, identity: &str) -> Option<Record> {
        // The DashMap shard lock is released before the lookup runs.
        let slot = Arc::clone(&*self.entries.entry(identity.to_string()).or_default());
        slot.get_or_init(|| {
            let found = (self.lookup)(identity);
            if found.is_none() {
                log::debug!("{} cache: no match for {}", self.name, identity);
            }
            found
        })
        .clone()
    }

    /// Seeds the cache with a known result.
    pub fn insert(&self, identity: impl Into<String>, record: Option<Record>) {
        let slot = OnceLock::new();
        let _ = slot.set(record);
        self.entries.insert(identity.into(), Arc::new(slot));
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries
            .get(identity)
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
