use dashmap::DashMap;
use std::collections::HashMap;

/// State shared by every worker for the duration of one load.
#[derive(Default)]
pub struct RunContext {
    /// Placeholder id → real id, written while primary batches flush.
    resolved: DashMap<String, String>,
    /// `(type_tag, natural_key)` → rows seen.
    natural_keys: DashMap<(String, String), usize>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a row's natural key, returning how often it has now been seen.
    pub fn register_key(&self, type_tag: &str, natural_key: &str) -> usize {
        let mut seen = self
            .natural_keys
            .entry((type_tag.to_string(), natural_key.to_string()))
            .or_insert(0);
        *seen += 1;
        *seen
    }

    pub fn duplicate_keys(&self) -> usize {
        self.natural_keys
            .iter()
            .filter(|entry| *entry.value() > 1)
            .count()
    }

    /// Publishes ids resolved by a flush. The first resolution of a
    /// placeholder wins.
    pub fn publish(&self, resolved: &HashMap<String, String>) {
        for (placeholder, real) in resolved {
            let existing = self
                .resolved
                .entry(placeholder.clone())
                .or_insert_with(|| real.clone());
            if existing.value() != real {
                log::warn!(
                    "placeholder {} already resolved to {}, ignoring {}",
                    placeholder,
                    existing.value(),
                    real
                );
            }
        }
    }

    /// Real id for a placeholder.
    ///
    /// # Returns
    /// `None` when the record carrying the placeholder was refused or never
    /// flushed, which callers treat as "drop the deferred work".
    pub fn resolve(&self, placeholder: &str) -> Option<String> {
        self.resolved
            .get(placeholder)
            .map(|entry| entry.value().clone())
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}
