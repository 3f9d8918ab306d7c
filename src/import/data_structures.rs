//! Per-worker state held between load phases.

use crate::mapper::RowDeserialization;
use crate::model::Record;
use crate::schema::FieldDescriptor;
use crate::store::{PendingBatch, UpsertClient, UpsertMode};
use std::collections::BTreeMap;

/// Sub-records to create once the owner's placeholder resolves.
#[derive(Debug, Clone)]
pub struct DeferredRelation {
    pub owner_placeholder: String,
    /// Identity and name of the owner, enough to key and name sub-records.
    pub owner: Record,
    pub related: BTreeMap<String, Vec<Record>>,
}

/// Cleared fields to verify once the owner's placeholder resolves.
#[derive(Debug, Clone)]
pub struct DeferredClearCheck {
    pub owner_placeholder: String,
    pub fields: Vec<&'static FieldDescriptor>,
}

/// Everything one worker accumulates. Only its own worker touches it until
/// the phase that drains it.
pub struct WorkerSlot<'c> {
    pub primary: PendingBatch<'c>,
    pub related: PendingBatch<'c>,
    pub relations: Vec<DeferredRelation>,
    pub clear_checks: Vec<DeferredClearCheck>,
}

impl<'c> WorkerSlot<'c> {
    /// Create an empty slot for one pool thread.
    ///
    /// # Arguments
    /// * `client` - Store shared by both batches
    /// * `batch_size` - Capacity of the primary and related batches
    /// * `mode` - Upsert semantic for the primary batch only
    pub fn new(client: &'c dyn UpsertClient, batch_size: usize, mode: UpsertMode) -> Self {
        Self {
            primary: PendingBatch::new(client, batch_size, mode),
            // Sub-records are always new or keyed under a resolved owner.
            related: PendingBatch::new(client, batch_size, UpsertMode::Upsert),
            relations: Vec::new(),
            clear_checks: Vec::new(),
        }
    }

    /// Queues a parsed row, keeping its deferred work keyed by placeholder.
    pub fn hold(&mut self, parsed: RowDeserialization) {
        let placeholder = parsed.primary.id.clone();
        if !parsed.related.is_empty() {
            self.relations.push(DeferredRelation {
                owner_placeholder: placeholder.clone(),
                owner: parsed.primary.trim_to_reference(),
                related: parsed.related,
            });
        }
        if !parsed.clear_checks.is_empty() {
            self.clear_checks.push(DeferredClearCheck {
                owner_placeholder: placeholder,
                fields: parsed.clear_checks,
            });
        }
        self.primary.add(parsed.primary);
    }
}
