use super::{BatchFailure, UpsertClient, UpsertMode};
use crate::import::BatchStats;
use crate::model::Record;
use std::collections::HashMap;

/// Bounded queue of records awaiting submission.
///
/// Adding to a full queue submits it straight away. Every flush accumulates
/// the store's response, so after the final flush the batch knows which
/// records were created, updated or refused and which placeholder ids the
/// store resolved.
pub struct PendingBatch<'c> {
    client: &'c dyn UpsertClient,
    mode: UpsertMode,
    capacity: usize,
    queue: Vec<Record>,
    created: Vec<Record>,
    updated: Vec<Record>,
    failures: Vec<BatchFailure>,
    resolved: HashMap<String, String>,
    submitted: usize,
    flushes: usize,
}

impl<'c> PendingBatch<'c> {
    /// Create an empty batch.
    ///
    /// # Arguments
    /// * `client` - Store that receives each flush
    /// * `capacity` - Records per upsert call; zero is treated as one
    /// * `mode` - Upsert semantic applied to every flush
    pub fn new(client: &'c dyn UpsertClient, capacity: usize, mode: UpsertMode) -> Self {
        Self {
            client,
            mode,
            capacity: capacity.max(1),
            queue: Vec::with_capacity(capacity.max(1)),
            created: Vec::new(),
            updated: Vec::new(),
            failures: Vec::new(),
            resolved: HashMap::new(),
            submitted: 0,
            flushes: 0,
        }
    }

    /// Queue a record. A batch that reaches capacity is flushed immediately.
    pub fn add(&mut self, record: Record) {
        self.queue.push(record);
        if self.queue.len() >= self.capacity {
            self.flush();
        }
    }

    /// Submits whatever is queued. Failures are recorded, never retried.
    ///
    /// A transport error fails every queued record under one
    /// [`BatchFailure`]; refusals reported by the store keep their own
    /// reasons. Resolved placeholder ids from earlier flushes are never
    /// overwritten.
    pub fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let records = std::mem::take(&mut self.queue);
        self.submitted += records.len();
        self.flushes += 1;

        match self.client.upsert(&records, self.mode) {
            Ok(response) => {
                log::trace!(
                    "flushed {} records: {} created, {} updated, {} failure groups",
                    records.len(),
                    response.created.len(),
                    response.updated.len(),
                    response.failures.len()
                );
                for failure in &response.failures {
                    log::warn!(
                        "store refused {} records: {}",
                        failure.records.len(),
                        failure.reason
                    );
                }
                self.created.extend(response.created);
                self.updated.extend(response.updated);
                self.failures.extend(response.failures);
                for (placeholder, real) in response.resolved {
                    self.resolved.entry(placeholder).or_insert(real);
                }
            }
            Err(e) => {
                log::warn!("batch of {} records failed: {}", records.len(), e);
                self.failures.push(BatchFailure {
                    reason: e.to_string(),
                    records,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn created(&self) -> &[Record] {
        &self.created
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn resolved(&self) -> &HashMap<String, String> {
        &self.resolved
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            submitted: self.submitted,
            flushes: self.flushes,
            created: self.created.len(),
            updated: self.updated.len(),
            failed: self.failures.iter().map(|f| f.records.len()).sum(),
        }
    }
}
