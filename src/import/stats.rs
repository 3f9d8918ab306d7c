//! Load statistics tracking.
//!
//! Tracks what the store did with every batch a load submitted.

use crate::store::BatchFailure;

/// Counts for one pending batch across all of its flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Records handed to the store
    pub submitted: usize,
    /// Upsert calls made
    pub flushes: usize,
    /// Records the store created
    pub created: usize,
    /// Records the store changed
    pub updated: usize,
    /// Records the store refused or never received
    pub failed: usize,
}

impl BatchStats {
    /// Merge another BatchStats into this one by summing all counts.
    pub fn merge(&mut self, other: BatchStats) {
        self.submitted += other.submitted;
        self.flushes += other.flushes;
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// Statistics for a whole load.
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub rows_read: usize,
    /// Rows that could not be parsed into a record
    pub rows_skipped: usize,
    /// Cells that failed to decode; the row was kept without that field
    pub fields_skipped: usize,
    /// Natural keys seen on more than one row
    pub duplicate_keys: usize,
    pub primary: BatchStats,
    pub related: BatchStats,
    /// Per-worker primary batch counts, in worker order
    pub primary_batches: Vec<BatchStats>,
    /// Per-worker related batch counts, in worker order
    pub related_batches: Vec<BatchStats>,
    /// Deferred relations whose owner never resolved
    pub relations_dropped: usize,
    /// Owners fetched to look for sub-documents under cleared embedded fields
    pub owners_scanned: usize,
    /// Orphaned sub-documents soft-deleted
    pub deleted: usize,
    pub failures: Vec<BatchFailure>,
}

impl LoadStats {
    /// Logs the final per-batch and overall counts.
    pub fn log_summary(&self) {
        for (worker, batch) in self.primary_batches.iter().enumerate() {
            log::debug!(
                "worker {} primary: {} submitted, {} created, {} updated, {} failed",
                worker,
                batch.submitted,
                batch.created,
                batch.updated,
                batch.failed
            );
        }
        for (worker, batch) in self.related_batches.iter().enumerate() {
            log::debug!(
                "worker {} related: {} submitted, {} created, {} updated, {} failed",
                worker,
                batch.submitted,
                batch.created,
                batch.updated,
                batch.failed
            );
        }
        log::info!(
            "rows: {} read, {} skipped, {} fields skipped, {} duplicate keys",
            self.rows_read,
            self.rows_skipped,
            self.fields_skipped,
            self.duplicate_keys
        );
        log::info!(
            "primary records: {} created, {} updated, {} failed",
            self.primary.created,
            self.primary.updated,
            self.primary.failed
        );
        log::info!(
            "related records: {} created, {} updated, {} failed, {} dropped",
            self.related.created,
            self.related.updated,
            self.related.failed,
            self.relations_dropped
        );
        log::info!(
            "cleanup: {} owners scanned, {} sub-documents deleted",
            self.owners_scanned,
            self.deleted
        );
        for failure in &self.failures {
            let keys: Vec<&str> = failure
                .records
                .iter()
                .map(|record| record.natural_key.as_str())
                .collect();
            log::warn!("failed ({}): {}", failure.reason, keys.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_counts() {
        let mut total = BatchStats {
            submitted: 3,
            flushes: 1,
            created: 2,
            updated: 1,
            failed: 0,
        };
        total.merge(BatchStats {
            submitted: 4,
            flushes: 2,
            created: 1,
            updated: 0,
            failed: 3,
        });

        assert_eq!(
            total,
            BatchStats {
                submitted: 7,
                flushes: 3,
                created: 3,
                updated: 1,
                failed: 3,
            }
        );
    }
}
