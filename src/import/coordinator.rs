//! Load coordination for bulk record imports.
//!
//! The BulkLoader runs a load as a fixed sequence of phases, each one a
//! barrier over the same worker pool:
//! 1. Ingest rows into per-worker primary batches
//! 2. Flush primary batches and publish resolved ids
//! 3. Relate deferred sub-records to their now-real owners
//! 4. Flush related batches
//! 5. Soft-delete sub-documents orphaned by cleared fields

use crate::cache::Lookups;
use crate::config::ImportConfig;
use crate::error::LoaderResult;
use crate::import::context::RunContext;
use crate::import::data_structures::WorkerSlot;
use crate::import::reader::CsvSource;
use crate::import::stats::LoadStats;
use crate::mapper::{RowDeserializer, build_related};
use crate::model::FieldState;
use crate::progress::log_progress;
use crate::schema::FieldDescriptor;
use crate::store::{AssetStore, StoreError, UpsertClient, UpsertMode};
use parking_lot::Mutex;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Phases of a load, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Ingest,
    PrimaryFlush,
    Relate,
    RelatedFlush,
    CleanupScan,
    Done,
}

impl LoadPhase {
    pub fn next(self) -> Self {
        match self {
            LoadPhase::Ingest => LoadPhase::PrimaryFlush,
            LoadPhase::PrimaryFlush => LoadPhase::Relate,
            LoadPhase::Relate => LoadPhase::RelatedFlush,
            LoadPhase::RelatedFlush => LoadPhase::CleanupScan,
            LoadPhase::CleanupScan | LoadPhase::Done => LoadPhase::Done,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LoadPhase::Ingest => "ingest",
            LoadPhase::PrimaryFlush => "primary flush",
            LoadPhase::Relate => "relate",
            LoadPhase::RelatedFlush => "related flush",
            LoadPhase::CleanupScan => "cleanup scan",
            LoadPhase::Done => "done",
        }
    }
}

/// Tunables for a single load.
///
/// Defaults match an unconfigured run: batches of 50, one worker per CPU,
/// update-only upserts and no clear-if-blank fields.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Records per upsert call, for primary and related batches alike
    pub batch_size: usize,
    /// Threads in the load's rayon pool
    pub workers: usize,
    /// Upsert semantic for primary records
    pub mode: UpsertMode,
    /// Fields whose empty cells clear the stored value.
    pub clear_fields: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            workers: num_cpus::get(),
            mode: UpsertMode::default(),
            clear_fields: Vec::new(),
        }
    }
}

impl From<&ImportConfig> for LoadOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            workers: config.workers,
            mode: config.mode,
            clear_fields: config.clear_fields.clone(),
        }
    }
}

type Slots<'c> = [Mutex<WorkerSlot<'c>>];

/// Coordinates a load from one delimited file into the store.
///
/// A loader holds no per-run state of its own; everything a run accumulates
/// lives in the [`RunContext`] and the worker slots built by [`BulkLoader::run`].
pub struct BulkLoader<'a> {
    client: &'a dyn UpsertClient,
    store: &'a dyn AssetStore,
    lookups: &'a Lookups,
    options: LoadOptions,
}

impl<'a> BulkLoader<'a> {
    /// Create a new BulkLoader over the given collaborators.
    ///
    /// # Arguments
    /// * `client` - Receives every primary and related batch
    /// * `store` - Fetches owners and soft-deletes orphans during cleanup
    /// * `lookups` - Reference caches consulted while decoding cells
    /// * `options` - Batch size, worker count, upsert semantic, clear-if-blank fields
    pub fn new(
        client: &'a dyn UpsertClient,
        store: &'a dyn AssetStore,
        lookups: &'a Lookups,
        options: LoadOptions,
    ) -> Self {
        Self {
            client,
            store,
            lookups,
            options,
        }
    }

    /// Runs every phase to completion.
    ///
    /// Only malformed input or a failure to start the pool aborts the load;
    /// bad rows, bad cells, refused batches and unresolved owners are counted
    /// instead.
    ///
    /// # Arguments
    /// * `source` - Input file with a validated header
    /// * `ctx` - Per-run context; resolved ids and seen keys accumulate here
    ///
    /// # Returns
    /// Counts for every phase, including per-worker batch statistics
    pub fn run(&self, source: &CsvSource, ctx: &RunContext) -> LoaderResult<LoadStats> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .thread_name(|i| format!("loader-{i}"))
            .build()?;
        let slots: Vec<Mutex<WorkerSlot>> = (0..pool.current_num_threads())
            .map(|_| {
                Mutex::new(WorkerSlot::new(
                    self.client,
                    self.options.batch_size,
                    self.options.mode,
                ))
            })
            .collect();
        let deserializer =
            RowDeserializer::new(source.header().clone(), self.options.clear_fields.clone());

        log::info!(
            "loading {} rows from {} with {} workers",
            source.total_rows(),
            source.path().display(),
            slots.len()
        );

        let mut stats = LoadStats::default();
        let mut phase = LoadPhase::Ingest;
        while phase != LoadPhase::Done {
            log::info!("phase: {}", phase.name());
            match phase {
                LoadPhase::Ingest => {
                    self.ingest(&pool, &slots, source, &deserializer, ctx, &mut stats)?
                }
                LoadPhase::PrimaryFlush => self.flush_primary(&pool, &slots, ctx, &mut stats),
                LoadPhase::Relate => self.relate(&pool, &slots, ctx, &mut stats),
                LoadPhase::RelatedFlush => self.flush_related(&pool, &slots, &mut stats),
                LoadPhase::CleanupScan => self.cleanup(&pool, &slots, ctx, &mut stats),
                LoadPhase::Done => {}
            }
            phase = phase.next();
        }
        Ok(stats)
    }

    /// Phase 1: parse rows in parallel into each worker's primary batch.
    fn ingest(
        &self,
        pool: &ThreadPool,
        slots: &Slots,
        source: &CsvSource,
        deserializer: &RowDeserializer,
        ctx: &RunContext,
        stats: &mut LoadStats,
    ) -> LoaderResult<()> {
        let total = source.total_rows();
        let read = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let fields_skipped = AtomicUsize::new(0);
        let rows = source.rows()?;

        pool.install(|| {
            rows.par_bridge().try_for_each(|row| -> LoaderResult<()> {
                let cells = row?;
                let processed = log_progress(&read, total, self.options.batch_size);
                match deserializer.parse_row(&cells, self.lookups) {
                    Ok(mut parsed) => {
                        let field_errors = std::mem::take(&mut parsed.field_errors);
                        fields_skipped.fetch_add(field_errors.len(), Ordering::Relaxed);
                        let primary = &parsed.primary;
                        if ctx.register_key(&primary.type_tag, &primary.natural_key) == 2 {
                            log::warn!(
                                "{} {} appears on more than one row",
                                primary.type_tag,
                                primary.natural_key
                            );
                        }
                        slots[worker_index(slots)].lock().hold(parsed);
                    }
                    Err(e) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        log::warn!("skipping row {} of {}: {}", processed, total, e);
                    }
                }
                Ok(())
            })
        })?;

        stats.rows_read = read.into_inner();
        stats.rows_skipped = skipped.into_inner();
        stats.fields_skipped = fields_skipped.into_inner();
        stats.duplicate_keys = ctx.duplicate_keys();
        Ok(())
    }

    /// Phase 2: flush primary batches and publish the ids they resolved.
    fn flush_primary(
        &self,
        pool: &ThreadPool,
        slots: &Slots,
        ctx: &RunContext,
        stats: &mut LoadStats,
    ) {
        pool.install(|| {
            slots.par_iter().for_each(|slot| {
                let mut slot = slot.lock();
                slot.primary.flush();
                ctx.publish(slot.primary.resolved());
            })
        });

        for slot in slots {
            let slot = slot.lock();
            let batch = slot.primary.stats();
            stats.primary.merge(batch);
            stats.primary_batches.push(batch);
            stats.failures.extend(slot.primary.failures().iter().cloned());
        }
        log::info!(
            "primary records: {} submitted, {} resolved",
            stats.primary.submitted,
            ctx.resolved_count()
        );
    }

    /// Phase 3: build deferred sub-records against their owners' real ids.
    fn relate(&self, pool: &ThreadPool, slots: &Slots, ctx: &RunContext, stats: &mut LoadStats) {
        let total: usize = slots.iter().map(|slot| slot.lock().relations.len()).sum();
        let processed = AtomicUsize::new(0);
        let dropped = AtomicUsize::new(0);

        pool.install(|| {
            slots.par_iter().for_each(|slot| {
                let mut slot = slot.lock();
                for deferred in std::mem::take(&mut slot.relations) {
                    log_progress(&processed, total, self.options.batch_size);
                    let Some(real_id) = ctx.resolve(&deferred.owner_placeholder) else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        log::warn!(
                            "{} {} was not saved, dropping its {} deferred fields",
                            deferred.owner.type_tag,
                            deferred.owner.natural_key,
                            deferred.related.len()
                        );
                        continue;
                    };
                    let mut owner = deferred.owner;
                    owner.id = real_id;
                    for (field, partials) in &deferred.related {
                        for partial in partials {
                            let record = build_related(&owner, partial);
                            log::trace!(
                                "relating {} {} to {} through {}",
                                record.type_tag,
                                record.natural_key,
                                owner.id,
                                field
                            );
                            slot.related.add(record);
                        }
                    }
                }
            })
        });

        stats.relations_dropped = dropped.into_inner();
    }

    /// Phase 4: flush related batches.
    fn flush_related(&self, pool: &ThreadPool, slots: &Slots, stats: &mut LoadStats) {
        pool.install(|| {
            slots
                .par_iter()
                .for_each(|slot| slot.lock().related.flush())
        });

        for slot in slots {
            let slot = slot.lock();
            let batch = slot.related.stats();
            stats.related.merge(batch);
            stats.related_batches.push(batch);
            stats.failures.extend(slot.related.failures().iter().cloned());
        }
    }

    /// Phase 5: soft-delete sub-documents left behind by cleared embedded fields.
    fn cleanup(&self, pool: &ThreadPool, slots: &Slots, ctx: &RunContext, stats: &mut LoadStats) {
        let checks: Vec<(String, Vec<&'static FieldDescriptor>)> = slots
            .iter()
            .flat_map(|slot| std::mem::take(&mut slot.lock().clear_checks))
            .filter_map(|check| match ctx.resolve(&check.owner_placeholder) {
                Some(id) => Some((id, check.fields)),
                None => {
                    log::debug!(
                        "skipping clear check for unsaved record {}",
                        check.owner_placeholder
                    );
                    None
                }
            })
            .collect();

        let total = checks.len();
        let processed = AtomicUsize::new(0);
        let scanned = AtomicUsize::new(0);
        let deleted = AtomicUsize::new(0);
        pool.install(|| {
            checks.par_iter().for_each(|(id, fields)| {
                log_progress(&processed, total, self.options.batch_size);
                let embedded: Vec<&str> = fields
                    .iter()
                    .filter(|field| field.embed_kind().is_some())
                    .map(|field| field.name)
                    .collect();
                if embedded.is_empty() {
                    return;
                }
                scanned.fetch_add(1, Ordering::Relaxed);
                match self.delete_orphans(id, &embedded) {
                    Ok(count) => {
                        deleted.fetch_add(count, Ordering::Relaxed);
                    }
                    Err(e) => log::warn!("unable to clean up cleared fields on {}: {}", id, e),
                }
            })
        });

        stats.owners_scanned = scanned.into_inner();
        stats.deleted = deleted.into_inner();
    }

    /// Soft-deletes sub-documents still attached through the named embedded fields.
    fn delete_orphans(&self, id: &str, embedded: &[&str]) -> Result<usize, StoreError> {
        let Some(current) = self.store.fetch(id, embedded)? else {
            return Ok(0);
        };

        let orphans: Vec<String> = embedded
            .iter()
            .filter_map(|name| current.relations.get(*name))
            .filter_map(FieldState::value)
            .flat_map(|value| value.refs())
            .filter_map(|target| target.id.clone())
            .collect();
        if orphans.is_empty() {
            return Ok(0);
        }

        let removed = self.store.soft_delete(&orphans)?;
        log::debug!("removed {} orphaned sub-documents from {}", removed.len(), id);
        Ok(removed.len())
    }
}

/// Slot owned by the calling pool thread.
fn worker_index(slots: &Slots) -> usize {
    rayon::current_thread_index().unwrap_or(0) % slots.len().max(1)
}
