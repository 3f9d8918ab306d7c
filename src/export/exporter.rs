use super::writer::SharedWriter;
use crate::config::ExportConfig;
use crate::error::LoaderResult;
use crate::mapper::{Column, build_row, default_columns, export_header};
use crate::progress::log_progress;
use crate::store::{Filter, QueryService, StoreError};
use dashmap::DashMap;
use rayon::prelude::*;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Records the query service reported up front
    pub expected: usize,
    /// Rows written, duplicates included
    pub written: usize,
    /// Records streamed more than once
    pub duplicates: usize,
}

/// Streams records from the query service into a delimited file.
pub struct Exporter<'a> {
    query: &'a dyn QueryService,
    columns: Vec<Column>,
    page_size: usize,
    workers: usize,
}

impl<'a> Exporter<'a> {
    /// Create a new Exporter.
    ///
    /// # Arguments
    /// * `query` - Source of the count and the record stream
    /// * `columns` - Columns written after `naturalKey` and `typeTag`, in order
    /// * `page_size` - Progress is logged every this many rows
    /// * `workers` - Threads encoding rows in parallel
    pub fn new(
        query: &'a dyn QueryService,
        columns: Vec<Column>,
        page_size: usize,
        workers: usize,
    ) -> Self {
        Self {
            query,
            columns,
            page_size,
            workers,
        }
    }

    /// Exporter over the default columns plus every declared extension attribute.
    pub fn with_default_columns(
        query: &'a dyn QueryService,
        config: &ExportConfig,
    ) -> Result<Self, StoreError> {
        let columns = default_columns(&query.extension_attributes()?);
        Ok(Self::new(query, columns, config.batch_size, config.workers))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Writes the header and one row per streamed record.
    ///
    /// A record streamed twice (page skew in the query service) is written
    /// twice and counted; the export carries on.
    pub fn export<W: Write + Send>(
        &self,
        filter: &Filter,
        writer: &SharedWriter<W>,
    ) -> LoaderResult<ExportStats> {
        let expected = usize::try_from(self.query.count(filter)?).unwrap_or(usize::MAX);
        log::info!("exporting {} records", expected);

        writer.write_row(export_header(&self.columns))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.max(1))
            .thread_name(|i| format!("exporter-{i}"))
            .build()?;
        let seen: DashMap<String, String> = DashMap::new();
        let processed = AtomicUsize::new(0);
        let duplicates = AtomicUsize::new(0);
        let records = self.query.stream(filter)?;

        pool.install(|| {
            records.par_bridge().try_for_each(|record| -> LoaderResult<()> {
                let identity = format!("{}::{}", record.type_tag, record.id);
                if let Some(previous) = seen.insert(record.id.clone(), identity) {
                    duplicates.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "{} {} streamed more than once (page skew?), first as {}",
                        record.type_tag,
                        record.natural_key,
                        previous
                    );
                }
                writer.write_row(build_row(&record, &self.columns))?;
                log_progress(&processed, expected, self.page_size);
                Ok(())
            })
        })?;
        writer.flush()?;

        let stats = ExportStats {
            expected,
            written: processed.into_inner(),
            duplicates: duplicates.into_inner(),
        };
        log::info!(
            "exported {} rows ({} unique)",
            stats.written,
            stats.written - stats.duplicates
        );
        Ok(stats)
    }
}
