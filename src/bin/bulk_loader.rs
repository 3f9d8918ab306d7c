use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use bulk_loader::cache::Lookups;
use bulk_loader::config::{ExportConfig, ImportConfig};
use bulk_loader::export::{Exporter, SharedWriter};
use bulk_loader::import::{BulkLoader, CsvSource, LoadOptions, RunContext};
use bulk_loader::store::{Filter, MemoryStore};
use bulk_loader::{LoaderError, LoaderResult, init_logger};

#[derive(Parser, Debug)]
#[command(
    name = "bulk_loader",
    about = "Load records from, or export records to, a delimited file"
)]
struct Cli {
    /// JSON snapshot file holding the store's records.
    #[arg(long, global = true, default_value = "store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert every row of a delimited file into the store.
    Import {
        /// Input file (falls back to UPLOADED_FILE).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Records per store request (falls back to BATCH_SIZE).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Single-character column separator (falls back to DELIMITER).
        #[arg(long)]
        delimiter: Option<String>,

        /// Field to clear when its cell is empty; repeatable (falls back to ATTR_TO_OVERWRITE).
        #[arg(long = "clear")]
        clear: Vec<String>,

        /// `upsert` or `update` (falls back to UPSERT_SEMANTIC).
        #[arg(long)]
        mode: Option<String>,

        /// Worker threads (falls back to WORKERS).
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Write matching store records to a delimited file.
    Export {
        /// Output file (falls back to OUTPUT_FILE).
        #[arg(long)]
        output: Option<PathBuf>,

        /// `ENRICHED_ONLY` or `ALL` (falls back to EXPORT_SCOPE).
        #[arg(long)]
        scope: Option<String>,

        /// Natural-key prefix to export (falls back to QN_PREFIX).
        #[arg(long)]
        prefix: Option<String>,

        /// Single-character column separator (falls back to DELIMITER).
        #[arg(long)]
        delimiter: Option<String>,

        /// Worker threads (falls back to WORKERS).
        #[arg(long)]
        workers: Option<usize>,
    },
}

/// Command-line values layered over the environment.
struct Overrides(HashMap<&'static str, String>);

impl Overrides {
    fn new() -> Self {
        Self(HashMap::new())
    }

    fn set(&mut self, key: &'static str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.0.insert(key, value.to_string());
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }
}

fn open_store(path: &Path) -> LoaderResult<MemoryStore> {
    if path.exists() {
        Ok(MemoryStore::load(path)?)
    } else {
        log::info!("{} does not exist, starting from an empty store", path.display());
        Ok(MemoryStore::new())
    }
}

fn run_import(store_path: &Path, config: ImportConfig) -> LoaderResult<()> {
    let input = config.input_path()?.to_path_buf();
    let store = Arc::new(open_store(store_path)?);
    let lookups = Lookups::new(store.clone());
    let source = CsvSource::open(&input, config.delimiter)?;

    let loader = BulkLoader::new(
        store.as_ref(),
        store.as_ref(),
        &lookups,
        LoadOptions::from(&config),
    );
    let stats = loader.run(&source, &RunContext::new())?;
    stats.log_summary();

    store.save(store_path)?;
    Ok(())
}

fn run_export(store_path: &Path, config: ExportConfig) -> LoaderResult<()> {
    let output = config.output_path()?.to_path_buf();
    let store = open_store(store_path)?;
    let exporter = Exporter::with_default_columns(&store, &config)?;
    let writer = SharedWriter::create(&output, config.delimiter)?;

    let stats = exporter.export(&Filter::new(&config.key_prefix, config.scope), &writer)?;
    log::info!(
        "wrote {} rows to {} ({} expected)",
        stats.written,
        output.display(),
        stats.expected
    );
    Ok(())
}

fn run(cli: Cli) -> LoaderResult<()> {
    let mut overrides = Overrides::new();
    match cli.command {
        Command::Import {
            input,
            batch_size,
            delimiter,
            clear,
            mode,
            workers,
        } => {
            overrides.set("UPLOADED_FILE", input.map(|p| p.display().to_string()));
            overrides.set("BATCH_SIZE", batch_size);
            overrides.set("DELIMITER", delimiter);
            if !clear.is_empty() {
                let fields = serde_json::to_string(&clear).unwrap_or_default();
                overrides.set("ATTR_TO_OVERWRITE", Some(fields));
            }
            overrides.set("UPSERT_SEMANTIC", mode);
            overrides.set("WORKERS", workers);

            let config = ImportConfig::from_source(&|key| overrides.get(key))?;
            run_import(&cli.store, config)
        }
        Command::Export {
            output,
            scope,
            prefix,
            delimiter,
            workers,
        } => {
            overrides.set("OUTPUT_FILE", output.map(|p| p.display().to_string()));
            overrides.set("EXPORT_SCOPE", scope);
            overrides.set("QN_PREFIX", prefix);
            overrides.set("DELIMITER", delimiter);
            overrides.set("WORKERS", workers);

            let config = ExportConfig::from_source(&|key| overrides.get(key))?;
            run_export(&cli.store, config)
        }
    }
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();
    let started = Instant::now();

    let result: Result<(), LoaderError> = run(cli);
    log::info!("total time taken: {:.2?}", started.elapsed());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
