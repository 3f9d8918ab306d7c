#![allow(dead_code)]

use bulk_loader::cache::Lookups;
use bulk_loader::import::{BulkLoader, CsvSource, LoadOptions, LoadStats, RunContext};
use bulk_loader::model::{Record, RecordRef, Value};
use bulk_loader::store::{MemoryStore, UpsertMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn write_csv(dir: &Path, name: &str, rows: &[Vec<&str>]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Store holding the `Business` glossary and its `Revenue` term.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let mut glossary = Record::new("Glossary", "glossary-business");
    glossary.set_attribute("name", Value::Str("Business".into()));
    store.insert(glossary);

    let mut term = Record::new("GlossaryTerm", "term-revenue");
    term.set_attribute("name", Value::Str("Revenue".into()));
    term.set_relation(
        "anchor",
        Value::Ref(RecordRef::by_key("Glossary", "glossary-business")),
    );
    store.insert(term);
    Arc::new(store)
}

pub fn options(mode: UpsertMode, clear_fields: &[&str]) -> LoadOptions {
    LoadOptions {
        batch_size: 5,
        workers: 4,
        mode,
        clear_fields: clear_fields.iter().map(|f| f.to_string()).collect(),
    }
}

/// Runs one load with fresh caches and a fresh run context.
pub fn load(store: &Arc<MemoryStore>, path: &Path, options: LoadOptions) -> LoadStats {
    let lookups = Lookups::new(store.clone());
    let source = CsvSource::open(path, b',').unwrap();
    let loader = BulkLoader::new(store.as_ref(), store.as_ref(), &lookups, options);
    loader.run(&source, &RunContext::new()).unwrap()
}
