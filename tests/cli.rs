mod common;

use bulk_loader::store::MemoryStore;
use common::write_csv;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_KEYS: &[&str] = &[
    "UPLOADED_FILE",
    "OUTPUT_FILE",
    "BATCH_SIZE",
    "DELIMITER",
    "ATTR_TO_OVERWRITE",
    "UPSERT_SEMANTIC",
    "EXPORT_SCOPE",
    "QN_PREFIX",
    "WORKERS",
];

fn bulk_loader(store: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bulk_loader"));
    for key in ENV_KEYS {
        command.env_remove(key);
    }
    command
        .arg("--store")
        .arg(store)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn missing_type_column_exits_with_structural_code() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let input = write_csv(
        dir.path(),
        "bad.csv",
        &[vec!["naturalKey", "name"], vec!["default/db/t1", "t1"]],
    );

    let output = bulk_loader(&store, &["import", "--input", input.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!store.exists());
}

#[test]
fn missing_input_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");

    let output = bulk_loader(&store, &["import"]);

    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn import_then_export_through_the_binary() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    let input = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "name", "description", "readme"],
            vec!["default/db/orders", "Table", "orders", "Orders", "<p>o</p>"],
            vec!["default/db/bare", "Table", "bare", "", ""],
        ],
    );

    let import = bulk_loader(
        &store,
        &[
            "import",
            "--input",
            input.to_str().unwrap(),
            "--mode",
            "upsert",
            "--batch-size",
            "1",
            "--workers",
            "2",
        ],
    );
    assert!(import.status.success(), "{}", String::from_utf8_lossy(&import.stderr));

    let saved = MemoryStore::load(&store).unwrap();
    assert!(saved.get("Table", "default/db/orders").is_some());
    assert_eq!(saved.len(), 3);

    let output = dir.path().join("export.csv");
    let export = bulk_loader(
        &store,
        &[
            "export",
            "--output",
            output.to_str().unwrap(),
            "--scope",
            "ENRICHED_ONLY",
        ],
    );
    assert!(export.status.success(), "{}", String::from_utf8_lossy(&export.stderr));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "default/db/orders");
    let readme = header.iter().position(|h| h == "readme").unwrap();
    assert_eq!(&rows[0][readme], "<p>o</p>");
}
