mod common;

use bulk_loader::model::{FieldState, Value, is_placeholder};
use bulk_loader::store::UpsertMode;
use bulk_loader::{LoaderError, Record};
use bulk_loader::import::CsvSource;
use common::{load, options, seeded_store, write_csv};
use tempfile::TempDir;

const LINKS: &str = "{\"link\":\"https://wiki.example/orders\",\"name\":\"Wiki\"}\n{\"link\":\"https://runbook.example/orders\",\"name\":\"Runbook\"}";

#[test]
fn worked_example_sets_description_and_clears_owners() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let mut existing = Record::new("GlossaryTerm", "t1@g1");
    existing.set_attribute("description", Value::Str("old".into()));
    existing.set_attribute("owners", Value::List(vec![Value::Str("alice".into())]));
    store.insert(existing);

    let path = write_csv(
        dir.path(),
        "terms.csv",
        &[
            vec!["naturalKey", "typeTag", "description", "owners"],
            vec!["t1@g1", "GlossaryTerm", "desc text", ""],
        ],
    );
    let stats = load(&store, &path, options(UpsertMode::UpdateOnly, &["owners"]));

    let stored = store.get("GlossaryTerm", "t1@g1").unwrap();
    assert_eq!(
        stored.attributes.get("description"),
        Some(&FieldState::Set(Value::Str("desc text".into())))
    );
    assert!(!stored.attributes.contains_key("owners"));
    assert_eq!(stats.primary.updated, 1);
    assert_eq!(stats.primary.failed, 0);
}

#[test]
fn every_row_is_submitted_exactly_once() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let keys: Vec<String> = (0..203).map(|i| format!("default/db/table_{i:03}")).collect();
    let mut rows = vec![vec!["naturalKey", "typeTag", "name"]];
    rows.extend(keys.iter().map(|key| vec![key.as_str(), "Table", "t"]));
    let path = write_csv(dir.path(), "tables.csv", &rows);

    let mut opts = options(UpsertMode::Upsert, &[]);
    opts.batch_size = 7;
    let stats = load(&store, &path, opts);

    assert_eq!(stats.rows_read, 203);
    assert_eq!(stats.primary.submitted, 203);
    assert_eq!(stats.primary.created, 203);
    assert_eq!(store.submitted(), 203);
    for key in &keys {
        assert!(store.get("Table", key).is_some(), "{key} missing");
    }
}

#[test]
fn rows_sharing_a_key_are_each_submitted() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "dupes.csv",
        &[
            vec!["naturalKey", "typeTag", "description"],
            vec!["default/db/t1", "Table", "one"],
            vec!["default/db/t1", "Table", "one"],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.primary.submitted, 2);
    assert_eq!(stats.duplicate_keys, 1);
    assert!(store.get("Table", "default/db/t1").is_some());
}

#[test]
fn reimport_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec![
                "naturalKey",
                "typeTag",
                "name",
                "owners",
                "certificateStatus",
                "assignedTerms",
                "tags",
                "readme",
                "links",
                "Quality::score",
            ],
            vec![
                "default/db/orders",
                "Table",
                "orders",
                "alice\nbob",
                "VERIFIED",
                "Revenue@@@Business",
                "PII>>FULL",
                "<p>Orders</p>",
                LINKS,
                "9",
            ],
            vec![
                "default/db/customers",
                "Table",
                "customers",
                "",
                "DRAFT",
                "",
                "",
                "<p>Customers</p>",
                "",
                "",
            ],
        ],
    );
    let clear = ["owners", "readme", "links"];

    let first = load(&store, &path, options(UpsertMode::Upsert, &clear));
    assert_eq!(first.primary.created, 2);
    assert_eq!(first.related.created, 4);
    let records_after_first = store.len();

    let second = load(&store, &path, options(UpsertMode::Upsert, &clear));
    assert_eq!(second.primary.created, 0);
    assert_eq!(second.primary.updated, 0);
    assert_eq!(second.related.created, 0);
    assert_eq!(second.related.updated, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(store.len(), records_after_first);
}

#[test]
fn related_records_point_only_at_resolved_owners() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    store.reject_key("default/db/refused");
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "name", "readme"],
            vec!["default/db/orders", "Table", "orders", "<p>Orders</p>"],
            vec!["default/db/refused", "Table", "refused", "<p>Refused</p>"],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.primary.failed, 1);
    assert_eq!(stats.relations_dropped, 1);
    assert_eq!(stats.related.created, 1);
    assert_eq!(stats.failures.len(), 1);

    let readmes: Vec<Record> = store
        .live_records()
        .into_iter()
        .filter(|record| record.type_tag == "Readme")
        .collect();
    assert_eq!(readmes.len(), 1);
    let owner = store.get("Table", "default/db/orders").unwrap();
    let asset = readmes[0]
        .relations
        .get("asset")
        .and_then(FieldState::value)
        .unwrap();
    let owner_id = asset.refs()[0].id.clone().unwrap();
    assert!(!is_placeholder(&owner_id));
    assert_eq!(owner_id, owner.id);
    assert_eq!(readmes[0].natural_key, format!("{}/readme", owner.id));
    assert_eq!(readmes[0].name(), Some("orders Readme"));
}

#[test]
fn cleared_readme_is_soft_deleted_once() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let with_readme = write_csv(
        dir.path(),
        "with.csv",
        &[
            vec!["naturalKey", "typeTag", "readme", "links"],
            vec!["default/db/orders", "Table", "<p>Orders</p>", LINKS],
        ],
    );
    let without_readme = write_csv(
        dir.path(),
        "without.csv",
        &[
            vec!["naturalKey", "typeTag", "readme", "links"],
            vec!["default/db/orders", "Table", "", ""],
        ],
    );
    let clear = ["readme", "links"];
    load(&store, &with_readme, options(UpsertMode::Upsert, &clear));

    let cleared = load(&store, &without_readme, options(UpsertMode::Upsert, &clear));
    assert_eq!(cleared.owners_scanned, 1);
    assert_eq!(cleared.deleted, 3);
    let view = store.view("Table", "default/db/orders").unwrap();
    assert!(!view.relations.contains_key("readme"));
    assert!(!view.relations.contains_key("links"));

    let again = load(&store, &without_readme, options(UpsertMode::Upsert, &clear));
    assert_eq!(again.deleted, 0);
}

#[test]
fn missing_column_leaves_readme_alone() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let with_readme = write_csv(
        dir.path(),
        "with.csv",
        &[
            vec!["naturalKey", "typeTag", "readme"],
            vec!["default/db/orders", "Table", "<p>Orders</p>"],
        ],
    );
    let no_column = write_csv(
        dir.path(),
        "names.csv",
        &[
            vec!["naturalKey", "typeTag", "name"],
            vec!["default/db/orders", "Table", "orders"],
        ],
    );
    load(&store, &with_readme, options(UpsertMode::Upsert, &["readme"]));

    let stats = load(&store, &no_column, options(UpsertMode::Upsert, &["readme"]));

    assert_eq!(stats.owners_scanned, 0);
    let view = store.view("Table", "default/db/orders").unwrap();
    assert!(view.relations.contains_key("readme"));
}

#[test]
fn replaced_readme_keeps_single_document() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let first = write_csv(
        dir.path(),
        "first.csv",
        &[
            vec!["naturalKey", "typeTag", "readme"],
            vec!["default/db/orders", "Table", "<p>v1</p>"],
        ],
    );
    let second = write_csv(
        dir.path(),
        "second.csv",
        &[
            vec!["naturalKey", "typeTag", "readme"],
            vec!["default/db/orders", "Table", "<p>v2</p>"],
        ],
    );
    load(&store, &first, options(UpsertMode::Upsert, &["readme"]));

    let stats = load(&store, &second, options(UpsertMode::Upsert, &["readme"]));

    assert_eq!(stats.related.updated, 1);
    assert_eq!(stats.deleted, 0);
    let view = store.view("Table", "default/db/orders").unwrap();
    assert_eq!(
        view.relations.get("readme"),
        Some(&FieldState::Set(Value::Embedded(
            bulk_loader::model::EmbeddedDoc::Readme {
                description: "<p>v2</p>".into()
            }
        )))
    );
}

#[test]
fn terms_and_tags_are_stored_on_the_record() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "assignedTerms", "tags"],
            vec![
                "default/db/orders",
                "Table",
                "Revenue@@@Business\nMissing@@@Business",
                "PII>>FULL\nRaw",
            ],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    let stored = store.get("Table", "default/db/orders").unwrap();
    // One unresolvable term skips the whole field.
    assert_eq!(stats.fields_skipped, 1);
    assert!(!stored.relations.contains_key("assignedTerms"));
    let tags = stored.tags.unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[1].tag_name, "Raw");
}

#[test]
fn see_also_is_related_after_both_terms_exist() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "terms.csv",
        &[
            vec!["naturalKey", "typeTag", "name", "seeAlso"],
            vec!["t1@g1", "GlossaryTerm", "t1", "GlossaryTerm@t2@g1"],
            vec!["t2@g1", "GlossaryTerm", "t2", ""],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.primary.created, 2);
    assert_eq!(stats.related.updated, 1);
    let t1 = store.get("GlossaryTerm", "t1@g1").unwrap();
    let see_also = t1.relations.get("seeAlso").and_then(FieldState::value).unwrap();
    assert_eq!(see_also.refs()[0].natural_key, "t2@g1");
}

#[test]
fn unparseable_rows_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "name"],
            vec!["default/db/t1", "", "no type"],
            vec!["default/db/t2", "Table", "t2"],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.rows_skipped, 1);
    assert_eq!(stats.primary.created, 1);
}

#[test]
fn update_only_refuses_unknown_records() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "name", "readme"],
            vec!["default/db/new", "Table", "new", "<p>new</p>"],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::UpdateOnly, &[]));

    assert_eq!(stats.primary.failed, 1);
    assert_eq!(stats.relations_dropped, 1);
    assert!(store.get("Table", "default/db/new").is_none());
    assert_eq!(stats.failures[0].reason, "no existing record to update");
}

#[test]
fn store_outage_fails_batches_without_aborting() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    store.set_unavailable(true);
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "name", "readme"],
            vec!["default/db/t1", "Table", "t1", "<p>t1</p>"],
            vec!["default/db/t2", "Table", "t2", ""],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.primary.failed, 2);
    assert_eq!(stats.relations_dropped, 1);
    assert_eq!(stats.related.submitted, 0);
}

#[test]
fn missing_sentinel_column_fails_before_store_io() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "bad.csv",
        &[vec!["naturalKey", "name"], vec!["default/db/t1", "t1"]],
    );

    let err = CsvSource::open(&path, b',').unwrap_err();

    assert!(matches!(err, LoaderError::Structural(_)));
    assert_eq!(store.upsert_calls(), 0);
}

#[test]
fn undecodable_cells_are_counted_and_the_row_kept() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec![
                "naturalKey",
                "typeTag",
                "name",
                "certificateStatus",
                "assignedTerms",
                "sourceProperties",
            ],
            vec![
                "default/db/orders",
                "Table",
                "orders",
                "SHINY",
                "Nope@@@Business",
                "a=b",
            ],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.rows_read, 1);
    assert_eq!(stats.rows_skipped, 0);
    assert_eq!(stats.fields_skipped, 3);
    assert_eq!(stats.primary.created, 1);
    let stored = store.get("Table", "default/db/orders").unwrap();
    assert_eq!(stored.name(), Some("orders"));
    assert!(!stored.attributes.contains_key("certificateStatus"));
    assert!(!stored.relations.contains_key("assignedTerms"));
    assert!(!stored.attributes.contains_key("sourceProperties"));
}

#[test]
fn clearing_plain_fields_fetches_no_owner() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let path = write_csv(
        dir.path(),
        "tables.csv",
        &[
            vec!["naturalKey", "typeTag", "owners", "readme"],
            vec!["default/db/orders", "Table", "", "<p>Orders</p>"],
            vec!["default/db/customers", "Table", "", ""],
        ],
    );

    let stats = load(&store, &path, options(UpsertMode::Upsert, &["owners", "readme"]));

    // Only customers cleared an embedded field.
    assert_eq!(stats.owners_scanned, 1);
    assert_eq!(stats.deleted, 0);
}

#[test]
fn shared_term_is_looked_up_once_per_load() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let keys: Vec<String> = (0..64).map(|i| format!("default/db/table_{i:02}")).collect();
    let mut rows = vec![vec!["naturalKey", "typeTag", "assignedTerms"]];
    rows.extend(
        keys.iter()
            .map(|key| vec![key.as_str(), "Table", "Revenue@@@Business"]),
    );
    let path = write_csv(dir.path(), "tables.csv", &rows);

    let stats = load(&store, &path, options(UpsertMode::Upsert, &[]));

    assert_eq!(stats.primary.created, 64);
    assert_eq!(stats.fields_skipped, 0);
    // One glossary lookup and one term lookup, however many rows share them.
    assert_eq!(store.lookups(), 2);
    for key in &keys {
        let stored = store.get("Table", key).unwrap();
        assert!(stored.relations.contains_key("assignedTerms"));
    }
}
