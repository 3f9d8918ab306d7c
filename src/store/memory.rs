use super::{
    AssetStore, BatchFailure, Directory, Filter, QueryService, StoreError, UpsertClient,
    UpsertMode, UpsertResponse,
};
use crate::model::{
    EmbeddedDoc, FieldState, RecordRef, RefLabel, Record, TagAssignment, Value, is_placeholder,
};
use crate::schema::{self, EmbedKind, Kind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    record: Record,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    records: Vec<StoredRecord>,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, StoredRecord>,
    keys: HashMap<(String, String), String>,
}

impl Inner {
    fn insert(&mut self, stored: StoredRecord) {
        let key = (
            stored.record.type_tag.clone(),
            stored.record.natural_key.clone(),
        );
        self.keys.insert(key, stored.record.id.clone());
        self.records.insert(stored.record.id.clone(), stored);
    }

    fn live(&self) -> impl Iterator<Item = &Record> {
        self.records
            .values()
            .filter(|stored| !stored.deleted)
            .map(|stored| &stored.record)
    }

    fn live_by_id(&self, id: &str) -> Option<&Record> {
        self.records
            .get(id)
            .filter(|stored| !stored.deleted)
            .map(|stored| &stored.record)
    }

    fn resolve(&self, target: &RecordRef) -> Option<&Record> {
        target
            .id
            .as_deref()
            .and_then(|id| self.live_by_id(id))
            .or_else(|| {
                let key = (target.type_tag.clone(), target.natural_key.clone());
                self.keys.get(&key).and_then(|id| self.live_by_id(id))
            })
    }

    /// Live sub-documents whose `asset` relation points at `owner`.
    fn attached(&self, owner: &Record, embed: EmbedKind) -> Vec<&Record> {
        let type_tag = match embed {
            EmbedKind::Readme => "Readme",
            EmbedKind::Link => "Link",
        };
        let mut docs: Vec<&Record> = self
            .live()
            .filter(|record| record.type_tag == type_tag)
            .filter(|record| {
                record
                    .relations
                    .get("asset")
                    .and_then(FieldState::value)
                    .is_some_and(|value| value.refs().iter().any(|r| points_at(r, owner)))
            })
            .collect();
        docs.sort_by(|a, b| a.natural_key.cmp(&b.natural_key));
        docs
    }

    fn term_label(&self, term: &Record) -> Option<RefLabel> {
        let name = term.name()?;
        let anchor = term.relations.get("anchor").and_then(FieldState::value)?;
        let glossary = anchor.refs().first().and_then(|r| self.resolve(r))?;
        Some(RefLabel {
            name: name.to_string(),
            container: glossary.name()?.to_string(),
        })
    }

    fn label_terms(&self, value: &mut Value) {
        match value {
            Value::Ref(target) => {
                if let Some(label) = self.resolve(target).and_then(|term| self.term_label(term)) {
                    target.label = Some(label);
                }
            }
            Value::List(items) => items.iter_mut().for_each(|item| self.label_terms(item)),
            _ => {}
        }
    }

    /// The record as a query sees it: embedded sub-documents folded back
    /// into their owner and term references labelled.
    fn project(&self, stored: &Record) -> Record {
        let mut record = stored.clone();
        if let Some(readme) = self.attached(stored, EmbedKind::Readme).first() {
            let description = text_attribute(readme, "description");
            record.set_relation(
                "readme",
                Value::Embedded(EmbeddedDoc::Readme { description }),
            );
        }
        let links: Vec<Value> = self
            .attached(stored, EmbedKind::Link)
            .into_iter()
            .map(|link| {
                Value::Embedded(EmbeddedDoc::Link {
                    name: text_attribute(link, "name"),
                    url: text_attribute(link, "link"),
                })
            })
            .collect();
        if !links.is_empty() {
            record.set_relation("links", Value::List(links));
        }

        for (name, state) in record.relations.iter_mut() {
            let is_term_field = schema::field_for(&stored.type_tag, name)
                .is_some_and(|field| matches!(field.kind.element(), Kind::TermReference));
            if let (true, FieldState::Set(value)) = (is_term_field, state) {
                self.label_terms(value);
            }
        }
        record
    }
}

fn points_at(target: &RecordRef, owner: &Record) -> bool {
    target.id.as_deref() == Some(owner.id.as_str())
        || (target.type_tag == owner.type_tag && target.natural_key == owner.natural_key)
}

fn text_attribute(record: &Record, name: &str) -> String {
    record
        .attributes
        .get(name)
        .and_then(FieldState::value)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn apply(target: &mut BTreeMap<String, FieldState>, name: &str, state: &FieldState) {
    match state {
        FieldState::Set(value) => {
            target.insert(name.to_string(), FieldState::Set(value.clone()));
        }
        FieldState::Cleared => {
            target.remove(name);
        }
    }
}

/// Applies an incoming record onto a stored one, returning whether anything changed.
fn merge(stored: &mut Record, incoming: &Record) -> bool {
    let before = stored.clone();
    for (name, state) in &incoming.attributes {
        apply(&mut stored.attributes, name, state);
    }
    for (name, state) in &incoming.relations {
        apply(&mut stored.relations, name, state);
    }
    for (set, attrs) in &incoming.extension_sets {
        let target = stored.extension_sets.entry(set.clone()).or_default();
        for (attr, value) in attrs {
            target.insert(attr.clone(), value.clone());
        }
    }
    if let Some(tags) = &incoming.tags {
        let owner = stored.id.clone();
        stored.tags = Some(
            tags.iter()
                .map(|tag| TagAssignment {
                    origin: Some(tag.origin.clone().unwrap_or_else(|| owner.clone())),
                    ..tag.clone()
                })
                .collect(),
        );
    }
    *stored != before
}

/// In-process store implementing every collaborator trait.
///
/// Records are keyed by `(type_tag, natural_key)`. Readme and link
/// sub-documents are stored as records of their own, related to their owner
/// through `asset`, and folded back into the owner by queries. Counters and
/// failure switches make it usable as a test double.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    rejected_keys: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    upsert_calls: AtomicUsize,
    submitted: AtomicUsize,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let snapshot_error = |reason: String| StoreError::Snapshot {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| snapshot_error(e.to_string()))?;

        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for stored in snapshot.records {
                inner.insert(stored);
            }
        }
        log::debug!("loaded {} records from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let snapshot_error = |reason: String| StoreError::Snapshot {
            path: path.display().to_string(),
            reason,
        };
        let snapshot = Snapshot {
            records: self.inner.read().records.values().cloned().collect(),
        };
        let content =
            serde_json::to_string_pretty(&snapshot).map_err(|e| snapshot_error(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| snapshot_error(e.to_string()))?;
        log::debug!("saved {} records to {}", snapshot.records.len(), path.display());
        Ok(())
    }

    /// Stores a record as-is, assigning a real id when it carries a placeholder.
    pub fn insert(&self, mut record: Record) -> String {
        if is_placeholder(&record.id) {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        self.inner.write().insert(StoredRecord {
            record,
            deleted: false,
        });
        id
    }

    /// Live record by natural key, as stored.
    pub fn get(&self, type_tag: &str, natural_key: &str) -> Option<Record> {
        let inner = self.inner.read();
        let key = (type_tag.to_string(), natural_key.to_string());
        inner
            .keys
            .get(&key)
            .and_then(|id| inner.live_by_id(id))
            .cloned()
    }

    /// Live record by natural key, as a query would return it.
    pub fn view(&self, type_tag: &str, natural_key: &str) -> Option<Record> {
        let inner = self.inner.read();
        let key = (type_tag.to_string(), natural_key.to_string());
        inner
            .keys
            .get(&key)
            .and_then(|id| inner.live_by_id(id))
            .map(|record| inner.project(record))
    }

    pub fn live_records(&self) -> Vec<Record> {
        self.inner.read().live().cloned().collect()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.inner.read().live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.inner
            .read()
            .records
            .get(id)
            .is_some_and(|stored| stored.deleted)
    }

    /// Refuses every future upsert of records with this natural key.
    pub fn reject_key(&self, natural_key: impl Into<String>) {
        self.rejected_keys.write().insert(natural_key.into());
    }

    /// Makes every upsert fail as if the store could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Records received across all upsert calls.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl UpsertClient for MemoryStore {
    fn upsert(&self, records: &[Record], mode: UpsertMode) -> Result<UpsertResponse, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        self.submitted.fetch_add(records.len(), Ordering::SeqCst);

        let rejected_keys = self.rejected_keys.read();
        let mut inner = self.inner.write();
        let mut response = UpsertResponse::default();
        let mut refused = Vec::new();
        let mut missing = Vec::new();

        for incoming in records {
            if rejected_keys.contains(&incoming.natural_key) {
                refused.push(incoming.clone());
                continue;
            }
            let key = (incoming.type_tag.clone(), incoming.natural_key.clone());
            let id = match inner.keys.get(&key).cloned() {
                Some(id) => {
                    let Some(stored) = inner.records.get_mut(&id) else {
                        continue;
                    };
                    let revived = stored.deleted;
                    stored.deleted = false;
                    if merge(&mut stored.record, incoming) || revived {
                        response.updated.push(stored.record.clone());
                    }
                    id
                }
                None if mode == UpsertMode::UpdateOnly => {
                    missing.push(incoming.clone());
                    continue;
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    let mut record =
                        Record::with_id(&incoming.type_tag, &incoming.natural_key, &id);
                    merge(&mut record, incoming);
                    response.created.push(record.clone());
                    inner.insert(StoredRecord {
                        record,
                        deleted: false,
                    });
                    id
                }
            };
            if is_placeholder(&incoming.id) {
                response.resolved.insert(incoming.id.clone(), id);
            }
        }

        if !refused.is_empty() {
            response.failures.push(BatchFailure {
                reason: "rejected by store validation".to_string(),
                records: refused,
            });
        }
        if !missing.is_empty() {
            response.failures.push(BatchFailure {
                reason: "no existing record to update".to_string(),
                records: missing,
            });
        }
        Ok(response)
    }
}

impl AssetStore for MemoryStore {
    fn fetch(&self, id: &str, fields: &[&str]) -> Result<Option<Record>, StoreError> {
        let inner = self.inner.read();
        let Some(stored) = inner.live_by_id(id) else {
            return Ok(None);
        };

        let mut record = Record::with_id(&stored.type_tag, &stored.natural_key, &stored.id);
        for name in fields {
            let embed = schema::field_for(&stored.type_tag, name).and_then(|f| f.embed_kind());
            match embed {
                Some(EmbedKind::Readme) => {
                    if let Some(readme) = inner.attached(stored, EmbedKind::Readme).first() {
                        record.set_relation(name, Value::Ref(readme.to_ref()));
                    }
                }
                Some(EmbedKind::Link) => {
                    let links: Vec<Value> = inner
                        .attached(stored, EmbedKind::Link)
                        .into_iter()
                        .map(|link| Value::Ref(link.to_ref()))
                        .collect();
                    if !links.is_empty() {
                        record.set_relation(name, Value::List(links));
                    }
                }
                None if *name == "tags" => record.tags = stored.tags.clone(),
                None => {
                    if let Some(state) = stored.attributes.get(*name) {
                        record.attributes.insert(name.to_string(), state.clone());
                    }
                    if let Some(state) = stored.relations.get(*name) {
                        record.relations.insert(name.to_string(), state.clone());
                    }
                }
            }
        }
        Ok(Some(record))
    }

    fn soft_delete(&self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.write();
        let mut deleted = Vec::new();
        for id in ids {
            if let Some(stored) = inner.records.get_mut(id)
                && !stored.deleted
            {
                stored.deleted = true;
                deleted.push(id.clone());
            }
        }
        Ok(deleted)
    }
}

impl QueryService for MemoryStore {
    fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        let count = inner
            .live()
            .filter(|record| filter.matches(&inner.project(record)))
            .count();
        Ok(count as u64)
    }

    fn stream(
        &self,
        filter: &Filter,
    ) -> Result<Box<dyn Iterator<Item = Record> + Send>, StoreError> {
        let inner = self.inner.read();
        let matching: Vec<Record> = inner
            .live()
            .map(|record| inner.project(record))
            .filter(|record| filter.matches(record))
            .collect();
        Ok(Box::new(matching.into_iter()))
    }

    fn extension_attributes(&self) -> Result<Vec<(String, String)>, StoreError> {
        let inner = self.inner.read();
        let declared: BTreeSet<(String, String)> = inner
            .live()
            .flat_map(|record| {
                record.extension_sets.iter().flat_map(|(set, attrs)| {
                    attrs.keys().map(move |attr| (set.clone(), attr.clone()))
                })
            })
            .collect();
        Ok(declared.into_iter().collect())
    }
}

impl Directory for MemoryStore {
    fn find_by_name(
        &self,
        type_tag: &str,
        name: &str,
        container: Option<&str>,
    ) -> Result<Option<Record>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read();
        let found = inner
            .live()
            .filter(|record| record.type_tag == type_tag && record.name() == Some(name))
            .find(|record| match container {
                None => true,
                Some(container) => record
                    .relations
                    .get("anchor")
                    .and_then(FieldState::value)
                    .is_some_and(|anchor| {
                        anchor.refs().iter().any(|r| {
                            r.natural_key == container || r.id.as_deref() == Some(container)
                        })
                    }),
            })
            .cloned();
        Ok(found)
    }
}
