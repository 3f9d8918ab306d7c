use super::RecordCache;
use crate::store::Directory;
use std::sync::Arc;

/// Separates a term's name from its glossary's name: `{term}@@@{glossary}`.
pub const TERM_SEPARATOR: &str = "@@@";

/// Glossaries by name.
pub fn glossary_cache(directory: Arc<dyn Directory>) -> RecordCache {
    RecordCache::new("glossary", move |name| {
        directory
            .find_by_name("Glossary", name, None)
            .unwrap_or_else(|e| {
                log::warn!("glossary lookup for {} failed: {}", name, e);
                None
            })
    })
}

/// Terms by `{term}@@@{glossary}`, resolving the glossary first.
pub fn term_cache(directory: Arc<dyn Directory>, glossaries: Arc<RecordCache>) -> RecordCache {
    RecordCache::new("term", move |identity| {
        let tokens: Vec<&str> = identity.split(TERM_SEPARATOR).collect();
        let [term, glossary] = tokens.as_slice() else {
            log::warn!(
                "unable to resolve term {}: expected exactly one {}",
                identity,
                TERM_SEPARATOR
            );
            return None;
        };
        let glossary = glossaries.get(glossary)?;
        directory
            .find_by_name("GlossaryTerm", term, Some(&glossary.natural_key))
            .unwrap_or_else(|e| {
                log::warn!("term lookup for {} failed: {}", identity, e);
                None
            })
    })
}

/// Caches consulted while decoding cells.
pub struct Lookups {
    pub glossaries: Arc<RecordCache>,
    pub terms: RecordCache,
}

impl Lookups {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        let glossaries = Arc::new(glossary_cache(Arc::clone(&directory)));
        let terms = term_cache(directory, Arc::clone(&glossaries));
        Self { glossaries, terms }
    }
}
