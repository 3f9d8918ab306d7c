use crate::config::ConfigError;
use crate::model::Record;
use crate::schema;
use std::str::FromStr;

/// Types never exported: access control, namespaces, saved queries and
/// sub-documents that travel embedded in their owner's row.
pub const EXCLUDED_TYPES: &[&str] = &[
    "AuthPolicy",
    "Persona",
    "Purpose",
    "Collection",
    "Folder",
    "Query",
    "Procedure",
    "Readme",
    "Link",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportScope {
    /// Only records carrying at least one enrichment.
    #[default]
    EnrichedOnly,
    All,
}

impl FromStr for ExportScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENRICHED_ONLY" => Ok(ExportScope::EnrichedOnly),
            "ALL" => Ok(ExportScope::All),
            other => Err(ConfigError::InvalidChoice {
                key: "EXPORT_SCOPE",
                value: other.to_string(),
            }),
        }
    }
}

/// Selects which records an export streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub key_prefix: String,
    pub scope: ExportScope,
}

impl Filter {
    pub fn new(key_prefix: impl Into<String>, scope: ExportScope) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            scope,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if EXCLUDED_TYPES.contains(&record.type_tag.as_str()) {
            return false;
        }
        if !record.natural_key.starts_with(&self.key_prefix) {
            return false;
        }
        match self.scope {
            ExportScope::All => true,
            ExportScope::EnrichedOnly => is_enriched(record),
        }
    }
}

fn is_enriched(record: &Record) -> bool {
    let has_enrichment = schema::ENRICHMENT_FIELDS
        .iter()
        .any(|field| record.value_of(field).is_some_and(|value| !value.is_empty()));
    let has_extension = record
        .extension_sets
        .values()
        .any(|attrs| !attrs.is_empty());
    has_enrichment || has_extension
}
