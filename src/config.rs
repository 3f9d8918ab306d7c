use crate::store::{ExportScope, UpsertMode};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors in configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} must be a single character, got `{value}`")]
    InvalidDelimiter { key: &'static str, value: String },
    #[error("{key} must be a JSON list of field names: {source}")]
    InvalidFieldList {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown {key} value `{value}`")]
    InvalidChoice { key: &'static str, value: String },
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Blank values count as unset.
fn lookup(get: Lookup, key: &str) -> Option<String> {
    get(key).filter(|value| !value.trim().is_empty())
}

fn env_usize(get: Lookup, key: &str, default: usize) -> usize {
    lookup(get, key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_string(get: Lookup, key: &str, default: &str) -> String {
    lookup(get, key).unwrap_or_else(|| default.to_string())
}

fn env_delimiter(get: Lookup, key: &'static str) -> Result<u8, ConfigError> {
    match lookup(get, key) {
        None => Ok(b','),
        Some(value) => parse_delimiter(&value).ok_or(ConfigError::InvalidDelimiter { key, value }),
    }
}

/// Accepts a single ASCII character, or `\t` / `tab` for a tab.
pub fn parse_delimiter(value: &str) -> Option<u8> {
    match value {
        "\\t" | "tab" => Some(b'\t'),
        _ => match value.as_bytes() {
            [byte] if byte.is_ascii() => Some(*byte),
            _ => None,
        },
    }
}

/// Adds fields that only make sense cleared together with the named ones.
pub fn expand_clear_fields(names: Vec<String>) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::with_capacity(names.len());
    let mut push = |name: &str| {
        if !expanded.iter().any(|existing| existing == name) {
            expanded.push(name.to_string());
        }
    };
    for name in &names {
        push(name);
        match name.as_str() {
            "certificateStatus" => push("certificateStatusMessage"),
            "announcementType" => {
                push("announcementTitle");
                push("announcementMessage");
            }
            _ => {}
        }
    }
    expanded
}

/// Configuration for an import run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub input: Option<PathBuf>,
    pub batch_size: usize,
    pub delimiter: u8,
    /// Fields whose empty cells clear the stored value, already expanded.
    pub clear_fields: Vec<String>,
    pub mode: UpsertMode,
    pub workers: usize,
}

impl ImportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&|key| env::var(key).ok())
    }

    pub fn from_source(get: Lookup) -> Result<Self, ConfigError> {
        let clear_fields = match lookup(get, "ATTR_TO_OVERWRITE") {
            None => Vec::new(),
            Some(value) => serde_json::from_str::<Vec<String>>(&value).map_err(|source| {
                ConfigError::InvalidFieldList {
                    key: "ATTR_TO_OVERWRITE",
                    source,
                }
            })?,
        };
        let mode = match lookup(get, "UPSERT_SEMANTIC") {
            None => UpsertMode::default(),
            Some(value) => value.parse()?,
        };

        Ok(Self {
            input: lookup(get, "UPLOADED_FILE").map(PathBuf::from),
            batch_size: env_usize(get, "BATCH_SIZE", 50),
            delimiter: env_delimiter(get, "DELIMITER")?,
            clear_fields: expand_clear_fields(clear_fields),
            mode,
            workers: env_usize(get, "WORKERS", num_cpus::get()),
        })
    }

    pub fn input_path(&self) -> Result<&Path, ConfigError> {
        self.input
            .as_deref()
            .ok_or(ConfigError::Missing("UPLOADED_FILE"))
    }
}

/// Configuration for an export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output: Option<PathBuf>,
    pub scope: ExportScope,
    pub key_prefix: String,
    pub delimiter: u8,
    /// Progress is logged once per page of this many records.
    pub batch_size: usize,
    pub workers: usize,
}

impl ExportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&|key| env::var(key).ok())
    }

    pub fn from_source(get: Lookup) -> Result<Self, ConfigError> {
        let scope = match lookup(get, "EXPORT_SCOPE") {
            None => ExportScope::default(),
            Some(value) => value.parse()?,
        };

        Ok(Self {
            output: lookup(get, "OUTPUT_FILE").map(PathBuf::from),
            scope,
            key_prefix: env_string(get, "QN_PREFIX", "default"),
            delimiter: env_delimiter(get, "DELIMITER")?,
            batch_size: env_usize(get, "BATCH_SIZE", 50),
            workers: env_usize(get, "WORKERS", num_cpus::get()),
        })
    }

    pub fn output_path(&self) -> Result<&Path, ConfigError> {
        self.output
            .as_deref()
            .ok_or(ConfigError::Missing("OUTPUT_FILE"))
    }
}
