use crate::config::ConfigError;
use crate::store::StoreError;
use thiserror::Error;

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("structural error: {0}")]
    Structural(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited input: {0}")]
    Csv(#[from] csv::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl LoaderError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoaderError::Structural(_) => 2,
            LoaderError::Io { .. } | LoaderError::Csv(_) => 3,
            LoaderError::Config(_) | LoaderError::WorkerPool(_) => 4,
            LoaderError::Store(_) => 5,
        }
    }
}

/// Errors confined to a single row or a single cell of a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row has no value for `typeTag` or `naturalKey`")]
    MissingSentinel,
    #[error("invalid value `{value}` for {field}: {reason}")]
    InvalidCell {
        field: String,
        value: String,
        reason: String,
    },
    #[error("invalid reference `{value}` for {field}: expected typeTag@naturalKey")]
    InvalidReference { field: String, value: String },
    #[error("unable to resolve `{identity}` for {field}")]
    LookupMiss { field: String, identity: String },
    #[error("decoding {kind} values for {field} is not supported")]
    Unsupported { field: String, kind: &'static str },
}

impl RowError {
    pub fn invalid_cell(field: &str, value: &str, reason: impl ToString) -> Self {
        RowError::InvalidCell {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
