pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod mapper;
pub mod model;
pub mod progress;
pub mod schema;
pub mod store;

pub use error::{LoaderError, LoaderResult, RowError};
pub use model::{FieldState, Record, Value};

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Installs the process logger once. `RUST_LOG` overrides the `info` default.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    });
}
