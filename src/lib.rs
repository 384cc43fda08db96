use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod engine;
pub mod http;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::SearcherConfig;
pub use http::{Fetch, FetchError, Fetcher};
pub use types::{QueryUrl, ResultEntry};

/// The `SearcherError` enum represents the errors that can stop a search run.
///
/// Per-request failures are not part of this enum; they are reported as
/// [`FetchError`] and only ever skip the query that produced them.
#[derive(Error, Debug)]
pub enum SearcherError {
    /// Represents an error while loading layered configuration.
    #[error("Configuration failed: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents a configuration value that cannot be used for a run.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
    /// Represents an engine whose selector text does not parse.
    #[error("Invalid selector for {engine}: {reason}")]
    SelectorError { engine: String, reason: String },
    /// Represents an error that occurs while building the HTTP client.
    #[error("HTTP client setup failed: {0}")]
    ClientError(#[from] reqwest::Error),
    /// Represents a filesystem or stream error.
    #[error("I/O failed: {0}")]
    IoError(#[from] std::io::Error),
    /// Represents an error that occurs while encoding results as JSON.
    #[error("Serialization failed: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// A type alias for `Result` with the `SearcherError` error type.
pub type Result<T> = std::result::Result<T, SearcherError>;

// Constants

/// The default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// The default number of fetch+parse units allowed in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;
/// The default directory that receives the JSON documents.
pub const DEFAULT_OUTPUT_DIR: &str = "data";
