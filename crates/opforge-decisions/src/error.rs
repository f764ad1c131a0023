//! Error types for decision files and generation configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for decision loading.
pub type Result<T> = std::result::Result<T, DecisionError>;

/// Problems with one decision file or one of its entries.
#[derive(Error, Debug)]
pub enum DecisionError {
    /// The main decisions file does not exist
    #[error(
        "decisions file '{}' not found; build and run with tracing enabled to generate it",
        .path.display()
    )]
    MainFileMissing {
        /// The resolved path
        path: PathBuf,
    },

    /// An override file does not exist
    #[error(
        "decision override file '{}' not found; create it or remove it from the decision override files",
        .path.display()
    )]
    OverrideFileMissing {
        /// The resolved path
        path: PathBuf,
    },

    /// Reading the file failed for another reason
    #[error("failed to read decisions file '{}': {source}", .path.display())]
    Io {
        /// The resolved path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("decisions file '{}' is invalid: {source}", .path.display())]
    Malformed {
        /// The resolved path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Valid JSON of the wrong shape
    #[error("decisions file '{}' is invalid: {reason}", .path.display())]
    InvalidShape {
        /// The resolved path
        path: PathBuf,
        /// What is wrong
        reason: String,
    },

    /// An object entry with missing or mistyped fields
    #[error("decisions file '{}' is invalid: entry {index}: {source}", .path.display())]
    InvalidEntry {
        /// The resolved path
        path: PathBuf,
        /// Position of the entry in the top-level array
        index: usize,
        /// Underlying error
        source: serde_json::Error,
    },

    /// An object entry whose `type` is not a known decision type
    #[error("unknown optimization decision type '{ty}' in '{}' (entry {index})", .path.display())]
    UnknownType {
        /// The resolved path
        path: PathBuf,
        /// Position of the entry in the top-level array
        index: usize,
        /// The offending type string
        ty: String,
    },
}

/// Problems with a generation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration failed
    #[error("failed to read configuration '{}': {source}", .path.display())]
    Io {
        /// The configuration path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration is not valid
    #[error("configuration '{}' is invalid: {source}", .path.display())]
    Malformed {
        /// The configuration path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// A boxing elimination type outside the supported set
    #[error(
        "unsupported boxing elimination type '{0}'; expected one of boolean, byte, int, float, long, double"
    )]
    UnsupportedBoxingType(String),

    /// Loading the decisions named by the configuration failed
    #[error(transparent)]
    Decision(#[from] DecisionError),
}
