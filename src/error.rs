//! Error types for the websift host.

use std::path::PathBuf;

/// Errors raised while preparing or presenting a search.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    ReadConfig {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for a search configuration.
    #[error("config error in {path}: {message}")]
    Config {
        /// File that failed.
        path: PathBuf,
        /// Parser or validation message.
        message: String,
    },

    /// Rendering the response failed.
    #[error("output error: {0}")]
    Output(String),

    /// Error from the search library.
    #[error(transparent)]
    Search(#[from] websift_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HostError>;
