use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up a stream, before any row is produced
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of '{path}': {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to seek in '{path}': {source}")]
    Seek {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch '{path}' for changes: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to start stream worker: {0}")]
    Spawn(#[source] std::io::Error),
}
