//! Error types for the program loader.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the loader.
///
/// Per-program failures are never returned as errors; they are counted and
/// logged instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to initialize loader: {reason}")]
    InitFailed { reason: String },

    #[error("Failed to list programs in {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;
