//! Error types for codeatlas-core.
//!
//! Uses a hierarchical error enum so callers can pattern-match on the
//! kind of failure. Recoverable kinds (`Io`, `Parse`, `Embedding`,
//! `Store`) are caught and logged by the loop that owns the per-file or
//! per-batch iteration; `Argument` is the only kind meant to unwind all
//! the way to the caller unhandled.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all codeatlas-core operations.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// A file could not be read, or a directory could not be created.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path the I/O operation was attempted against.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// AST construction failed for a single file. The rest of the index is fine.
    #[error("parse error for {path}: {message}")]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The embedding backend failed for a batch, or returned the wrong vector count.
    #[error("embedding error: {message}")]
    Embedding {
        /// Human-readable error description.
        message: String,
    },

    /// A transactional write to the Store failed.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A caller-supplied argument violated a precondition (path escaped the
    /// project root, mismatched vector dimensionality, etc.).
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Requested entity was not found in the index.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization of chunk metadata, vectors, or skeletons failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file is invalid or cannot be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AtlasError {
    /// Wrap an I/O error together with the path that triggered it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Convenience type alias for Results in codeatlas-core.
pub type AtlasResult<T> = Result<T, AtlasError>;
