//! Cache error types.
//!
//! A missing cache directory, record or pointed file is not an error: the
//! detector reports "changed" instead. Only unexpected I/O failures surface
//! here.

use std::path::PathBuf;
use thiserror::Error;

/// Change-detector error.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No original database has been registered.
    #[error("no original database registered in cache {root}")]
    PointerUnset { root: PathBuf },
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the error is an I/O error of kind `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
