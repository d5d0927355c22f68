//! Conversion and inspection error types.

use std::path::PathBuf;

use ja_sas7bdat::Sas7bdatError;
use thiserror::Error;

/// Error raised while building or inspecting a database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A mapped extract file does not exist.
    #[error("extract file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A chunk does not match the schema of the table it is appended to.
    #[error("schema mismatch for table {table}: expected {expected}, found {found}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    /// An extract could not be decoded.
    #[error("failed to read extract: {path}")]
    Extract {
        path: PathBuf,
        #[source]
        source: Sas7bdatError,
    },

    /// A mapping entry is unusable.
    #[error("invalid table mapping {entry:?}: {reason}")]
    InvalidMapping { entry: String, reason: String },

    /// Table renaming would overwrite another table.
    #[error("cannot rename table {from} to {to}: target already exists")]
    TableExists { from: String, to: String },

    /// SQLite error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Wrap a reader error, keeping the file path.
    ///
    /// A missing file stays a [`StoreError::FileNotFound`].
    pub fn extract(path: impl Into<PathBuf>, source: Sas7bdatError) -> Self {
        match source {
            Sas7bdatError::FileNotFound { path } => Self::FileNotFound { path },
            source => Self::Extract {
                path: path.into(),
                source,
            },
        }
    }

    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_mapping(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMapping {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}
