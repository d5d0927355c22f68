//! Error types for SAS7BDAT file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing SAS7BDAT files.
#[derive(Debug, Error)]
pub enum Sas7bdatError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Invalid SAS7BDAT file format.
    #[error("invalid SAS7BDAT file: {message}")]
    InvalidFormat { message: String },

    /// A read ran past the end of a header, page or subheader.
    #[error("truncated data: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// Subheader signature that is neither metadata nor a compressed row.
    #[error("unknown subheader signature {signature} at offset {offset}")]
    UnknownSubheader { signature: String, offset: usize },

    /// Compressed row could not be expanded.
    #[error("decompression failed: {message}")]
    Decompression { message: String },

    /// Column name is empty.
    #[error("column name must not be empty")]
    InvalidColumnName,

    /// Duplicate column name.
    #[error("duplicate column name: {name}")]
    DuplicateColumn { name: String },

    /// Row has the wrong number of values.
    #[error("row {row} has {actual} values, expected {expected}")]
    ValueCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Value does not fit the column it is written to.
    #[error("column {column}: {message}")]
    UnsupportedValue { column: String, message: String },

    /// Metadata does not fit in a single page.
    #[error("{what} needs {needed} bytes but a page holds {available}")]
    PageOverflow {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for SAS7BDAT operations.
pub type Result<T> = std::result::Result<T, Sas7bdatError>;

impl Sas7bdatError {
    /// Create an InvalidFormat error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a Decompression error.
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    /// Create an UnsupportedValue error.
    pub fn unsupported_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            column: column.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Sas7bdatError::invalid_format("bad magic number");
        assert_eq!(format!("{err}"), "invalid SAS7BDAT file: bad magic number");

        let err = Sas7bdatError::Truncated {
            offset: 512,
            needed: 8,
        };
        assert_eq!(
            format!("{err}"),
            "truncated data: needed 8 bytes at offset 512"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Sas7bdatError = io_err.into();
        assert!(matches!(err, Sas7bdatError::Io(_)));
    }
}
