//! Plain-text cache records.
//!
//! Records are written without a trailing newline and read back with
//! surrounding whitespace trimmed. A missing record reads as `None`.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{CacheError, Result};

/// Pointer to the original database.
pub const ORIGINAL_POINTER_FILE: &str = "original_database_file.cache";
/// Digest of the original database.
pub const ORIGINAL_HASH_FILE: &str = "db_hash_original.cache";
/// Digest of the slim database.
pub const SLIM_HASH_FILE: &str = "db_hash_slim.cache";

/// Read a record; `None` when the directory or file does not exist.
pub fn read_record(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io("read", path, e)),
    }
}

/// Overwrite a record, creating the parent directory if needed.
pub fn write_record(path: &Path, value: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::io("create directory", parent, e))?;
    }
    fs::write(path, value).map_err(|e| CacheError::io("write", path, e))
}
