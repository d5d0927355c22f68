//! Change detection for the original and slim databases.
//!
//! Every absence (cache directory, record, pointer, database file) counts
//! as "changed". Only an exact digest match reports "unchanged".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::assessment::ChangeAssessment;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::hash::compute_file_hash;
use crate::records::{
    ORIGINAL_HASH_FILE, ORIGINAL_POINTER_FILE, SLIM_HASH_FILE, read_record, write_record,
};

/// Derive the slim database path: same directory and stem, new extension.
pub fn slim_path_for(original: &Path, slim_extension: &str) -> PathBuf {
    original.with_extension(slim_extension.trim_start_matches('.'))
}

/// Hash records and the original-database pointer, rooted at one cache
/// directory.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    config: CacheConfig,
}

impl ChangeDetector {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.config.root.join(name)
    }

    /// The registered original database, if any.
    pub fn original_database_path(&self) -> Result<Option<PathBuf>> {
        let pointer = read_record(&self.record_path(ORIGINAL_POINTER_FILE))?;
        Ok(pointer.filter(|p| !p.is_empty()).map(PathBuf::from))
    }

    /// Register the original database. The path is stored in absolute form.
    pub fn set_original_database_path(&self, path: &Path) -> Result<PathBuf> {
        let absolute =
            std::path::absolute(path).map_err(|e| CacheError::io("resolve", path, e))?;
        write_record(
            &self.record_path(ORIGINAL_POINTER_FILE),
            &absolute.to_string_lossy(),
        )?;
        info!(path = %absolute.display(), "registered original database");
        Ok(absolute)
    }

    /// Slim database path derived from the pointer.
    pub fn slim_database_path(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .original_database_path()?
            .map(|original| slim_path_for(&original, &self.config.slim_extension)))
    }

    /// Digest of a file with the configured algorithm and block size.
    pub fn hash_file(&self, path: &Path) -> Result<String> {
        compute_file_hash(path, self.config.algorithm, self.config.block_size)
    }

    pub fn has_original_changed(&self) -> Result<bool> {
        let original = self.original_database_path()?;
        self.has_changed(ORIGINAL_HASH_FILE, original.as_deref())
    }

    pub fn has_slim_changed(&self) -> Result<bool> {
        let slim = self.slim_database_path()?;
        self.has_changed(SLIM_HASH_FILE, slim.as_deref())
    }

    fn has_changed(&self, record: &str, database: Option<&Path>) -> Result<bool> {
        if !self.config.root.is_dir() {
            debug!(record, root = %self.config.root.display(), "cache directory missing");
            return Ok(true);
        }
        let Some(stored) = read_record(&self.record_path(record))? else {
            debug!(record, "hash record missing");
            return Ok(true);
        };
        let Some(database) = database else {
            debug!(record, "original database not registered");
            return Ok(true);
        };
        if !database.is_file() {
            debug!(record, path = %database.display(), "database file missing");
            return Ok(true);
        }
        let current = self.hash_file(database)?;
        let changed = current != stored;
        debug!(record, path = %database.display(), changed, "compared digests");
        Ok(changed)
    }

    pub fn write_original_hash(&self, digest: &str) -> Result<()> {
        write_record(&self.record_path(ORIGINAL_HASH_FILE), digest)
    }

    pub fn write_slim_hash(&self, digest: &str) -> Result<()> {
        write_record(&self.record_path(SLIM_HASH_FILE), digest)
    }

    /// Hash the registered original database and store the digest.
    pub fn record_original_hash(&self) -> Result<String> {
        let path = self.original_database_path()?.ok_or_else(|| self.pointer_unset())?;
        let digest = self.hash_file(&path)?;
        self.write_original_hash(&digest)?;
        info!(path = %path.display(), digest = %digest, "recorded original database hash");
        Ok(digest)
    }

    /// Hash the slim database and store the digest.
    pub fn record_slim_hash(&self) -> Result<String> {
        let path = self.slim_database_path()?.ok_or_else(|| self.pointer_unset())?;
        let digest = self.hash_file(&path)?;
        self.write_slim_hash(&digest)?;
        info!(path = %path.display(), digest = %digest, "recorded slim database hash");
        Ok(digest)
    }

    fn pointer_unset(&self) -> CacheError {
        CacheError::PointerUnset {
            root: self.config.root.clone(),
        }
    }

    pub fn assess(&self) -> Result<ChangeAssessment> {
        let slim_exists = self.slim_database_path()?.is_some_and(|p| p.is_file());
        Ok(ChangeAssessment {
            slim_exists,
            original_changed: self.has_original_changed()?,
            slim_changed: self.has_slim_changed()?,
        })
    }

    /// Remove the cache directory. A missing directory is not an error.
    pub fn invalidate(&self) -> Result<()> {
        match fs::remove_dir_all(&self.config.root) {
            Ok(()) => {
                info!(root = %self.config.root.display(), "cache invalidated");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io("remove", &self.config.root, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slim_path_for() {
        assert_eq!(
            slim_path_for(Path::new("/data/DATABASE.sqlite3"), "jasqlite3"),
            PathBuf::from("/data/DATABASE.jasqlite3")
        );
        assert_eq!(
            slim_path_for(Path::new("/data/db.original.sqlite3"), ".slim"),
            PathBuf::from("/data/db.original.slim")
        );
        assert_eq!(
            slim_path_for(Path::new("/data/database"), "jasqlite3"),
            PathBuf::from("/data/database.jasqlite3")
        );
    }

    #[test]
    fn test_empty_pointer_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let detector = ChangeDetector::new(CacheConfig::new(dir.path()));
        fs::write(dir.path().join(ORIGINAL_POINTER_FILE), "").unwrap();
        assert_eq!(detector.original_database_path().unwrap(), None);
        assert_eq!(detector.slim_database_path().unwrap(), None);
    }

    #[test]
    fn test_record_without_pointer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let detector = ChangeDetector::new(CacheConfig::new(dir.path().join("cache")));
        assert!(matches!(
            detector.record_original_hash(),
            Err(CacheError::PointerUnset { .. })
        ));
        assert!(matches!(
            detector.record_slim_hash(),
            Err(CacheError::PointerUnset { .. })
        ));
    }
}
