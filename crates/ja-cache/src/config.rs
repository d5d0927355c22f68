//! Change-detector configuration.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::hash::{DEFAULT_BLOCK_SIZE, HashAlgorithm};

/// Extension of the slim database unless configured otherwise.
pub const DEFAULT_SLIM_EXTENSION: &str = "jasqlite3";

/// Directory used when the platform has no cache directory.
pub const FALLBACK_CACHE_DIR: &str = ".ja-prep-cache";

/// Where cache records live and how digests are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory, created lazily on first write.
    pub root: PathBuf,

    /// Digest algorithm.
    pub algorithm: HashAlgorithm,

    /// Bytes read per block while hashing.
    pub block_size: usize,

    /// Extension of the slim database, with or without a leading dot.
    pub slim_extension: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_dir(),
            algorithm: HashAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            slim_extension: DEFAULT_SLIM_EXTENSION.to_string(),
        }
    }
}

impl CacheConfig {
    /// Configuration with defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[must_use]
    pub fn with_slim_extension(mut self, extension: impl Into<String>) -> Self {
        self.slim_extension = extension.into();
        self
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Platform cache directory for `ja-prep`, or `.ja-prep-cache` in the
/// working directory when there is none.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "ja-prep")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::new("/tmp/cache");
        assert_eq!(config.root(), Path::new("/tmp/cache"));
        assert_eq!(config.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.block_size, 1024 * 1024);
        assert_eq!(config.slim_extension, "jasqlite3");
    }

    #[test]
    fn test_builders() {
        let config = CacheConfig::new("/tmp/cache")
            .with_algorithm(HashAlgorithm::Blake3)
            .with_block_size(0)
            .with_slim_extension(".slim");
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.block_size, 1);
        assert_eq!(config.slim_extension, ".slim");
    }

    #[test]
    fn test_default_cache_dir_names_the_tool() {
        let dir = default_cache_dir();
        assert!(dir.to_string_lossy().contains("ja-prep"));
    }
}
