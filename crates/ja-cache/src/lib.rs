//! Content-hash change detection for the original and slim databases.
//!
//! A [`ChangeDetector`] keeps three plain-text records in a cache
//! directory: a pointer to the original database and the last recorded
//! digest of the original and slim databases. Downstream tooling asks it
//! whether either database changed since the last processing pass.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use ja_cache::{CacheConfig, ChangeDetector};
//!
//! let detector = ChangeDetector::new(CacheConfig::new("/tmp/ja-prep-cache"));
//! detector.set_original_database_path(Path::new("DATABASE.sqlite3"))?;
//!
//! if detector.assess()?.needs_reprocessing() {
//!     // ... rebuild the slim database ...
//!     detector.record_original_hash()?;
//!     detector.record_slim_hash()?;
//! }
//! # Ok::<(), ja_cache::CacheError>(())
//! ```

mod assessment;
mod config;
mod detector;
mod error;
mod hash;
mod records;

pub use assessment::{ChangeAssessment, ChangeReason};
pub use config::{CacheConfig, DEFAULT_SLIM_EXTENSION, FALLBACK_CACHE_DIR, default_cache_dir};
pub use detector::{ChangeDetector, slim_path_for};
pub use error::{CacheError, Result};
pub use hash::{
    DEFAULT_BLOCK_SIZE, HashAlgorithm, compute_file_hash, hash_reader, verify_file_hash,
};
pub use records::{ORIGINAL_HASH_FILE, ORIGINAL_POINTER_FILE, SLIM_HASH_FILE};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
