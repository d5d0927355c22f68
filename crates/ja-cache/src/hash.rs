//! Streaming file digests for change detection.
//!
//! Digests are integrity checks, not security boundaries.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Bytes read per block unless configured otherwise (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "unknown hash algorithm {other:?} (expected sha256 or blake3)"
            )),
        }
    }
}

enum DigestState {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(data),
            Self::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Sha256(hasher) => hex::encode(hasher.finalize()),
            Self::Blake3(hasher) => hex::encode(hasher.finalize().as_bytes()),
        }
    }
}

/// Digest everything a reader yields, `block_size` bytes at a time.
pub fn hash_reader<R: Read>(
    mut reader: R,
    algorithm: HashAlgorithm,
    block_size: usize,
) -> io::Result<String> {
    let mut state = DigestState::new(algorithm);
    let mut buffer = vec![0u8; block_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        state.update(&buffer[..bytes_read]);
    }

    Ok(state.finish())
}

/// Compute the lowercase hex digest of a file.
pub fn compute_file_hash(path: &Path, algorithm: HashAlgorithm, block_size: usize) -> Result<String> {
    let file = File::open(path).map_err(|e| CacheError::io("open", path, e))?;
    hash_reader(file, algorithm, block_size).map_err(|e| CacheError::io("read", path, e))
}

/// Whether a file's digest matches the expected value.
pub fn verify_file_hash(
    path: &Path,
    expected_hash: &str,
    algorithm: HashAlgorithm,
    block_size: usize,
) -> Result<bool> {
    let actual_hash = compute_file_hash(path, algorithm, block_size)?;
    Ok(actual_hash == expected_hash)
}
