use std::path::PathBuf;

use ja_cache::{ChangeAssessment, HashAlgorithm};
use serde::Serialize;

/// Output of `ja-prep status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub cache_dir: PathBuf,
    pub algorithm: HashAlgorithm,
    pub original: Option<PathBuf>,
    pub slim: Option<PathBuf>,
    pub slim_exists: bool,
    pub original_changed: bool,
    pub slim_changed: bool,
    pub reason: String,
    pub needs_reprocessing: bool,
}

impl StatusReport {
    pub fn new(
        cache_dir: PathBuf,
        algorithm: HashAlgorithm,
        original: Option<PathBuf>,
        slim: Option<PathBuf>,
        assessment: ChangeAssessment,
    ) -> Self {
        Self {
            cache_dir,
            algorithm,
            original,
            slim,
            slim_exists: assessment.slim_exists,
            original_changed: assessment.original_changed,
            slim_changed: assessment.slim_changed,
            reason: assessment.reason().to_string(),
            needs_reprocessing: assessment.needs_reprocessing(),
        }
    }
}
