//! Combined change decision for the original and slim databases.

use std::fmt;

/// Why the slim database must (or need not) be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    UpToDate,
    /// No slim database exists at the derived path.
    SlimMissing,
    OriginalChanged,
    SlimChanged,
    BothChanged,
}

impl ChangeReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpToDate => "up to date",
            Self::SlimMissing => "slim database missing",
            Self::OriginalChanged => "original database changed",
            Self::SlimChanged => "slim database changed",
            Self::BothChanged => "original and slim databases changed",
        }
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of both change checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeAssessment {
    pub slim_exists: bool,
    pub original_changed: bool,
    pub slim_changed: bool,
}

impl ChangeAssessment {
    #[must_use]
    pub fn reason(&self) -> ChangeReason {
        if !self.slim_exists {
            return ChangeReason::SlimMissing;
        }
        match (self.original_changed, self.slim_changed) {
            (false, false) => ChangeReason::UpToDate,
            (true, false) => ChangeReason::OriginalChanged,
            (false, true) => ChangeReason::SlimChanged,
            (true, true) => ChangeReason::BothChanged,
        }
    }

    #[must_use]
    pub fn needs_reprocessing(&self) -> bool {
        self.reason() != ChangeReason::UpToDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(slim_exists: bool, original_changed: bool, slim_changed: bool) -> ChangeAssessment {
        ChangeAssessment {
            slim_exists,
            original_changed,
            slim_changed,
        }
    }

    #[test]
    fn test_reasons() {
        assert_eq!(assessment(true, false, false).reason(), ChangeReason::UpToDate);
        assert_eq!(assessment(false, false, true).reason(), ChangeReason::SlimMissing);
        assert_eq!(assessment(false, true, true).reason(), ChangeReason::SlimMissing);
        assert_eq!(assessment(true, true, false).reason(), ChangeReason::OriginalChanged);
        assert_eq!(assessment(true, false, true).reason(), ChangeReason::SlimChanged);
        assert_eq!(assessment(true, true, true).reason(), ChangeReason::BothChanged);
    }

    #[test]
    fn test_needs_reprocessing() {
        assert!(!assessment(true, false, false).needs_reprocessing());
        assert!(assessment(true, true, false).needs_reprocessing());
        assert!(assessment(false, false, false).needs_reprocessing());
    }
}
