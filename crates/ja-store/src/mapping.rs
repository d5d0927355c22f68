//! Table mappings and conversion planning.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, StoreError};

/// Default extract file extension.
pub const DEFAULT_EXTENSION: &str = ".sas7bdat";

/// Table name marker for cohort extracts, which are never converted.
const COHORT_MARKER: &str = "cohort";

/// One entry of the table name → extract file mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub table: String,
    pub file: String,
}

impl TableMapping {
    pub fn new(table: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            file: file.into(),
        }
    }
}

impl FromStr for TableMapping {
    type Err = StoreError;

    /// Parse `NAME=FILE`; a bare `NAME` maps to a file of the same name.
    fn from_str(entry: &str) -> Result<Self> {
        let (table, file) = match entry.split_once('=') {
            Some((table, file)) => (table.trim(), file.trim()),
            None => (entry.trim(), entry.trim()),
        };
        if table.is_empty() {
            return Err(StoreError::invalid_mapping(entry, "table name is empty"));
        }
        if file.is_empty() {
            return Err(StoreError::invalid_mapping(entry, "file name is empty"));
        }
        Ok(Self::new(table, file))
    }
}

impl fmt::Display for TableMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.table, self.file)
    }
}

/// A mapping entry resolved to an existing extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    pub table: String,
    pub source: PathBuf,
}

/// Whether a table is a cohort table (case-insensitive).
#[must_use]
pub fn is_cohort_table(table: &str) -> bool {
    table.to_lowercase().contains(COHORT_MARKER)
}

/// Give a file name the expected extension.
///
/// Names already ending in `extension` (ignoring ASCII case) are kept.
/// Otherwise any other extension is replaced: `pharma.csv` becomes
/// `pharma.sas7bdat` and `demographics` becomes `demographics.sas7bdat`.
#[must_use]
pub fn normalize_extract_name(file: &str, extension: &str) -> String {
    let bare = extension.trim_start_matches('.');
    if bare.is_empty() {
        return file.to_string();
    }
    let dotted = format!(".{bare}");
    if file.len() >= dotted.len()
        && file.is_char_boundary(file.len() - dotted.len())
        && file[file.len() - dotted.len()..].eq_ignore_ascii_case(&dotted)
    {
        return file.to_string();
    }
    let stem = match file.rfind('.') {
        // A leading dot names a hidden file, not an extension
        Some(dot) if dot > 0 && !file[dot..].contains(['/', '\\']) => &file[..dot],
        _ => file,
    };
    format!("{stem}{dotted}")
}

/// Resolve every mapping entry before anything is written.
///
/// Cohort entries are dropped without touching the filesystem. Every other
/// entry must point at an existing file.
pub fn plan_tables(
    source_dir: &Path,
    mappings: &[TableMapping],
    extension: &str,
) -> Result<Vec<PlannedTable>> {
    let mut planned = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        if is_cohort_table(&mapping.table) {
            debug!(table = %mapping.table, "skipping cohort table");
            continue;
        }
        let source = source_dir.join(normalize_extract_name(&mapping.file, extension));
        if !source.is_file() {
            return Err(StoreError::FileNotFound { path: source });
        }
        planned.push(PlannedTable {
            table: mapping.table.clone(),
            source,
        });
    }
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extract_name() {
        let ext = ".sas7bdat";
        assert_eq!(normalize_extract_name("demographics", ext), "demographics.sas7bdat");
        assert_eq!(normalize_extract_name("pharma.csv", ext), "pharma.sas7bdat");
        assert_eq!(normalize_extract_name("diag.sas7bdat", ext), "diag.sas7bdat");
        assert_eq!(normalize_extract_name("DIAG.SAS7BDAT", ext), "DIAG.SAS7BDAT");
        assert_eq!(normalize_extract_name("a.b.csv", ext), "a.b.sas7bdat");
        assert_eq!(normalize_extract_name(".hidden", ext), ".hidden.sas7bdat");
        assert_eq!(normalize_extract_name("exams", "sas7bdat"), "exams.sas7bdat");
    }

    #[test]
    fn test_is_cohort_table() {
        assert!(is_cohort_table("cohort_a"));
        assert!(is_cohort_table("Main_COHORT"));
        assert!(!is_cohort_table("demographics"));
    }

    #[test]
    fn test_parse_mapping() {
        let mapping: TableMapping = "demographics=demo.sas7bdat".parse().unwrap();
        assert_eq!(mapping, TableMapping::new("demographics", "demo.sas7bdat"));

        let bare: TableMapping = "pharma".parse().unwrap();
        assert_eq!(bare, TableMapping::new("pharma", "pharma"));
        assert_eq!(bare.to_string(), "pharma=pharma");

        assert!("=demo".parse::<TableMapping>().is_err());
        assert!("demo=".parse::<TableMapping>().is_err());
    }

    #[test]
    fn test_plan_skips_cohort_before_existence_check() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demographics.sas7bdat"), b"").unwrap();

        let mappings = vec![
            TableMapping::new("demographics", "demographics"),
            TableMapping::new("Cohort_A", "does_not_exist"),
        ];
        let planned = plan_tables(dir.path(), &mappings, DEFAULT_EXTENSION).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].table, "demographics");
        assert_eq!(planned[0].source, dir.path().join("demographics.sas7bdat"));
    }

    #[test]
    fn test_plan_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mappings = vec![TableMapping::new("pharma", "pharma.csv")];
        let err = plan_tables(dir.path(), &mappings, DEFAULT_EXTENSION).unwrap_err();
        match err {
            StoreError::FileNotFound { path } => {
                assert_eq!(path, dir.path().join("pharma.sas7bdat"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
