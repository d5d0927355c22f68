//! Materialise SAS7BDAT extracts into a single SQLite database.
//!
//! The [`convert`] entry point resolves a table name → extract file mapping
//! against a source directory, recreates the output database, and streams
//! every non-cohort extract into its own table in fixed-size chunks. The
//! [`inspect`] helpers answer questions about the resulting database.

mod converter;
mod error;
pub mod inspect;
mod mapping;
pub mod sql;
mod table_writer;

pub use converter::{
    ChunkProgress, ConversionReport, ConvertOptions, ConvertProgress, DEFAULT_CHUNK_SIZE,
    NoProgress, TableSummary, convert, convert_with_progress,
};
pub use error::{Result, StoreError};
pub use inspect::{
    REQUIRED_TABLES, TableDimensions, column_names, column_types, list_tables, missing_tables,
    standardize_table_names, standardized_table_name, table_dimensions, table_exists,
    table_row_count, table_schema,
};
pub use mapping::{
    DEFAULT_EXTENSION, PlannedTable, TableMapping, is_cohort_table, normalize_extract_name,
    plan_tables,
};
pub use table_writer::TableWriter;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
