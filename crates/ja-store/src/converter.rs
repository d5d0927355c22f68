//! Extract directory → SQLite conversion.
//!
//! Any existing output database is deleted first, so a run that fails on a
//! missing extract leaves no stale database behind. Mapping entries are then
//! resolved and each extract is streamed into its table chunk by chunk,
//! committing after every chunk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ja_sas7bdat::{ReaderOptions, Sas7bdatReader};
use rusqlite::Connection;
use tracing::{debug, info, info_span};

use crate::error::{Result, StoreError};
use crate::mapping::{DEFAULT_EXTENSION, PlannedTable, TableMapping, plan_tables};
use crate::table_writer::TableWriter;

/// Rows per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Conversion settings.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Rows read and committed at a time (default: 10,000).
    pub chunk_size: usize,
    /// Expected extract extension (default: `.sas7bdat`).
    pub extension: String,
    pub reader: ReaderOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            extension: DEFAULT_EXTENSION.to_string(),
            reader: ReaderOptions::default(),
        }
    }
}

impl ConvertOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_reader_options(mut self, reader: ReaderOptions) -> Self {
        self.reader = reader;
        self
    }
}

/// Progress after a committed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkProgress<'a> {
    pub table: &'a str,
    pub chunk_index: usize,
    pub rows_in_chunk: usize,
    /// Rows committed to the table so far.
    pub rows_written: u64,
    /// Size of the output database file after the commit.
    pub database_bytes: u64,
}

/// Outcome for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub table: String,
    pub source: PathBuf,
    pub columns: usize,
    pub rows: u64,
    pub chunks: usize,
}

/// Outcome of a whole conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub tables: Vec<TableSummary>,
    pub database_bytes: u64,
}

impl ConversionReport {
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|table| table.rows).sum()
    }
}

/// Observer for conversion progress. Every method defaults to a no-op.
pub trait ConvertProgress {
    fn on_table_start(&mut self, _table: &str, _source: &Path, _total_rows: u64) {}

    fn on_chunk(&mut self, _progress: &ChunkProgress<'_>) {}

    fn on_table_finish(&mut self, _summary: &TableSummary) {}
}

/// Progress observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ConvertProgress for NoProgress {}

/// Convert the mapped extracts in `source_dir` into a fresh database at `output`.
pub fn convert(
    source_dir: &Path,
    mappings: &[TableMapping],
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    convert_with_progress(source_dir, mappings, output, options, &mut NoProgress)
}

/// [`convert`] with a progress observer.
pub fn convert_with_progress(
    source_dir: &Path,
    mappings: &[TableMapping],
    output: &Path,
    options: &ConvertOptions,
    progress: &mut dyn ConvertProgress,
) -> Result<ConversionReport> {
    remove_existing(output)?;
    let planned = plan_tables(source_dir, mappings, &options.extension)?;
    info!(
        source = %source_dir.display(),
        output = %output.display(),
        tables = planned.len(),
        skipped = mappings.len() - planned.len(),
        "starting conversion"
    );

    let mut conn = Connection::open(output)?;

    let mut tables = Vec::with_capacity(planned.len());
    for entry in &planned {
        let summary = convert_table(&mut conn, entry, output, options, progress)?;
        tables.push(summary);
    }
    conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;

    let report = ConversionReport {
        output: output.to_path_buf(),
        database_bytes: file_size(output),
        tables,
    };
    info!(
        tables = report.tables.len(),
        rows = report.total_rows(),
        bytes = report.database_bytes,
        "conversion finished"
    );
    Ok(report)
}

fn convert_table(
    conn: &mut Connection,
    entry: &PlannedTable,
    output: &Path,
    options: &ConvertOptions,
    progress: &mut dyn ConvertProgress,
) -> Result<TableSummary> {
    let span = info_span!("table", table = %entry.table);
    let _guard = span.enter();

    let mut reader = Sas7bdatReader::open_with_options(&entry.source, options.reader.clone())
        .map_err(|err| StoreError::extract(&entry.source, err))?;
    let schema = Arc::clone(reader.schema());
    info!(
        source = %entry.source.display(),
        rows = reader.row_count(),
        columns = schema.len(),
        "reading extract"
    );
    progress.on_table_start(&entry.table, &entry.source, reader.row_count());

    let mut writer = TableWriter::create(conn, &entry.table, Arc::clone(&schema))?;
    for chunk in reader.chunks(options.chunk_size) {
        let chunk = chunk.map_err(|err| StoreError::extract(&entry.source, err))?;
        let rows_in_chunk = writer.append(&chunk)?;
        let update = ChunkProgress {
            table: &entry.table,
            chunk_index: chunk.index,
            rows_in_chunk,
            rows_written: writer.rows_written(),
            database_bytes: file_size(output),
        };
        debug!(
            chunk = update.chunk_index,
            rows = update.rows_in_chunk,
            written = update.rows_written,
            bytes = update.database_bytes,
            "committed chunk"
        );
        progress.on_chunk(&update);
    }

    let summary = TableSummary {
        table: entry.table.clone(),
        source: entry.source.clone(),
        columns: schema.len(),
        rows: writer.rows_written(),
        chunks: writer.chunks_written(),
    };
    info!(rows = summary.rows, chunks = summary.chunks, "table written");
    progress.on_table_finish(&summary);
    Ok(summary)
}

fn remove_existing(output: &Path) -> Result<()> {
    match fs::remove_file(output) {
        Ok(()) => {
            debug!(output = %output.display(), "removed existing database");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::io("remove", output, err)),
    }
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or_default()
}
