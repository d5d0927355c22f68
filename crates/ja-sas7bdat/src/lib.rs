//! SAS7BDAT file reader with a fixture writer.
//!
//! The reader streams rows page by page and hands them out in bounded
//! chunks that all share one explicit [`Schema`], so callers never hold a
//! whole dataset in memory and never infer column types from the data.
//!
//! # Features
//!
//! - 32- and 64-bit layouts in either byte order
//! - RLE (`SASYZCRL`) and RDC (`SASYZCR2`) compressed rows
//! - Date and datetime formats decoded to [`chrono`] values
//! - Character data decoded with the encoding declared in the header
//! - Optional `rusqlite` integration (with `rusqlite` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use ja_sas7bdat::{Column, Sas7bdatDataset, Sas7bdatReader, Value, write_sas7bdat};
//!
//! let mut ds = Sas7bdatDataset::with_columns(
//!     "PATIENT",
//!     vec![Column::numeric("ID"), Column::character("SEX", 1)],
//! );
//! ds.add_row(vec![Value::Number(1.0), Value::text("F")]);
//! write_sas7bdat(Path::new("patient.sas7bdat"), &ds).unwrap();
//!
//! let mut reader = Sas7bdatReader::open(Path::new("patient.sas7bdat")).unwrap();
//! println!("schema: {}", reader.schema());
//! for chunk in reader.chunks(10_000) {
//!     let chunk = chunk.unwrap();
//!     println!("chunk {} with {} rows", chunk.index, chunk.len());
//! }
//! ```

mod chunk;
pub mod compress;
pub mod dates;
pub mod encoding;
mod error;
pub mod header;
mod reader;
mod row;
mod types;
mod writer;

#[cfg(feature = "rusqlite")]
mod sqlite_ext;

pub use error::{Result, Sas7bdatError};

pub use types::{
    Bitness, Column, ColumnKind, Compression, Endianness, Field, FieldType, ReaderOptions,
    Sas7bdatDataset, Schema, Value, WriterOptions,
};

pub use chunk::{Chunk, Chunks, Rows};
pub use reader::{Metadata, Sas7bdatReader, read_sas7bdat, read_sas7bdat_with_options};
pub use row::decode_number;

pub use writer::{Sas7bdatWriter, write_sas7bdat, write_sas7bdat_with_options};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
