//! Core types for SAS7BDAT handling.
//!
//! This module provides the data structures for columns, values, the
//! explicit schema shared by row chunks, and reader/writer options.

mod column;
mod dataset;
mod options;
mod schema;
mod value;

pub use column::{Column, ColumnKind};
pub use dataset::Sas7bdatDataset;
pub use options::{Bitness, Compression, Endianness, ReaderOptions, WriterOptions};
pub use schema::{Field, FieldType, Schema};
pub use value::Value;
