//! In-memory dataset used by the writer.

use super::{Column, Value};

/// A named set of columns and rows.
#[derive(Debug, Clone, Default)]
pub struct Sas7bdatDataset {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Sas7bdatDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_columns(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Bytes needed to store one row.
    #[must_use]
    pub fn row_length(&self) -> usize {
        self.columns.iter().map(|column| column.length).sum()
    }
}
