//! Chunked iteration over a reader.

use std::io::Read;
use std::sync::Arc;

use crate::error::Result;
use crate::reader::Sas7bdatReader;
use crate::types::{Schema, Value};

/// A batch of consecutive rows sharing the file schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Zero-based position of this chunk in the file.
    pub index: usize,
    /// Zero-based index of the first row in the chunk.
    pub first_row: u64,
    pub schema: Arc<Schema>,
    pub rows: Vec<Vec<Value>>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Iterator yielding rows in chunks of at most `chunk_size`.
///
/// Every chunk except possibly the last is full. Iteration stops after
/// the first error.
pub struct Chunks<'a, R: Read> {
    reader: &'a mut Sas7bdatReader<R>,
    chunk_size: usize,
    index: usize,
    failed: bool,
}

impl<'a, R: Read> Chunks<'a, R> {
    pub(crate) fn new(reader: &'a mut Sas7bdatReader<R>, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            index: 0,
            failed: false,
        }
    }
}

impl<R: Read> Iterator for Chunks<'_, R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let first_row = self.reader.rows_read();
        let remaining = self.reader.row_count().saturating_sub(first_row);
        let capacity = usize::try_from(remaining)
            .unwrap_or(usize::MAX)
            .min(self.chunk_size);
        let mut rows = Vec::with_capacity(capacity);

        while rows.len() < self.chunk_size {
            match self.reader.next_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        if rows.is_empty() {
            return None;
        }

        let chunk = Chunk {
            index: self.index,
            first_row,
            schema: Arc::clone(self.reader.schema()),
            rows,
        };
        self.index += 1;
        Some(Ok(chunk))
    }
}

/// Iterator over single rows.
pub struct Rows<'a, R: Read> {
    reader: &'a mut Sas7bdatReader<R>,
    failed: bool,
}

impl<'a, R: Read> Rows<'a, R> {
    pub(crate) fn new(reader: &'a mut Sas7bdatReader<R>) -> Self {
        Self {
            reader,
            failed: false,
        }
    }
}

impl<R: Read> Iterator for Rows<'_, R> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_row() {
            Ok(row) => row.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
