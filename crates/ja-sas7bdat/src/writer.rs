//! SAS7BDAT file writer.
//!
//! Produces 32- or 64-bit files in either byte order, with metadata pages
//! followed by data pages. On request the first rows share the last metadata
//! page as a mix page. With compression enabled every row becomes a row
//! subheader on a metadata page, stored compressed when that is shorter than
//! the raw row. The output is meant for fixtures and round trips; it does not
//! emit every subheader SAS itself writes.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::compress::{rdc_compress, rle_compress};
use crate::dates::{days_since_epoch, seconds_since_epoch};
use crate::encoding::UTF_8_ID;
use crate::error::{Result, Sas7bdatError};
use crate::header::page::{
    COMPRESSION_NONE, COMPRESSION_ROW, ROW_SUBHEADER_TYPE, data_page_row_start,
    mix_page_row_start,
};
use crate::header::subheader::{
    build_column_attributes, build_column_name, build_column_size, build_column_text,
    build_format_and_label, build_row_size,
};
use crate::header::{FileHeader, Layout, PageHeader, PageType, SubheaderPointer, TextBlock};
use crate::types::{
    Bitness, Column, ColumnKind, Compression, Endianness, Sas7bdatDataset, Value, WriterOptions,
};

/// Bit pattern of the standard SAS missing value `.`.
const MISSING_BITS: u64 = 0xFFFF_FE00_0000_0000;
const METADATA_SUBHEADER_TYPE: u8 = 0;

/// SAS7BDAT file writer.
pub struct Sas7bdatWriter<W: Write> {
    writer: BufWriter<W>,
    options: WriterOptions,
}

impl<W: Write> Sas7bdatWriter<W> {
    /// Create a new writer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, WriterOptions::default())
    }

    /// Create a new writer with options.
    pub fn with_options(writer: W, options: WriterOptions) -> Self {
        Self {
            writer: BufWriter::new(writer),
            options,
        }
    }

    /// Write a complete dataset.
    pub fn write_dataset(mut self, dataset: &Sas7bdatDataset) -> Result<()> {
        let layout = Layout::new(self.options.bitness, self.options.endianness);
        let page_size = self.options.page_size;
        if page_size <= data_page_row_start(layout) || page_size > u32::MAX as usize {
            return Err(Sas7bdatError::invalid_format(format!(
                "page size {page_size} is out of range"
            )));
        }

        let columns = assign_offsets(&dataset.columns)?;
        let row_length: usize = columns.iter().map(|column| column.length).sum();
        let rows = encode_rows(&columns, &dataset.rows, row_length, layout.endianness)?;

        let mut metadata = metadata_subheaders(
            layout,
            &columns,
            row_length,
            rows.len(),
            self.options.compression,
            0,
        )?;
        let mix_rows = if self.options.mix_page && self.options.compression == Compression::None {
            mix_page_capacity(layout, page_size, &metadata, row_length)?.min(rows.len())
        } else {
            0
        };
        if mix_rows > 0 {
            metadata = metadata_subheaders(
                layout,
                &columns,
                row_length,
                rows.len(),
                self.options.compression,
                mix_rows,
            )?;
        }

        let mut pages = PageSink::new(layout, page_size);
        for subheader in &metadata {
            pages.push_subheader(subheader, COMPRESSION_NONE, METADATA_SUBHEADER_TYPE)?;
        }
        pages.close_mix_page(&rows[..mix_rows], row_length);

        match self.options.compression {
            Compression::None => pages.push_data_rows(&rows[mix_rows..], row_length)?,
            compression => {
                for row in &rows {
                    let packed = match compression {
                        Compression::Rle => rle_compress(row),
                        _ => rdc_compress(row),
                    };
                    if packed.len() < row.len() {
                        pages.push_subheader(&packed, COMPRESSION_ROW, ROW_SUBHEADER_TYPE)?;
                    } else {
                        pages.push_subheader(row, COMPRESSION_NONE, ROW_SUBHEADER_TYPE)?;
                    }
                }
                pages.close_page();
            }
        }
        let pages = pages.finish();

        let header = FileHeader {
            layout,
            align1: match layout.bitness {
                Bitness::X86 => 0,
                Bitness::X64 => 4,
            },
            encoding_id: UTF_8_ID,
            dataset_name: dataset.name.clone(),
            file_type: "DATA".to_string(),
            created: None,
            modified: None,
            header_length: match layout.bitness {
                Bitness::X86 => 1024,
                Bitness::X64 => 8192,
            },
            page_size,
            page_count: pages.len() as u64,
            sas_release: "9.0401M6".to_string(),
            host: "Linux".to_string(),
        };

        self.writer.write_all(&header.build())?;
        for page in &pages {
            self.writer.write_all(page)?;
        }
        self.writer.flush()?;

        debug!(
            dataset = %dataset.name,
            rows = rows.len(),
            pages = pages.len(),
            mix_rows,
            compression = %self.options.compression,
            "wrote SAS7BDAT file"
        );
        Ok(())
    }
}

impl Sas7bdatWriter<File> {
    /// Create a SAS7BDAT file for writing.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }

    /// Create a SAS7BDAT file with options.
    pub fn create_with_options(path: &Path, options: WriterOptions) -> Result<Self> {
        Ok(Self::with_options(File::create(path)?, options))
    }
}

/// Write a dataset to a SAS7BDAT file.
pub fn write_sas7bdat(path: &Path, dataset: &Sas7bdatDataset) -> Result<()> {
    Sas7bdatWriter::create(path)?.write_dataset(dataset)
}

/// Write a dataset to a SAS7BDAT file with options.
pub fn write_sas7bdat_with_options(
    path: &Path,
    dataset: &Sas7bdatDataset,
    options: &WriterOptions,
) -> Result<()> {
    Sas7bdatWriter::create_with_options(path, options.clone())?.write_dataset(dataset)
}

/// Validate columns and lay them out back to back.
fn assign_offsets(columns: &[Column]) -> Result<Vec<Column>> {
    if columns.is_empty() {
        return Err(Sas7bdatError::invalid_format("dataset has no columns"));
    }
    let mut seen = BTreeSet::new();
    let mut offset = 0usize;
    let mut laid_out = Vec::with_capacity(columns.len());
    for column in columns {
        let name = column.name.trim();
        if name.is_empty() {
            return Err(Sas7bdatError::InvalidColumnName);
        }
        if !seen.insert(name.to_uppercase()) {
            return Err(Sas7bdatError::DuplicateColumn {
                name: column.name.clone(),
            });
        }
        let valid_width = match column.kind {
            ColumnKind::Numeric => (1..=8).contains(&column.length),
            ColumnKind::Character => column.length > 0,
        };
        if !valid_width {
            return Err(Sas7bdatError::unsupported_value(
                &column.name,
                format!("invalid width {}", column.length),
            ));
        }
        laid_out.push(Column {
            name: name.to_string(),
            offset,
            ..column.clone()
        });
        offset += column.length;
    }
    Ok(laid_out)
}

fn encode_rows(
    columns: &[Column],
    rows: &[Vec<Value>],
    row_length: usize,
    endianness: Endianness,
) -> Result<Vec<Vec<u8>>> {
    rows.iter()
        .enumerate()
        .map(|(index, values)| {
            if values.len() != columns.len() {
                return Err(Sas7bdatError::ValueCountMismatch {
                    row: index,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
            let mut row = vec![0u8; row_length];
            for (column, value) in columns.iter().zip(values) {
                let field = &mut row[column.offset..column.offset + column.length];
                encode_value(column, value, field, endianness)?;
            }
            Ok(row)
        })
        .collect()
}

fn encode_value(
    column: &Column,
    value: &Value,
    field: &mut [u8],
    endianness: Endianness,
) -> Result<()> {
    match column.kind {
        ColumnKind::Numeric => {
            let number = match value {
                Value::Missing => f64::from_bits(MISSING_BITS),
                Value::Number(number) => *number,
                Value::Date(date) => days_since_epoch(*date),
                Value::DateTime(datetime) => seconds_since_epoch(*datetime),
                Value::Text(_) => {
                    return Err(Sas7bdatError::unsupported_value(
                        &column.name,
                        "text value in a numeric column",
                    ));
                }
            };
            // Narrow columns keep the most significant bytes.
            let width = field.len();
            match endianness {
                Endianness::Little => field.copy_from_slice(&number.to_le_bytes()[8 - width..]),
                Endianness::Big => field.copy_from_slice(&number.to_be_bytes()[..width]),
            }
        }
        ColumnKind::Character => {
            field.fill(b' ');
            let text = match value {
                Value::Missing => "",
                Value::Text(text) => text.as_str(),
                _ => {
                    return Err(Sas7bdatError::unsupported_value(
                        &column.name,
                        "non-text value in a character column",
                    ));
                }
            };
            let mut end = text.len().min(field.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            field[..end].copy_from_slice(&text.as_bytes()[..end]);
        }
    }
    Ok(())
}

fn metadata_subheaders(
    layout: Layout,
    columns: &[Column],
    row_length: usize,
    row_count: usize,
    compression: Compression,
    mix_page_rows: usize,
) -> Result<Vec<Vec<u8>>> {
    let mut text = TextBlock::new(compression);
    let mut names = Vec::with_capacity(columns.len());
    let mut formats = Vec::with_capacity(columns.len());
    for column in columns {
        names.push(text.push(&column.name)?);
        let format = text.push(column.format.as_deref().unwrap_or(""))?;
        let label = text.push(column.label.as_deref().unwrap_or(""))?;
        formats.push((format, label));
    }

    let mut subheaders = vec![
        build_row_size(
            layout,
            row_length,
            row_count as u64,
            columns.len(),
            mix_page_rows as u64,
        ),
        build_column_size(layout, columns.len()),
        build_column_text(layout, &text.finish(layout)),
        build_column_name(layout, &names),
        build_column_attributes(layout, columns),
    ];
    subheaders.extend(
        formats
            .into_iter()
            .map(|(format, label)| build_format_and_label(layout, format, label)),
    );
    Ok(subheaders)
}

/// Rows that fit after the metadata on its last page.
///
/// Subheader lengths do not depend on the mix row count, so a dry run with
/// the final subheaders gives the page layout the real pass will produce.
fn mix_page_capacity(
    layout: Layout,
    page_size: usize,
    metadata: &[Vec<u8>],
    row_length: usize,
) -> Result<usize> {
    let mut dry_run = PageSink::new(layout, page_size);
    for subheader in metadata {
        dry_run.push_subheader(subheader, COMPRESSION_NONE, METADATA_SUBHEADER_TYPE)?;
    }
    Ok(dry_run.current.as_ref().map_or(0, |page| {
        let start = mix_page_row_start(layout, page.pointers);
        page.data_start.saturating_sub(start) / row_length.max(1)
    }))
}

/// Accumulates pages.
///
/// Subheaders fill a metadata page from the end while their pointers grow
/// from the front.
struct PageSink {
    layout: Layout,
    page_size: usize,
    pages: Vec<Vec<u8>>,
    current: Option<OpenPage>,
}

struct OpenPage {
    bytes: Vec<u8>,
    pointers: usize,
    data_start: usize,
}

impl PageSink {
    fn new(layout: Layout, page_size: usize) -> Self {
        Self {
            layout,
            page_size,
            pages: Vec::new(),
            current: None,
        }
    }

    fn pointer_table_end(&self, pointers: usize) -> usize {
        SubheaderPointer::table_start(self.layout) + pointers * self.layout.pointer_len()
    }

    fn push_subheader(&mut self, body: &[u8], compression: u8, subheader_type: u8) -> Result<()> {
        let available = self.page_size.saturating_sub(self.pointer_table_end(1));
        if body.len() > available {
            return Err(Sas7bdatError::PageOverflow {
                what: "subheader",
                needed: body.len(),
                available,
            });
        }

        let fits = self.current.as_ref().is_some_and(|page| {
            let start = page.data_start.saturating_sub(body.len()) & !7;
            page.data_start >= body.len() && start >= self.pointer_table_end(page.pointers + 1)
        });
        if !fits {
            self.close_page();
            self.current = Some(OpenPage {
                bytes: vec![0u8; self.page_size],
                pointers: 0,
                data_start: self.page_size,
            });
        }

        let layout = self.layout;
        if let Some(page) = self.current.as_mut() {
            let offset = (page.data_start - body.len()) & !7;
            page.bytes[offset..offset + body.len()].copy_from_slice(body);
            SubheaderPointer {
                offset,
                length: body.len(),
                compression,
                subheader_type,
            }
            .write(&mut page.bytes, layout, page.pointers);
            page.pointers += 1;
            page.data_start = offset;
        }
        Ok(())
    }

    fn close_page(&mut self) {
        if let Some(mut page) = self.current.take() {
            PageHeader {
                page_type: PageType::Meta,
                block_count: page.pointers,
                subheader_count: page.pointers,
            }
            .write(&mut page.bytes, self.layout);
            self.pages.push(page.bytes);
        }
    }

    /// Close the open page as a mix page holding `rows`.
    ///
    /// Without rows the page is closed as a plain metadata page.
    fn close_mix_page(&mut self, rows: &[Vec<u8>], row_length: usize) {
        if rows.is_empty() {
            self.close_page();
            return;
        }
        if let Some(mut page) = self.current.take() {
            let start = mix_page_row_start(self.layout, page.pointers);
            for (i, row) in rows.iter().enumerate() {
                let at = start + i * row_length;
                page.bytes[at..at + row_length].copy_from_slice(row);
            }
            PageHeader {
                page_type: PageType::Mix,
                block_count: page.pointers + rows.len(),
                subheader_count: page.pointers,
            }
            .write(&mut page.bytes, self.layout);
            self.pages.push(page.bytes);
        }
    }

    fn push_data_rows(&mut self, rows: &[Vec<u8>], row_length: usize) -> Result<()> {
        let start = data_page_row_start(self.layout);
        let per_page = (self.page_size - start) / row_length;
        if per_page == 0 {
            return Err(Sas7bdatError::PageOverflow {
                what: "row",
                needed: row_length,
                available: self.page_size - start,
            });
        }
        for batch in rows.chunks(per_page) {
            let mut page = vec![0u8; self.page_size];
            PageHeader {
                page_type: PageType::Data,
                block_count: batch.len(),
                subheader_count: 0,
            }
            .write(&mut page, self.layout);
            for (i, row) in batch.iter().enumerate() {
                let at = start + i * row_length;
                page[at..at + row_length].copy_from_slice(row);
            }
            self.pages.push(page);
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.close_page();
        self.pages
    }
}
