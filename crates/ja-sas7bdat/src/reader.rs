//! SAS7BDAT file reader.
//!
//! The header and metadata pages are parsed when the reader is created.
//! Rows are then decoded lazily, one page at a time, so memory stays
//! bounded by a single page plus whatever the caller keeps.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::chunk::{Chunks, Rows};
use crate::compress::{rdc_decompress, rle_decompress};
use crate::encoding::{encoding_for_id, fallback_encoding, sas_encoding_name};
use crate::error::{Result, Sas7bdatError};
use crate::header::page::{data_page_row_start, mix_page_row_start};
use crate::header::{
    FileHeader, HEADER_PREFIX_LEN, Layout, MetadataBuilder, PageHeader, PageType,
    SubheaderKind, SubheaderPointer, read_bytes,
};
use crate::row::RowDecoder;
use crate::types::{
    Bitness, Column, Compression, Endianness, Field, ReaderOptions, Sas7bdatDataset, Schema,
    Value,
};

/// File-level metadata.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub dataset_name: String,
    pub file_type: String,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub sas_release: String,
    pub host: String,
    pub bitness: Bitness,
    pub endianness: Endianness,
    /// Encoding used to decode character data.
    pub encoding: &'static Encoding,
    /// SAS name of the encoding declared in the header.
    pub declared_encoding: &'static str,
    pub compression: Compression,
    pub header_length: usize,
    pub page_size: usize,
    pub page_count: u64,
    pub row_count: u64,
    pub row_length: usize,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Copy)]
struct RowGeometry {
    row_length: usize,
    row_count: u64,
    mix_page_row_count: u64,
    page_size: usize,
}

#[derive(Debug, Clone, Copy)]
enum RowSlot {
    /// Uncompressed row at an offset in the page.
    Plain(usize),
    /// Row stored as a subheader, compressed when shorter than the row length.
    Packed { offset: usize, length: usize },
}

/// Streaming SAS7BDAT reader.
pub struct Sas7bdatReader<R: Read> {
    reader: BufReader<R>,
    layout: Layout,
    geometry: RowGeometry,
    metadata: Metadata,
    schema: Arc<Schema>,
    decoder: RowDecoder,
    page: Vec<u8>,
    pages_read: u64,
    slots: Vec<RowSlot>,
    next_slot: usize,
    rows_read: u64,
    end_of_file: bool,
    finished: bool,
}

impl<R: Read> Sas7bdatReader<R> {
    /// Create a reader and parse the file metadata.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Create a reader with options and parse the file metadata.
    pub fn with_options(reader: R, options: ReaderOptions) -> Result<Self> {
        let mut reader = BufReader::new(reader);

        let mut header_bytes = vec![0u8; HEADER_PREFIX_LEN];
        read_exact_or(&mut reader, &mut header_bytes, "file too small for a SAS7BDAT header")?;
        let header_length = FileHeader::header_length(&header_bytes)?;
        header_bytes.resize(header_length, 0);
        read_exact_or(
            &mut reader,
            &mut header_bytes[HEADER_PREFIX_LEN..],
            "file header is truncated",
        )?;

        let encoding_id = FileHeader::encoding_id_of(&header_bytes)?;
        let encoding = options
            .encoding
            .or_else(|| encoding_for_id(encoding_id))
            .unwrap_or_else(|| {
                if encoding_id != 0 {
                    warn!(encoding_id, "unknown encoding id, decoding as windows-1252");
                }
                fallback_encoding()
            });
        let header = FileHeader::parse(&header_bytes, encoding)?;
        let layout = header.layout;

        let mut page = vec![0u8; header.page_size];
        let mut pages_read = 0u64;
        let mut builder = MetadataBuilder::new(layout, encoding);
        let mut first_rows: Option<(PageHeader, Vec<RowSlot>)> = None;

        while read_page(&mut reader, &mut page, pages_read)? {
            pages_read += 1;
            let page_header = PageHeader::parse(&page, layout)?;
            let packed = if page_header.page_type.has_subheaders() {
                scan_subheaders(&page, layout, &page_header, Some(&mut builder), Compression::None)?
            } else {
                Vec::new()
            };
            let carries_rows = match page_header.page_type {
                PageType::Data | PageType::Mix => true,
                PageType::Meta | PageType::Meta2 => !packed.is_empty(),
                _ => false,
            };
            if carries_rows {
                first_rows = Some((page_header, packed));
                break;
            }
        }

        let set = builder.finish()?;
        let geometry = RowGeometry {
            row_length: set.row_length,
            row_count: set.row_count,
            mix_page_row_count: set.mix_page_row_count,
            page_size: header.page_size,
        };
        let metadata = Metadata {
            dataset_name: header.dataset_name,
            file_type: header.file_type,
            created: header.created,
            modified: header.modified,
            sas_release: header.sas_release,
            host: header.host,
            bitness: layout.bitness,
            endianness: layout.endianness,
            encoding,
            declared_encoding: sas_encoding_name(encoding_id),
            compression: set.compression,
            header_length: header.header_length,
            page_size: header.page_size,
            page_count: header.page_count,
            row_count: set.row_count,
            row_length: set.row_length,
            columns: set.columns,
        };

        let schema = Arc::new(Schema::new(
            metadata
                .columns
                .iter()
                .map(|column| Field::new(&column.name, column.field_type(options.convert_dates)))
                .collect(),
        ));
        let decoder = RowDecoder::new(
            &metadata.columns,
            layout.endianness,
            encoding,
            options.blank_missing,
            options.convert_dates,
        );

        debug!(
            dataset = %metadata.dataset_name,
            rows = metadata.row_count,
            columns = metadata.columns.len(),
            compression = %metadata.compression,
            encoding = metadata.declared_encoding,
            "parsed SAS7BDAT metadata"
        );

        let end_of_file = first_rows.is_none();
        let slots = match first_rows {
            Some((page_header, packed)) => locate_rows(&page_header, layout, packed, geometry),
            None => Vec::new(),
        };

        Ok(Self {
            reader,
            layout,
            geometry,
            metadata,
            schema,
            decoder,
            page,
            pages_read,
            slots,
            next_slot: 0,
            rows_read: 0,
            end_of_file,
            finished: false,
        })
    }

    /// File-level metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Column definitions in file order.
    pub fn columns(&self) -> &[Column] {
        &self.metadata.columns
    }

    /// Explicit schema shared by every chunk.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Declared number of rows.
    pub fn row_count(&self) -> u64 {
        self.metadata.row_count
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Iterate over rows in chunks of at most `chunk_size` rows.
    pub fn chunks(&mut self, chunk_size: usize) -> Chunks<'_, R> {
        Chunks::new(self, chunk_size)
    }

    /// Iterate over rows one at a time.
    pub fn rows(&mut self) -> Rows<'_, R> {
        Rows::new(self)
    }

    /// Read every remaining row into an in-memory dataset.
    pub fn read_dataset(mut self) -> Result<Sas7bdatDataset> {
        let mut dataset = Sas7bdatDataset::with_columns(
            self.metadata.dataset_name.clone(),
            self.metadata.columns.clone(),
        );
        while let Some(row) = self.next_row()? {
            dataset.add_row(row);
        }
        Ok(dataset)
    }

    /// Decode the next row, or `None` once every row has been read.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            if self.rows_read >= self.metadata.row_count {
                self.finished = true;
                return Ok(None);
            }
            if let Some(slot) = self.slots.get(self.next_slot).copied() {
                self.next_slot += 1;
                let values = self.decode_slot(slot)?;
                self.rows_read += 1;
                return Ok(Some(values));
            }
            if !self.advance_page()? {
                warn!(
                    read = self.rows_read,
                    expected = self.metadata.row_count,
                    "file ended before the declared row count"
                );
                self.finished = true;
                return Ok(None);
            }
        }
    }

    fn advance_page(&mut self) -> Result<bool> {
        if self.end_of_file {
            return Ok(false);
        }
        if !read_page(&mut self.reader, &mut self.page, self.pages_read)? {
            self.end_of_file = true;
            return Ok(false);
        }
        self.pages_read += 1;

        let page_header = PageHeader::parse(&self.page, self.layout)?;
        let packed = if page_header.page_type.has_subheaders() {
            scan_subheaders(
                &self.page,
                self.layout,
                &page_header,
                None,
                self.metadata.compression,
            )?
        } else {
            Vec::new()
        };
        self.slots = locate_rows(&page_header, self.layout, packed, self.geometry);
        self.next_slot = 0;
        Ok(true)
    }

    fn decode_slot(&self, slot: RowSlot) -> Result<Vec<Value>> {
        let row_length = self.metadata.row_length;
        match slot {
            RowSlot::Plain(offset) => self.decoder.decode(read_bytes(&self.page, offset, row_length)?),
            RowSlot::Packed { offset, length } => {
                let raw = read_bytes(&self.page, offset, length)?;
                if length >= row_length {
                    return self.decoder.decode(&raw[..row_length]);
                }
                let expanded = match self.metadata.compression {
                    Compression::Rle => rle_decompress(raw, row_length)?,
                    Compression::Rdc => rdc_decompress(raw, row_length)?,
                    Compression::None => {
                        return Err(Sas7bdatError::invalid_format(
                            "short row subheader in an uncompressed file",
                        ));
                    }
                };
                self.decoder.decode(&expanded)
            }
        }
    }
}

impl Sas7bdatReader<File> {
    /// Open a SAS7BDAT file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Open a SAS7BDAT file with options.
    pub fn open_with_options(path: &Path, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Sas7bdatError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Sas7bdatError::Io(e)
            }
        })?;
        Self::with_options(file, options)
    }
}

/// Read a whole SAS7BDAT file from a path.
pub fn read_sas7bdat(path: &Path) -> Result<Sas7bdatDataset> {
    Sas7bdatReader::open(path)?.read_dataset()
}

/// Read a whole SAS7BDAT file with options.
pub fn read_sas7bdat_with_options(path: &Path, options: ReaderOptions) -> Result<Sas7bdatDataset> {
    Sas7bdatReader::open_with_options(path, options)?.read_dataset()
}

fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], message: &'static str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Sas7bdatError::invalid_format(message)
        } else {
            Sas7bdatError::Io(e)
        }
    })
}

/// Fill `page` from the reader. Returns false at a clean end of file.
fn read_page<R: Read>(reader: &mut R, page: &mut [u8], index: u64) -> Result<bool> {
    let mut filled = 0;
    while filled < page.len() {
        match reader.read(&mut page[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if filled == 0 {
        return Ok(false);
    }
    if filled < page.len() {
        return Err(Sas7bdatError::invalid_format(format!(
            "page {index} is truncated: {filled} of {} bytes",
            page.len()
        )));
    }
    Ok(true)
}

/// Walk the subheader pointers of a page.
///
/// Metadata subheaders are folded into `builder` when one is given.
/// Unrecognised subheaders are rows if the file is compressed.
fn scan_subheaders(
    page: &[u8],
    layout: Layout,
    page_header: &PageHeader,
    mut builder: Option<&mut MetadataBuilder>,
    compression: Compression,
) -> Result<Vec<RowSlot>> {
    let mut packed = Vec::new();
    for index in 0..page_header.subheader_count {
        let pointer = SubheaderPointer::parse(page, layout, index)?;
        if pointer.is_skippable() {
            continue;
        }
        let signature = read_bytes(page, pointer.offset, layout.int_len())?;
        if let Some(kind) = SubheaderKind::from_signature(signature) {
            if let Some(builder) = builder.as_deref_mut() {
                builder.apply(kind, page, &pointer)?;
            }
            continue;
        }

        let compression = builder
            .as_deref()
            .map_or(compression, MetadataBuilder::compression);
        if compression != Compression::None && pointer.is_row_candidate() {
            packed.push(RowSlot::Packed {
                offset: pointer.offset,
                length: pointer.length,
            });
        } else {
            return Err(Sas7bdatError::UnknownSubheader {
                signature: signature.iter().map(|b| format!("{b:02X}")).collect(),
                offset: pointer.offset,
            });
        }
    }
    Ok(packed)
}

/// Row locations on a page.
fn locate_rows(
    page_header: &PageHeader,
    layout: Layout,
    packed: Vec<RowSlot>,
    geometry: RowGeometry,
) -> Vec<RowSlot> {
    let row_length = geometry.row_length;
    match page_header.page_type {
        PageType::Meta | PageType::Meta2 => packed,
        PageType::Data => {
            let start = data_page_row_start(layout);
            (0..page_header.block_count)
                .map(|i| RowSlot::Plain(start + i * row_length))
                .collect()
        }
        PageType::Mix => {
            let start = mix_page_row_start(layout, page_header.subheader_count);
            // Bound a bogus count by the rows that physically fit on the page.
            let fits = geometry
                .page_size
                .saturating_sub(start)
                .checked_div(row_length)
                .unwrap_or(usize::MAX) as u64;
            let count = geometry
                .row_count
                .min(geometry.mix_page_row_count)
                .min(fits);
            (0..count as usize)
                .map(|i| RowSlot::Plain(start + i * row_length))
                .collect()
        }
        _ => Vec::new(),
    }
}
