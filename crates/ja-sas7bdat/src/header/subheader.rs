//! Metadata subheaders.
//!
//! Each subheader starts with a word-sized signature. The reader folds the
//! row size, column size, column text, column name, column attribute and
//! format/label subheaders into a [`MetadataBuilder`]; the writer emits the
//! same set through the `build_*` functions.

use encoding_rs::Encoding;
use tracing::warn;

use super::page::SubheaderPointer;
use super::{Layout, decode_text, read_bytes};
use crate::error::{Result, Sas7bdatError};
use crate::types::{Bitness, Column, ColumnKind, Compression, Endianness};

/// Kind of a metadata subheader, identified by its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubheaderKind {
    RowSize,
    ColumnSize,
    SubheaderCounts,
    ColumnText,
    ColumnName,
    ColumnAttributes,
    FormatAndLabel,
    ColumnList,
}

impl SubheaderKind {
    /// Match a 4- or 8-byte signature in either byte order.
    #[must_use]
    pub fn from_signature(signature: &[u8]) -> Option<Self> {
        let kind = match signature {
            [0xF7, 0xF7, 0xF7, 0xF7]
            | [0x00, 0x00, 0x00, 0x00, 0xF7, 0xF7, 0xF7, 0xF7]
            | [0xF7, 0xF7, 0xF7, 0xF7, 0x00, 0x00, 0x00, 0x00]
            | [0xF7, 0xF7, 0xF7, 0xF7, 0xFF, 0xFF, 0xFB, 0xFE] => Self::RowSize,
            [0xF6, 0xF6, 0xF6, 0xF6]
            | [0x00, 0x00, 0x00, 0x00, 0xF6, 0xF6, 0xF6, 0xF6]
            | [0xF6, 0xF6, 0xF6, 0xF6, 0x00, 0x00, 0x00, 0x00]
            | [0xF6, 0xF6, 0xF6, 0xF6, 0xFF, 0xFF, 0xFB, 0xFE] => Self::ColumnSize,
            [0x00, 0xFC, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFC, 0x00]
            | [0x00, 0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFC, 0x00] => Self::SubheaderCounts,
            [0xFD, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFD]
            | [0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFD] => Self::ColumnText,
            [0xFF, 0xFF, 0xFF, 0xFF] | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF] => {
                Self::ColumnName
            }
            [0xFC, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFC]
            | [0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFC] => Self::ColumnAttributes,
            [0xFE, 0xFB, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFB, 0xFE]
            | [0xFE, 0xFB, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFB, 0xFE] => Self::FormatAndLabel,
            [0xFE, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFE]
            | [0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
            | [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE] => Self::ColumnList,
            _ => return None,
        };
        Some(kind)
    }

    /// Signature written for this kind in the given layout.
    #[must_use]
    pub fn signature(self, layout: Layout) -> Vec<u8> {
        let head: [u8; 4] = match self {
            Self::RowSize => [0xF7, 0xF7, 0xF7, 0xF7],
            Self::ColumnSize => [0xF6, 0xF6, 0xF6, 0xF6],
            Self::SubheaderCounts => [0x00, 0xFC, 0xFF, 0xFF],
            Self::ColumnText => [0xFD, 0xFF, 0xFF, 0xFF],
            Self::ColumnName => [0xFF, 0xFF, 0xFF, 0xFF],
            Self::ColumnAttributes => [0xFC, 0xFF, 0xFF, 0xFF],
            Self::FormatAndLabel => [0xFE, 0xFB, 0xFF, 0xFF],
            Self::ColumnList => [0xFE, 0xFF, 0xFF, 0xFF],
        };
        let mut signature = head.to_vec();
        if layout.bitness == Bitness::X64 {
            let tail = match self {
                Self::RowSize | Self::ColumnSize => [0x00; 4],
                _ => [0xFF; 4],
            };
            signature.extend_from_slice(&tail);
        }
        // Big-endian files store the same word byte-swapped
        if layout.endianness == Endianness::Big {
            signature.reverse();
        }
        signature
    }
}

/// Location of a string inside the column text blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextRef {
    pub index: u16,
    pub offset: u16,
    pub length: u16,
}

#[derive(Debug, Clone, Copy)]
struct Attributes {
    offset: usize,
    length: usize,
    kind: ColumnKind,
}

/// Row geometry and columns collected from the metadata subheaders.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    pub row_length: usize,
    pub row_count: u64,
    pub mix_page_row_count: u64,
    pub compression: Compression,
    pub columns: Vec<Column>,
}

/// Accumulates metadata subheaders in file order.
#[derive(Debug)]
pub struct MetadataBuilder {
    layout: Layout,
    encoding: &'static Encoding,
    row_length: Option<usize>,
    row_count: u64,
    column_count_hint: u64,
    mix_page_row_count: u64,
    column_count: Option<usize>,
    text_blocks: Vec<Vec<u8>>,
    compression: Compression,
    names: Vec<String>,
    attributes: Vec<Attributes>,
    formats: Vec<(Option<String>, Option<String>)>,
}

impl MetadataBuilder {
    #[must_use]
    pub fn new(layout: Layout, encoding: &'static Encoding) -> Self {
        Self {
            layout,
            encoding,
            row_length: None,
            row_count: 0,
            column_count_hint: 0,
            mix_page_row_count: 0,
            column_count: None,
            text_blocks: Vec::new(),
            compression: Compression::None,
            names: Vec::new(),
            attributes: Vec::new(),
            formats: Vec::new(),
        }
    }

    /// Compression declared so far.
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Row geometry, once the row size subheader has been seen.
    #[must_use]
    pub fn row_length(&self) -> Option<usize> {
        self.row_length
    }

    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    #[must_use]
    pub fn mix_page_row_count(&self) -> u64 {
        self.mix_page_row_count
    }

    /// Fold one subheader into the builder.
    pub fn apply(
        &mut self,
        kind: SubheaderKind,
        page: &[u8],
        pointer: &SubheaderPointer,
    ) -> Result<()> {
        // Text blocks may run past the declared length, so only the start is bounded.
        let body = page.get(pointer.offset..).ok_or(Sas7bdatError::Truncated {
            offset: pointer.offset,
            needed: pointer.length,
        })?;
        let length = pointer.length;
        match kind {
            SubheaderKind::RowSize => self.apply_row_size(body),
            SubheaderKind::ColumnSize => self.apply_column_size(body),
            SubheaderKind::ColumnText => self.apply_column_text(body),
            SubheaderKind::ColumnName => self.apply_column_name(body, length),
            SubheaderKind::ColumnAttributes => self.apply_column_attributes(body, length),
            SubheaderKind::FormatAndLabel => self.apply_format_and_label(body),
            SubheaderKind::SubheaderCounts | SubheaderKind::ColumnList => Ok(()),
        }
    }

    fn apply_row_size(&mut self, body: &[u8]) -> Result<()> {
        let layout = self.layout;
        let il = layout.int_len();
        self.row_length = Some(layout.usize_at(body, 5 * il)?);
        self.row_count = layout.int_at(body, 6 * il)?;
        self.column_count_hint = layout
            .int_at(body, 9 * il)?
            .saturating_add(layout.int_at(body, 10 * il)?);
        self.mix_page_row_count = layout.int_at(body, 15 * il)?;
        Ok(())
    }

    fn apply_column_size(&mut self, body: &[u8]) -> Result<()> {
        let count = self.layout.usize_at(body, self.layout.int_len())?;
        self.column_count = Some(count);
        Ok(())
    }

    fn apply_column_text(&mut self, body: &[u8]) -> Result<()> {
        let il = self.layout.int_len();
        let size = usize::from(self.layout.u16_at(body, il)?);
        let block = read_bytes(body, il, size)?.to_vec();
        if self.text_blocks.is_empty() {
            self.compression = Compression::detect(&block);
        }
        self.text_blocks.push(block);
        Ok(())
    }

    fn apply_column_name(&mut self, body: &[u8], length: usize) -> Result<()> {
        let il = self.layout.int_len();
        let count = length.saturating_sub(2 * il + 12) / 8;
        for i in 0..count {
            let base = il + 8 * (i + 1);
            let text = TextRef {
                index: self.layout.u16_at(body, base)?,
                offset: self.layout.u16_at(body, base + 2)?,
                length: self.layout.u16_at(body, base + 4)?,
            };
            let name = self.text(text)?.unwrap_or_default();
            self.names.push(name);
        }
        Ok(())
    }

    fn apply_column_attributes(&mut self, body: &[u8], length: usize) -> Result<()> {
        let il = self.layout.int_len();
        let stride = il + 8;
        let count = length.saturating_sub(2 * il + 12) / stride;
        for i in 0..count {
            let offset = self.layout.usize_at(body, il + 8 + i * stride)?;
            let length = self.layout.u32_at(body, 2 * il + 8 + i * stride)? as usize;
            let kind = match read_bytes(body, 2 * il + 14 + i * stride, 1)?[0] {
                1 => ColumnKind::Numeric,
                _ => ColumnKind::Character,
            };
            self.attributes.push(Attributes {
                offset,
                length,
                kind,
            });
        }
        Ok(())
    }

    fn apply_format_and_label(&mut self, body: &[u8]) -> Result<()> {
        let base = 3 * self.layout.int_len();
        let field = |at: usize| self.layout.u16_at(body, base + at);
        let format = TextRef {
            index: field(22)?,
            offset: field(24)?,
            length: field(26)?,
        };
        let label = TextRef {
            index: field(28)?,
            offset: field(30)?,
            length: field(32)?,
        };
        let format = self.text(format)?;
        let label = self.text(label)?;
        self.formats.push((format, label));
        Ok(())
    }

    /// Resolve a text reference; the block index is clamped to the last block.
    fn text(&self, text: TextRef) -> Result<Option<String>> {
        if text.length == 0 || self.text_blocks.is_empty() {
            return Ok(None);
        }
        let index = usize::from(text.index).min(self.text_blocks.len() - 1);
        let bytes = read_bytes(
            &self.text_blocks[index],
            usize::from(text.offset),
            usize::from(text.length),
        )?;
        let value = decode_text(bytes, self.encoding);
        Ok((!value.is_empty()).then_some(value))
    }

    /// Validate and assemble the column set.
    pub fn finish(self) -> Result<ColumnSet> {
        let row_length = self
            .row_length
            .ok_or_else(|| Sas7bdatError::invalid_format("row size subheader not found"))?;

        if self.names.len() != self.attributes.len() {
            return Err(Sas7bdatError::invalid_format(format!(
                "{} column names but {} column attributes",
                self.names.len(),
                self.attributes.len()
            )));
        }
        if let Some(expected) = self.column_count
            && expected != self.names.len()
        {
            warn!(
                expected,
                found = self.names.len(),
                "column size subheader disagrees with column names"
            );
        }
        if self.column_count_hint != 0 && self.column_count_hint != self.names.len() as u64 {
            warn!(
                expected = self.column_count_hint,
                found = self.names.len(),
                "row size subheader disagrees with column names"
            );
        }

        let mut formats = self.formats.into_iter();
        let mut columns = Vec::with_capacity(self.names.len());
        for (name, attributes) in self.names.into_iter().zip(self.attributes) {
            if attributes.offset + attributes.length > row_length {
                return Err(Sas7bdatError::invalid_format(format!(
                    "column {name} at {}+{} exceeds row length {row_length}",
                    attributes.offset, attributes.length
                )));
            }
            if attributes.kind == ColumnKind::Numeric && !(1..=8).contains(&attributes.length) {
                return Err(Sas7bdatError::invalid_format(format!(
                    "numeric column {name} has width {}",
                    attributes.length
                )));
            }
            let (format, label) = formats.next().unwrap_or((None, None));
            columns.push(Column {
                name,
                label,
                format,
                kind: attributes.kind,
                offset: attributes.offset,
                length: attributes.length,
            });
        }

        Ok(ColumnSet {
            row_length,
            row_count: self.row_count,
            mix_page_row_count: self.mix_page_row_count,
            compression: self.compression,
            columns,
        })
    }
}

/// Offset inside a text block where names start.
const TEXT_DATA_START: usize = 20;
/// Offset inside the first text block where the compression marker sits.
const COMPRESSION_MARKER_OFFSET: usize = 12;

/// Builder for a column text block.
#[derive(Debug, Clone)]
pub struct TextBlock {
    bytes: Vec<u8>,
}

impl TextBlock {
    #[must_use]
    pub fn new(compression: Compression) -> Self {
        let mut bytes = vec![0u8; TEXT_DATA_START];
        if let Some(literal) = compression.literal() {
            bytes[COMPRESSION_MARKER_OFFSET..COMPRESSION_MARKER_OFFSET + literal.len()]
                .copy_from_slice(literal);
        }
        Self { bytes }
    }

    /// Append a string, 4-byte aligned, and return its reference.
    pub fn push(&mut self, text: &str) -> Result<TextRef> {
        if text.is_empty() {
            return Ok(TextRef::default());
        }
        let offset = self.bytes.len();
        let length = text.len();
        self.bytes.extend_from_slice(text.as_bytes());
        let padded = self.bytes.len().next_multiple_of(4);
        self.bytes.resize(padded, 0);
        if self.bytes.len() > usize::from(u16::MAX) {
            return Err(Sas7bdatError::PageOverflow {
                what: "column text",
                needed: self.bytes.len(),
                available: usize::from(u16::MAX),
            });
        }
        Ok(TextRef {
            index: 0,
            offset: offset as u16,
            length: length as u16,
        })
    }

    /// The block with its size prefix filled in.
    #[must_use]
    pub fn finish(mut self, layout: Layout) -> Vec<u8> {
        let size = self.bytes.len() as u16;
        layout.put_u16(&mut self.bytes, 0, size);
        self.bytes
    }
}

fn with_signature(kind: SubheaderKind, layout: Layout, length: usize) -> Vec<u8> {
    let mut body = vec![0u8; length];
    let signature = kind.signature(layout);
    body[..signature.len()].copy_from_slice(&signature);
    body
}

/// Row size subheader.
///
/// `mix_page_rows` is the number of rows stored on the mix page.
#[must_use]
pub fn build_row_size(
    layout: Layout,
    row_length: usize,
    row_count: u64,
    columns: usize,
    mix_page_rows: u64,
) -> Vec<u8> {
    let il = layout.int_len();
    let (length, lcs_offset, lcp_offset) = match layout.bitness {
        Bitness::X86 => (480, 354, 378),
        Bitness::X64 => (808, 682, 706),
    };
    let mut body = with_signature(SubheaderKind::RowSize, layout, length);
    layout.put_int(&mut body, 5 * il, row_length as u64);
    layout.put_int(&mut body, 6 * il, row_count);
    layout.put_int(&mut body, 9 * il, columns as u64);
    layout.put_int(&mut body, 10 * il, 0);
    layout.put_int(&mut body, 15 * il, mix_page_rows);
    layout.put_u16(&mut body, lcs_offset, 0);
    layout.put_u16(&mut body, lcp_offset, 0);
    body
}

/// Column size subheader.
#[must_use]
pub fn build_column_size(layout: Layout, columns: usize) -> Vec<u8> {
    let il = layout.int_len();
    let mut body = with_signature(SubheaderKind::ColumnSize, layout, 3 * il);
    layout.put_int(&mut body, il, columns as u64);
    body
}

/// Column text subheader wrapping a finished text block.
#[must_use]
pub fn build_column_text(layout: Layout, block: &[u8]) -> Vec<u8> {
    let il = layout.int_len();
    let mut body = with_signature(SubheaderKind::ColumnText, layout, il + block.len());
    body[il..].copy_from_slice(block);
    body
}

/// Column name subheader.
#[must_use]
pub fn build_column_name(layout: Layout, names: &[TextRef]) -> Vec<u8> {
    let il = layout.int_len();
    let mut body = with_signature(
        SubheaderKind::ColumnName,
        layout,
        2 * il + 12 + 8 * names.len(),
    );
    for (i, name) in names.iter().enumerate() {
        let base = il + 8 * (i + 1);
        layout.put_u16(&mut body, base, name.index);
        layout.put_u16(&mut body, base + 2, name.offset);
        layout.put_u16(&mut body, base + 4, name.length);
    }
    body
}

/// Column attributes subheader.
#[must_use]
pub fn build_column_attributes(layout: Layout, columns: &[Column]) -> Vec<u8> {
    let il = layout.int_len();
    let stride = il + 8;
    let mut body = with_signature(
        SubheaderKind::ColumnAttributes,
        layout,
        2 * il + 12 + stride * columns.len(),
    );
    for (i, column) in columns.iter().enumerate() {
        layout.put_int(&mut body, il + 8 + i * stride, column.offset as u64);
        layout.put_u32(&mut body, 2 * il + 8 + i * stride, column.length as u32);
        body[2 * il + 14 + i * stride] = match column.kind {
            ColumnKind::Numeric => 1,
            ColumnKind::Character => 2,
        };
    }
    body
}

/// Format and label subheader for one column.
#[must_use]
pub fn build_format_and_label(layout: Layout, format: TextRef, label: TextRef) -> Vec<u8> {
    let base = 3 * layout.int_len();
    let mut body = with_signature(SubheaderKind::FormatAndLabel, layout, base + 40);
    for (at, value) in [
        (22, format.index),
        (24, format.offset),
        (26, format.length),
        (28, label.index),
        (30, label.offset),
        (32, label.length),
    ] {
        layout.put_u16(&mut body, base + at, value);
    }
    body
}
