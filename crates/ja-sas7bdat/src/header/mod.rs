//! SAS7BDAT header, page and subheader layout.
//!
//! A SAS7BDAT file is a file header followed by fixed-size pages:
//! - The file header carries the magic number, word size, byte order,
//!   character encoding, dataset name and the page geometry
//! - Every page starts with a page header and a table of subheader pointers
//! - Metadata subheaders describe rows and columns; rows live on data or
//!   mix pages, or as compressed row subheaders on metadata pages

pub mod page;
pub mod subheader;

use chrono::NaiveDateTime;
use encoding_rs::Encoding;

use crate::dates::{sas_datetime, seconds_since_epoch};
use crate::error::{Result, Sas7bdatError};
use crate::types::{Bitness, Endianness};

pub use page::{PageHeader, PageType, SubheaderPointer};
pub use subheader::{MetadataBuilder, SubheaderKind, TextBlock, TextRef};

/// Magic number at the start of every SAS7BDAT file.
pub const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

/// Bytes needed to locate the full header length.
pub const HEADER_PREFIX_LEN: usize = 288;

const ALIGN_MARKER: u8 = 0x33;
const WORD_SIZE_OFFSET: usize = 32;
const ALIGN_OFFSET: usize = 35;
const ENDIANNESS_OFFSET: usize = 37;
const PLATFORM_OFFSET: usize = 39;
const ENCODING_OFFSET: usize = 70;
const DATASET_NAME_OFFSET: usize = 92;
const DATASET_NAME_LEN: usize = 64;
const FILE_TYPE_OFFSET: usize = 156;
const FILE_TYPE_LEN: usize = 8;
const CREATED_OFFSET: usize = 164;
const MODIFIED_OFFSET: usize = 172;
const HEADER_LENGTH_OFFSET: usize = 196;
const PAGE_SIZE_OFFSET: usize = 200;
const PAGE_COUNT_OFFSET: usize = 204;
const SAS_RELEASE_OFFSET: usize = 216;
const SAS_RELEASE_LEN: usize = 8;
const HOST_OFFSET: usize = 224;
const HOST_LEN: usize = 16;

/// Word size and byte order of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub bitness: Bitness,
    pub endianness: Endianness,
}

impl Layout {
    #[must_use]
    pub const fn new(bitness: Bitness, endianness: Endianness) -> Self {
        Self {
            bitness,
            endianness,
        }
    }

    /// Width of offsets, lengths and counts.
    #[must_use]
    pub const fn int_len(self) -> usize {
        match self.bitness {
            Bitness::X86 => 4,
            Bitness::X64 => 8,
        }
    }

    /// Offset of the page header within a page.
    #[must_use]
    pub const fn page_bit_offset(self) -> usize {
        match self.bitness {
            Bitness::X86 => 16,
            Bitness::X64 => 32,
        }
    }

    /// Size of one subheader pointer.
    #[must_use]
    pub const fn pointer_len(self) -> usize {
        match self.bitness {
            Bitness::X86 => 12,
            Bitness::X64 => 24,
        }
    }

    pub fn u16_at(self, data: &[u8], offset: usize) -> Result<u16> {
        let bytes: [u8; 2] = fixed(data, offset)?;
        Ok(match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn u32_at(self, data: &[u8], offset: usize) -> Result<u32> {
        let bytes: [u8; 4] = fixed(data, offset)?;
        Ok(match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn u64_at(self, data: &[u8], offset: usize) -> Result<u64> {
        let bytes: [u8; 8] = fixed(data, offset)?;
        Ok(match self.endianness {
            Endianness::Little => u64::from_le_bytes(bytes),
            Endianness::Big => u64::from_be_bytes(bytes),
        })
    }

    pub fn f64_at(self, data: &[u8], offset: usize) -> Result<f64> {
        let bytes: [u8; 8] = fixed(data, offset)?;
        Ok(match self.endianness {
            Endianness::Little => f64::from_le_bytes(bytes),
            Endianness::Big => f64::from_be_bytes(bytes),
        })
    }

    /// Read a word-sized unsigned integer.
    pub fn int_at(self, data: &[u8], offset: usize) -> Result<u64> {
        match self.bitness {
            Bitness::X86 => self.u32_at(data, offset).map(u64::from),
            Bitness::X64 => self.u64_at(data, offset),
        }
    }

    /// Read a word-sized integer that addresses memory.
    pub fn usize_at(self, data: &[u8], offset: usize) -> Result<usize> {
        let value = self.int_at(data, offset)?;
        usize::try_from(value)
            .map_err(|_| Sas7bdatError::invalid_format(format!("value {value} overflows usize")))
    }

    pub fn put_u16(self, buf: &mut [u8], offset: usize, value: u16) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        buf[offset..offset + 2].copy_from_slice(&bytes);
    }

    pub fn put_u32(self, buf: &mut [u8], offset: usize, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        buf[offset..offset + 4].copy_from_slice(&bytes);
    }

    pub fn put_f64(self, buf: &mut [u8], offset: usize, value: f64) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        buf[offset..offset + 8].copy_from_slice(&bytes);
    }

    /// Write a word-sized unsigned integer.
    pub fn put_int(self, buf: &mut [u8], offset: usize, value: u64) {
        match self.bitness {
            Bitness::X86 => {
                let narrowed = u32::try_from(value).unwrap_or(u32::MAX);
                self.put_u32(buf, offset, narrowed);
            }
            Bitness::X64 => {
                let bytes = match self.endianness {
                    Endianness::Little => value.to_le_bytes(),
                    Endianness::Big => value.to_be_bytes(),
                };
                buf[offset..offset + 8].copy_from_slice(&bytes);
            }
        }
    }
}

/// Borrow `len` bytes at `offset`, failing instead of panicking.
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(Sas7bdatError::Truncated {
            offset,
            needed: len,
        })
}

fn fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let bytes = read_bytes(data, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Strip trailing NUL and space padding.
pub fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != 0 && *b != b' ')
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}

/// Decode padded header text with the given encoding.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(trim_padding(bytes));
    text.into_owned()
}

/// Parsed file header.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub layout: Layout,
    /// Extra alignment applied to the timestamp and geometry fields.
    pub align1: usize,
    pub encoding_id: u8,
    pub dataset_name: String,
    pub file_type: String,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub header_length: usize,
    pub page_size: usize,
    pub page_count: u64,
    pub sas_release: String,
    pub host: String,
}

impl FileHeader {
    /// Validate the magic number and read the full header length.
    pub fn header_length(prefix: &[u8]) -> Result<usize> {
        check_magic(prefix)?;
        let (layout, align1) = detect_layout(prefix)?;
        let length = layout.u32_at(prefix, HEADER_LENGTH_OFFSET + align1)? as usize;
        if length < HEADER_PREFIX_LEN {
            return Err(Sas7bdatError::invalid_format(format!(
                "header length {length} is shorter than {HEADER_PREFIX_LEN} bytes"
            )));
        }
        Ok(length)
    }

    /// Parse the full header.
    pub fn parse(data: &[u8], encoding: &'static Encoding) -> Result<Self> {
        check_magic(data)?;
        let (layout, align1) = detect_layout(data)?;
        let align2 = match layout.bitness {
            Bitness::X86 => 0,
            Bitness::X64 => 4,
        };
        let total_align = align1 + align2;

        let encoding_id = read_bytes(data, ENCODING_OFFSET, 1)?[0];
        let dataset_name = decode_text(
            read_bytes(data, DATASET_NAME_OFFSET, DATASET_NAME_LEN)?,
            encoding,
        );
        let file_type = decode_text(read_bytes(data, FILE_TYPE_OFFSET, FILE_TYPE_LEN)?, encoding);
        let created = sas_datetime(layout.f64_at(data, CREATED_OFFSET + align1)?);
        let modified = sas_datetime(layout.f64_at(data, MODIFIED_OFFSET + align1)?);
        let header_length = layout.u32_at(data, HEADER_LENGTH_OFFSET + align1)? as usize;
        let page_size = layout.u32_at(data, PAGE_SIZE_OFFSET + align1)? as usize;
        let page_count = layout.int_at(data, PAGE_COUNT_OFFSET + align1)?;
        let sas_release = decode_text(
            read_bytes(data, SAS_RELEASE_OFFSET + total_align, SAS_RELEASE_LEN)?,
            encoding,
        );
        let host = decode_text(
            read_bytes(data, HOST_OFFSET + total_align, HOST_LEN)?,
            encoding,
        );

        if page_size <= layout.page_bit_offset() + 8 {
            return Err(Sas7bdatError::invalid_format(format!(
                "page size {page_size} is too small"
            )));
        }

        Ok(Self {
            layout,
            align1,
            encoding_id,
            dataset_name,
            file_type,
            created,
            modified,
            header_length,
            page_size,
            page_count,
            sas_release,
            host,
        })
    }

    /// Encoding id stored at byte 70 of the header.
    pub fn encoding_id_of(data: &[u8]) -> Result<u8> {
        Ok(read_bytes(data, ENCODING_OFFSET, 1)?[0])
    }

    /// Serialize the header into `header_length` bytes.
    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout;
        let mut buf = vec![0u8; self.header_length];
        buf[..MAGIC.len()].copy_from_slice(&MAGIC);

        let (word_marker, align1, align2) = match layout.bitness {
            Bitness::X86 => (0x32, 0, 0),
            Bitness::X64 => (ALIGN_MARKER, 4, 4),
        };
        buf[WORD_SIZE_OFFSET] = word_marker;
        buf[ALIGN_OFFSET] = word_marker;
        buf[ENDIANNESS_OFFSET] = match layout.endianness {
            Endianness::Little => 0x01,
            Endianness::Big => 0x00,
        };
        buf[PLATFORM_OFFSET] = b'1';
        buf[ENCODING_OFFSET] = self.encoding_id;

        put_padded(&mut buf, DATASET_NAME_OFFSET, DATASET_NAME_LEN, &self.dataset_name);
        put_padded(&mut buf, FILE_TYPE_OFFSET, FILE_TYPE_LEN, &self.file_type);

        let created = self.created.map_or(0.0, seconds_since_epoch);
        let modified = self.modified.map_or(0.0, seconds_since_epoch);
        layout.put_f64(&mut buf, CREATED_OFFSET + align1, created);
        layout.put_f64(&mut buf, MODIFIED_OFFSET + align1, modified);

        let header_length = u32::try_from(self.header_length).unwrap_or(u32::MAX);
        let page_size = u32::try_from(self.page_size).unwrap_or(u32::MAX);
        layout.put_u32(&mut buf, HEADER_LENGTH_OFFSET + align1, header_length);
        layout.put_u32(&mut buf, PAGE_SIZE_OFFSET + align1, page_size);
        layout.put_int(&mut buf, PAGE_COUNT_OFFSET + align1, self.page_count);

        let total_align = align1 + align2;
        put_padded(
            &mut buf,
            SAS_RELEASE_OFFSET + total_align,
            SAS_RELEASE_LEN,
            &self.sas_release,
        );
        put_padded(&mut buf, HOST_OFFSET + total_align, HOST_LEN, &self.host);
        buf
    }
}

fn check_magic(data: &[u8]) -> Result<()> {
    let magic = read_bytes(data, 0, MAGIC.len())
        .map_err(|_| Sas7bdatError::invalid_format("file too small for a SAS7BDAT header"))?;
    if magic != MAGIC {
        return Err(Sas7bdatError::invalid_format("magic number mismatch"));
    }
    Ok(())
}

fn detect_layout(data: &[u8]) -> Result<(Layout, usize)> {
    let bitness = if read_bytes(data, WORD_SIZE_OFFSET, 1)?[0] == ALIGN_MARKER {
        Bitness::X64
    } else {
        Bitness::X86
    };
    let align1 = if read_bytes(data, ALIGN_OFFSET, 1)?[0] == ALIGN_MARKER {
        4
    } else {
        0
    };
    let endianness = if read_bytes(data, ENDIANNESS_OFFSET, 1)?[0] == 0x01 {
        Endianness::Little
    } else {
        Endianness::Big
    };
    Ok((Layout::new(bitness, endianness), align1))
}

fn put_padded(buf: &mut [u8], offset: usize, len: usize, text: &str) {
    let field = &mut buf[offset..offset + len];
    field.fill(b' ');
    let bytes = text.as_bytes();
    let n = bytes.len().min(len);
    field[..n].copy_from_slice(&bytes[..n]);
}
