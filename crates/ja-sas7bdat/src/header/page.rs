//! Page headers and subheader pointers.

use super::Layout;
use crate::error::Result;

/// Subheader stored as-is.
pub const COMPRESSION_NONE: u8 = 0;
/// Subheader truncated by SAS; its content must be ignored.
pub const COMPRESSION_TRUNCATED: u8 = 1;
/// Subheader holding a compressed row.
pub const COMPRESSION_ROW: u8 = 4;
/// Subheader type used for row subheaders.
pub const ROW_SUBHEADER_TYPE: u8 = 1;

const PAGE_TYPE_MASK: u16 = 0xFF00;

/// Page type from the page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Metadata subheaders, possibly with compressed rows.
    Meta,
    /// Secondary metadata page.
    Meta2,
    /// Rows only.
    Data,
    /// Metadata subheaders followed by rows.
    Mix,
    /// Amended page, skipped.
    Amd,
    /// Compression page, skipped.
    Comp,
    Unknown(u16),
}

impl PageType {
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw & PAGE_TYPE_MASK {
            0x0000 => Self::Meta,
            0x4000 => Self::Meta2,
            0x0100 => Self::Data,
            0x0200 => Self::Mix,
            0x0400 => Self::Amd,
            0x9000 => Self::Comp,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            Self::Meta => 0x0000,
            Self::Meta2 => 0x4000,
            Self::Data => 0x0100,
            Self::Mix => 0x0200,
            Self::Amd => 0x0400,
            Self::Comp => 0x9000,
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the page carries subheader pointers worth scanning.
    #[must_use]
    pub const fn has_subheaders(self) -> bool {
        matches!(self, Self::Meta | Self::Meta2 | Self::Mix)
    }
}

/// Fixed fields at the start of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub block_count: usize,
    pub subheader_count: usize,
}

impl PageHeader {
    pub fn parse(page: &[u8], layout: Layout) -> Result<Self> {
        let base = layout.page_bit_offset();
        Ok(Self {
            page_type: PageType::from_raw(layout.u16_at(page, base)?),
            block_count: usize::from(layout.u16_at(page, base + 2)?),
            subheader_count: usize::from(layout.u16_at(page, base + 4)?),
        })
    }

    pub fn write(&self, page: &mut [u8], layout: Layout) {
        let base = layout.page_bit_offset();
        layout.put_u16(page, base, self.page_type.to_raw());
        layout.put_u16(page, base + 2, clamp_u16(self.block_count));
        layout.put_u16(page, base + 4, clamp_u16(self.subheader_count));
    }
}

/// Entry of the subheader pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubheaderPointer {
    pub offset: usize,
    pub length: usize,
    pub compression: u8,
    pub subheader_type: u8,
}

impl SubheaderPointer {
    /// Offset of the first pointer on a page.
    #[must_use]
    pub const fn table_start(layout: Layout) -> usize {
        layout.page_bit_offset() + 8
    }

    pub fn parse(page: &[u8], layout: Layout, index: usize) -> Result<Self> {
        let il = layout.int_len();
        let at = Self::table_start(layout) + index * layout.pointer_len();
        Ok(Self {
            offset: layout.usize_at(page, at)?,
            length: layout.usize_at(page, at + il)?,
            compression: super::read_bytes(page, at + 2 * il, 1)?[0],
            subheader_type: super::read_bytes(page, at + 2 * il + 1, 1)?[0],
        })
    }

    pub fn write(&self, page: &mut [u8], layout: Layout, index: usize) {
        let il = layout.int_len();
        let at = Self::table_start(layout) + index * layout.pointer_len();
        layout.put_int(page, at, self.offset as u64);
        layout.put_int(page, at + il, self.length as u64);
        page[at + 2 * il] = self.compression;
        page[at + 2 * il + 1] = self.subheader_type;
    }

    /// Empty or truncated entries carry nothing to read.
    #[must_use]
    pub const fn is_skippable(&self) -> bool {
        self.length == 0 || self.compression == COMPRESSION_TRUNCATED
    }

    /// Whether an unrecognised subheader is a row in a compressed file.
    #[must_use]
    pub const fn is_row_candidate(&self) -> bool {
        (self.compression == COMPRESSION_ROW || self.compression == COMPRESSION_NONE)
            && self.subheader_type == ROW_SUBHEADER_TYPE
    }
}

/// First row offset on a data page.
#[must_use]
pub const fn data_page_row_start(layout: Layout) -> usize {
    layout.page_bit_offset() + 8
}

/// First row offset on a mix page, after the pointer table and 8-byte alignment.
#[must_use]
pub const fn mix_page_row_start(layout: Layout, subheader_count: usize) -> usize {
    let end = layout.page_bit_offset() + 8 + subheader_count * layout.pointer_len();
    end + end % 8
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
