//! Reader and writer options.

use encoding_rs::Encoding;

/// Word size of a SAS7BDAT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bitness {
    /// 32-bit layout (4-byte offsets).
    X86,
    /// 64-bit layout (8-byte offsets).
    #[default]
    X64,
}

/// Byte order of a SAS7BDAT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Row compression declared in the column text subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// Run-length encoding (`SASYZCRL`).
    Rle,
    /// Ross Data Compression (`SASYZCR2`).
    Rdc,
}

impl Compression {
    /// Marker stored in the first column text block.
    #[must_use]
    pub const fn literal(self) -> Option<&'static [u8; 8]> {
        match self {
            Self::None => None,
            Self::Rle => Some(b"SASYZCRL"),
            Self::Rdc => Some(b"SASYZCR2"),
        }
    }

    /// Detect the compression marker inside a text block.
    #[must_use]
    pub fn detect(block: &[u8]) -> Self {
        let contains = |needle: &[u8]| block.windows(needle.len()).any(|w| w == needle);
        if contains(b"SASYZCRL") {
            Self::Rle
        } else if contains(b"SASYZCR2") {
            Self::Rdc
        } else {
            Self::None
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Rle => write!(f, "RLE"),
            Self::Rdc => write!(f, "RDC"),
        }
    }
}

/// Options for reading SAS7BDAT files.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Treat blank character values as missing (default: true).
    pub blank_missing: bool,
    /// Decode numeric columns with date or datetime formats (default: true).
    pub convert_dates: bool,
    /// Override the encoding declared in the file header.
    pub encoding: Option<&'static Encoding>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            blank_missing: true,
            convert_dates: true,
            encoding: None,
        }
    }
}

impl ReaderOptions {
    /// Create reader options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep blank character values as empty strings.
    #[must_use]
    pub fn keep_blank_strings(mut self) -> Self {
        self.blank_missing = false;
        self
    }

    /// Return date and datetime columns as raw numbers.
    #[must_use]
    pub fn raw_dates(mut self) -> Self {
        self.convert_dates = false;
        self
    }

    /// Decode character data with a fixed encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Options for writing SAS7BDAT files.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Word size (default: 64-bit).
    pub bitness: Bitness,
    /// Byte order (default: little-endian).
    pub endianness: Endianness,
    /// Page size in bytes (default: 64 KiB).
    pub page_size: usize,
    /// Row compression (default: none).
    pub compression: Compression,
    /// Store the first rows on a mix page after the metadata (default: false).
    ///
    /// Ignored for compressed output, whose rows are subheaders.
    pub mix_page: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            bitness: Bitness::X64,
            endianness: Endianness::Little,
            page_size: 64 * 1024,
            compression: Compression::None,
            mix_page: false,
        }
    }
}

impl WriterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bitness(mut self, bitness: Bitness) -> Self {
        self.bitness = bitness;
        self
    }

    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_mix_page(mut self, mix_page: bool) -> Self {
        self.mix_page = mix_page;
        self
    }
}
