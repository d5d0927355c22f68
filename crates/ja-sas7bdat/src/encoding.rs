//! Character encodings declared in the file header.

use encoding_rs::{
    BIG5, EUC_JP, EUC_KR, Encoding, GBK, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5,
    ISO_8859_6, ISO_8859_7, ISO_8859_8, ISO_8859_10, ISO_8859_15, SHIFT_JIS, UTF_8, WINDOWS_874,
    WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255,
    WINDOWS_1256, WINDOWS_1257, WINDOWS_1258,
};

/// Encoding id written by this crate.
pub const UTF_8_ID: u8 = 20;

/// Encoding used when the header id is unset or unknown.
#[must_use]
pub fn fallback_encoding() -> &'static Encoding {
    WINDOWS_1252
}

/// Map a header encoding id to a decoder.
#[must_use]
pub fn encoding_for_id(id: u8) -> Option<&'static Encoding> {
    let encoding = match id {
        20 => UTF_8,
        28 | 29 | 62 => WINDOWS_1252,
        30 => ISO_8859_2,
        31 => ISO_8859_3,
        32 => ISO_8859_4,
        33 => ISO_8859_5,
        34 => ISO_8859_6,
        35 => ISO_8859_7,
        36 => ISO_8859_8,
        37 | 64 => WINDOWS_1254,
        38 => ISO_8859_10,
        39 => WINDOWS_874,
        40 => ISO_8859_15,
        60 => WINDOWS_1250,
        61 => WINDOWS_1251,
        63 => WINDOWS_1253,
        65 => WINDOWS_1255,
        66 => WINDOWS_1256,
        67 => WINDOWS_1257,
        68 => WINDOWS_1258,
        123 => BIG5,
        125 => GBK,
        134 => EUC_JP,
        138 => SHIFT_JIS,
        140 => EUC_KR,
        _ => return None,
    };
    Some(encoding)
}

/// SAS name of a header encoding id.
#[must_use]
pub fn sas_encoding_name(id: u8) -> &'static str {
    match id {
        0 => "default",
        20 => "utf-8",
        28 => "us-ascii",
        29 => "latin1",
        30 => "latin2",
        31 => "latin3",
        32 => "latin4",
        33 => "cyrillic",
        34 => "arabic",
        35 => "greek",
        36 => "hebrew",
        37 => "latin5",
        38 => "latin6",
        39 => "thai",
        40 => "latin9",
        60 => "wlatin2",
        61 => "wcyrillic",
        62 => "wlatin1",
        63 => "wgreek",
        64 => "wturkish",
        65 => "whebrew",
        66 => "warabic",
        67 => "wbaltic",
        68 => "wvietnamese",
        123 => "big5",
        125 => "euc-cn",
        134 => "euc-jp",
        138 => "shift-jis",
        140 => "euc-kr",
        _ => "unknown",
    }
}
