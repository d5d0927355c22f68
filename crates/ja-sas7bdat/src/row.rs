//! Decoding of raw rows into values.

use encoding_rs::Encoding;

use crate::dates::{sas_date, sas_datetime};
use crate::header::{read_bytes, trim_padding};
use crate::error::Result;
use crate::types::{Column, Endianness, FieldType, Value};

#[derive(Debug, Clone, Copy)]
struct ColumnPlan {
    offset: usize,
    length: usize,
    field_type: FieldType,
}

/// Decodes rows of a single file.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    plans: Vec<ColumnPlan>,
    endianness: Endianness,
    encoding: &'static Encoding,
    blank_missing: bool,
}

impl RowDecoder {
    pub fn new(
        columns: &[Column],
        endianness: Endianness,
        encoding: &'static Encoding,
        blank_missing: bool,
        convert_dates: bool,
    ) -> Self {
        let plans = columns
            .iter()
            .map(|column| ColumnPlan {
                offset: column.offset,
                length: column.length,
                field_type: column.field_type(convert_dates),
            })
            .collect();
        Self {
            plans,
            endianness,
            encoding,
            blank_missing,
        }
    }

    /// Decode one row.
    pub fn decode(&self, row: &[u8]) -> Result<Vec<Value>> {
        self.plans
            .iter()
            .map(|plan| {
                let bytes = read_bytes(row, plan.offset, plan.length)?;
                Ok(match plan.field_type {
                    FieldType::Text => self.decode_text(bytes),
                    FieldType::Number => {
                        decode_number(bytes, self.endianness).map_or(Value::Missing, Value::Number)
                    }
                    FieldType::Date => decode_number(bytes, self.endianness)
                        .and_then(sas_date)
                        .map_or(Value::Missing, Value::Date),
                    FieldType::DateTime => decode_number(bytes, self.endianness)
                        .and_then(sas_datetime)
                        .map_or(Value::Missing, Value::DateTime),
                })
            })
            .collect()
    }

    fn decode_text(&self, bytes: &[u8]) -> Value {
        let trimmed = trim_padding(bytes);
        if trimmed.is_empty() && self.blank_missing {
            return Value::Missing;
        }
        let (text, _) = self.encoding.decode_without_bom_handling(trimmed);
        Value::Text(text.into_owned())
    }
}

/// Widen a 1..=8 byte numeric field to f64; NaN (any SAS missing) yields `None`.
#[must_use]
pub fn decode_number(bytes: &[u8], endianness: Endianness) -> Option<f64> {
    let width = bytes.len().min(8);
    let mut buf = [0u8; 8];
    let value = match endianness {
        Endianness::Little => {
            buf[8 - width..].copy_from_slice(&bytes[bytes.len() - width..]);
            f64::from_le_bytes(buf)
        }
        Endianness::Big => {
            buf[..width].copy_from_slice(&bytes[..width]);
            f64::from_be_bytes(buf)
        }
    };
    (!value.is_nan()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_decode_number_widths() {
        let full = 1234.5f64.to_le_bytes();
        assert_eq!(decode_number(&full, Endianness::Little), Some(1234.5));

        // Truncated to the 5 most significant bytes
        let truncated = &full[3..];
        assert_eq!(decode_number(truncated, Endianness::Little), Some(1234.5));

        let be = 42.0f64.to_be_bytes();
        assert_eq!(decode_number(&be[..4], Endianness::Big), Some(42.0));
    }

    #[test]
    fn test_decode_number_missing() {
        let missing = f64::from_bits(0xFFFF_FE00_0000_0000).to_le_bytes();
        assert_eq!(decode_number(&missing, Endianness::Little), None);
    }

    #[test]
    fn test_decode_row() {
        let columns = vec![
            Column {
                offset: 0,
                ..Column::numeric("BIRTH").with_format("DATE")
            },
            Column {
                offset: 8,
                ..Column::character("SEX", 4)
            },
            Column {
                offset: 12,
                ..Column::character("NOTE", 3)
            },
        ];
        let mut row = Vec::new();
        row.extend_from_slice(&21915.0f64.to_le_bytes());
        row.extend_from_slice(b"F   ");
        row.extend_from_slice(b"   ");

        let decoder = RowDecoder::new(
            &columns,
            Endianness::Little,
            encoding_rs::UTF_8,
            true,
            true,
        );
        let values = decoder.decode(&row).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
                Value::text("F"),
                Value::Missing,
            ]
        );

        let keep_blank = RowDecoder::new(
            &columns,
            Endianness::Little,
            encoding_rs::UTF_8,
            false,
            false,
        );
        let values = keep_blank.decode(&row).unwrap();
        assert_eq!(values[0], Value::Number(21915.0));
        assert_eq!(values[2], Value::text(""));
    }

    #[test]
    fn test_decode_short_row_fails() {
        let columns = vec![Column::numeric("AGE")];
        let decoder = RowDecoder::new(
            &columns,
            Endianness::Little,
            encoding_rs::UTF_8,
            true,
            true,
        );
        assert!(decoder.decode(&[0u8; 4]).is_err());
    }
}
