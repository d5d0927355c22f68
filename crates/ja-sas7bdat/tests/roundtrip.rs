//! Write-then-read tests for SAS7BDAT files.

use std::io::Cursor;

use chrono::NaiveDate;
use ja_sas7bdat::{
    Bitness, Column, Compression, Endianness, FieldType, ReaderOptions, Sas7bdatDataset,
    Sas7bdatError, Sas7bdatReader, Sas7bdatWriter, Value, WriterOptions, read_sas7bdat,
    write_sas7bdat,
};

fn write_to_vec(dataset: &Sas7bdatDataset, options: WriterOptions) -> Vec<u8> {
    let mut buffer = Vec::new();
    Sas7bdatWriter::with_options(Cursor::new(&mut buffer), options)
        .write_dataset(dataset)
        .unwrap();
    buffer
}

fn roundtrip(dataset: &Sas7bdatDataset, options: WriterOptions) -> Sas7bdatDataset {
    let buffer = write_to_vec(dataset, options);
    Sas7bdatReader::new(Cursor::new(buffer))
        .unwrap()
        .read_dataset()
        .unwrap()
}

fn patients() -> Sas7bdatDataset {
    let mut dataset = Sas7bdatDataset::with_columns(
        "PATIENT",
        vec![
            Column::numeric("ID").with_label("Patient ID"),
            Column::character("SEX", 1),
            Column::numeric("BIRTH").with_format("DATE"),
            Column::character("NOTE", 40),
        ],
    );
    let birth = NaiveDate::from_ymd_opt(1984, 3, 9).unwrap();
    dataset.add_row(vec![
        Value::Number(1.0),
        Value::text("F"),
        Value::Date(birth),
        Value::text("first visit"),
    ]);
    dataset.add_row(vec![
        Value::Number(2.0),
        Value::text("M"),
        Value::Missing,
        Value::Missing,
    ]);
    dataset.add_row(vec![
        Value::Missing,
        Value::text("F"),
        Value::Date(birth),
        Value::text("x"),
    ]);
    dataset
}

#[test]
fn test_roundtrip_x64_and_x86() {
    let dataset = patients();
    for bitness in [Bitness::X64, Bitness::X86] {
        let read_back = roundtrip(&dataset, WriterOptions::new().with_bitness(bitness));
        assert_eq!(read_back.name, "PATIENT");
        assert_eq!(read_back.columns.len(), 4);
        assert_eq!(read_back.columns[0].label.as_deref(), Some("Patient ID"));
        assert_eq!(read_back.columns[2].format.as_deref(), Some("DATE"));
        assert_eq!(read_back.columns[3].offset, 17);
        assert_eq!(read_back.rows, dataset.rows, "bitness {bitness:?}");
    }
}

#[test]
fn test_metadata_and_schema() {
    let buffer = write_to_vec(&patients(), WriterOptions::new());
    let reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();

    let metadata = reader.metadata();
    assert_eq!(metadata.row_count, 3);
    assert_eq!(metadata.row_length, 57);
    assert_eq!(metadata.compression, Compression::None);
    assert_eq!(metadata.declared_encoding, "utf-8");
    assert_eq!(metadata.file_type, "DATA");

    assert_eq!(reader.schema().to_string(), "[ID: number, SEX: text, BIRTH: date, NOTE: text]");
    assert_eq!(reader.schema().fields()[2].field_type, FieldType::Date);
}

#[test]
fn test_raw_dates_and_blank_strings() {
    let buffer = write_to_vec(&patients(), WriterOptions::new());
    let options = ReaderOptions::new().raw_dates().keep_blank_strings();
    let read_back = Sas7bdatReader::with_options(Cursor::new(buffer), options)
        .unwrap()
        .read_dataset()
        .unwrap();

    let days = (NaiveDate::from_ymd_opt(1984, 3, 9).unwrap()
        - NaiveDate::from_ymd_opt(1960, 1, 1).unwrap())
    .num_days() as f64;
    assert_eq!(read_back.rows[0][2], Value::Number(days));
    assert_eq!(read_back.rows[1][3], Value::text(""));
}

#[test]
fn test_datetime_column() {
    let mut dataset = Sas7bdatDataset::with_columns(
        "VISIT",
        vec![Column::numeric("SEEN").with_format("DATETIME")],
    );
    let seen = NaiveDate::from_ymd_opt(2021, 6, 30)
        .unwrap()
        .and_hms_opt(14, 5, 9)
        .unwrap();
    dataset.add_row(vec![Value::DateTime(seen)]);

    let read_back = roundtrip(&dataset, WriterOptions::new());
    assert_eq!(read_back.rows[0][0], Value::DateTime(seen));
    assert_eq!(
        read_back.rows[0][0].to_text().as_deref(),
        Some("2021-06-30 14:05:09")
    );
}

#[test]
fn test_compressed_roundtrip() {
    let mut dataset = Sas7bdatDataset::with_columns(
        "LAB",
        vec![
            Column::numeric("ID"),
            Column::character("TEST", 64),
            Column::numeric("RESULT"),
        ],
    );
    for i in 0..500 {
        dataset.add_row(vec![
            Value::Number(f64::from(i)),
            Value::text(if i % 3 == 0 { "GLUCOSE" } else { "HEMOGLOBIN A1C" }),
            if i % 7 == 0 {
                Value::Missing
            } else {
                Value::Number(f64::from(i) * 0.25)
            },
        ]);
    }

    for compression in [Compression::Rle, Compression::Rdc] {
        for bitness in [Bitness::X64, Bitness::X86] {
            let options = WriterOptions::new()
                .with_bitness(bitness)
                .with_compression(compression)
                .with_page_size(4096);
            let buffer = write_to_vec(&dataset, options);
            let mut reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
            assert_eq!(reader.metadata().compression, compression);
            assert!(reader.metadata().page_count > 1);

            let rows: Vec<_> = reader.rows().collect::<Result<_, _>>().unwrap();
            assert_eq!(rows, dataset.rows, "{compression} {bitness:?}");
        }
    }
}

fn numbered(rows: usize) -> Sas7bdatDataset {
    let mut dataset = Sas7bdatDataset::with_columns(
        "SEQ",
        vec![Column::numeric("ID"), Column::character("TAG", 4)],
    );
    for i in 0..rows {
        dataset.add_row(vec![Value::Number(i as f64), Value::text("ok")]);
    }
    dataset
}

/// Page type word of the first page after the header.
fn first_page_type(buffer: &[u8], bitness: Bitness, endianness: Endianness) -> u16 {
    let (header_length, page_bit_offset) = match bitness {
        Bitness::X86 => (1024, 16),
        Bitness::X64 => (8192, 32),
    };
    let at = header_length + page_bit_offset;
    let bytes = [buffer[at], buffer[at + 1]];
    match endianness {
        Endianness::Little => u16::from_le_bytes(bytes),
        Endianness::Big => u16::from_be_bytes(bytes),
    }
}

#[test]
fn test_big_endian_roundtrip() {
    let dataset = patients();
    for bitness in [Bitness::X64, Bitness::X86] {
        let options = WriterOptions::new()
            .with_bitness(bitness)
            .with_endianness(Endianness::Big);
        let buffer = write_to_vec(&dataset, options);
        // Byte 37 marks the byte order
        assert_eq!(buffer[37], 0x00);

        let reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
        assert_eq!(reader.metadata().endianness, Endianness::Big);
        assert_eq!(reader.metadata().bitness, bitness);
        assert_eq!(reader.metadata().row_length, 57);
        let read_back = reader.read_dataset().unwrap();
        assert_eq!(read_back.columns[0].label.as_deref(), Some("Patient ID"));
        assert_eq!(read_back.columns[2].format.as_deref(), Some("DATE"));
        assert_eq!(read_back.rows, dataset.rows, "bitness {bitness:?}");
    }
}

#[test]
fn test_narrow_numeric_columns_in_both_byte_orders() {
    let mut dataset = Sas7bdatDataset::with_columns(
        "DOSES",
        vec![
            Column {
                length: 4,
                ..Column::numeric("DOSE")
            },
            Column {
                length: 3,
                ..Column::numeric("VISIT")
            },
        ],
    );
    dataset.add_row(vec![Value::Number(1.5), Value::Number(12.0)]);
    dataset.add_row(vec![Value::Number(-250.0), Value::Missing]);
    dataset.add_row(vec![Value::Missing, Value::Number(0.0)]);

    for endianness in [Endianness::Little, Endianness::Big] {
        let read_back = roundtrip(&dataset, WriterOptions::new().with_endianness(endianness));
        assert_eq!(read_back.columns[0].length, 4);
        assert_eq!(read_back.rows, dataset.rows, "{endianness:?}");
    }
}

#[test]
fn test_big_endian_compressed_roundtrip() {
    let dataset = numbered(600);
    for compression in [Compression::Rle, Compression::Rdc] {
        for bitness in [Bitness::X64, Bitness::X86] {
            let options = WriterOptions::new()
                .with_bitness(bitness)
                .with_endianness(Endianness::Big)
                .with_compression(compression)
                .with_page_size(4096);
            let mut reader = Sas7bdatReader::new(Cursor::new(write_to_vec(&dataset, options)))
                .unwrap();
            assert_eq!(reader.metadata().compression, compression);
            let rows: Vec<_> = reader.rows().collect::<Result<_, _>>().unwrap();
            assert_eq!(rows, dataset.rows, "{compression} {bitness:?}");
        }
    }
}

#[test]
fn test_mix_page_holds_all_rows_when_they_fit() {
    let dataset = numbered(20);
    for bitness in [Bitness::X64, Bitness::X86] {
        for endianness in [Endianness::Little, Endianness::Big] {
            let options = WriterOptions::new()
                .with_bitness(bitness)
                .with_endianness(endianness)
                .with_page_size(4096)
                .with_mix_page(true);
            let buffer = write_to_vec(&dataset, options);
            assert_eq!(first_page_type(&buffer, bitness, endianness), 0x0200);

            let reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
            assert_eq!(reader.metadata().page_count, 1);
            let read_back = reader.read_dataset().unwrap();
            assert_eq!(read_back.rows, dataset.rows, "{bitness:?} {endianness:?}");
        }
    }
}

#[test]
fn test_mix_page_rows_continue_on_data_pages() {
    let dataset = numbered(1_000);
    for bitness in [Bitness::X64, Bitness::X86] {
        for endianness in [Endianness::Little, Endianness::Big] {
            let options = WriterOptions::new()
                .with_bitness(bitness)
                .with_endianness(endianness)
                .with_page_size(4096)
                .with_mix_page(true);
            let buffer = write_to_vec(&dataset, options);
            assert_eq!(first_page_type(&buffer, bitness, endianness), 0x0200);

            let mut reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
            assert!(reader.metadata().page_count > 1);
            assert_eq!(reader.row_count(), 1_000);
            let rows: Vec<_> = reader.rows().collect::<Result<_, _>>().unwrap();
            assert_eq!(rows, dataset.rows, "{bitness:?} {endianness:?}");
        }
    }
}

#[test]
fn test_mix_page_is_skipped_for_compressed_output() {
    let dataset = numbered(50);
    let options = WriterOptions::new()
        .with_compression(Compression::Rle)
        .with_mix_page(true);
    let buffer = write_to_vec(&dataset, options);
    assert_eq!(
        first_page_type(&buffer, Bitness::X64, Endianness::Little),
        0x0000
    );
    let read_back = Sas7bdatReader::new(Cursor::new(buffer))
        .unwrap()
        .read_dataset()
        .unwrap();
    assert_eq!(read_back.rows, dataset.rows);
}

#[test]
fn test_incompressible_rows_are_stored_raw() {
    let mut dataset =
        Sas7bdatDataset::with_columns("NOISE", vec![Column::character("CODE", 8)]);
    dataset.add_row(vec![Value::text("AbCdEfGh")]);

    let options = WriterOptions::new().with_compression(Compression::Rle);
    let read_back = roundtrip(&dataset, options);
    assert_eq!(read_back.rows, dataset.rows);
}

#[test]
fn test_empty_dataset() {
    let dataset = Sas7bdatDataset::with_columns("EMPTY", vec![Column::numeric("ID")]);
    let buffer = write_to_vec(&dataset, WriterOptions::new());
    let mut reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
    assert_eq!(reader.row_count(), 0);
    assert_eq!(reader.schema().len(), 1);
    assert_eq!(reader.chunks(10).count(), 0);
}

#[test]
fn test_bad_magic_is_invalid_format() {
    let mut buffer = write_to_vec(&patients(), WriterOptions::new());
    buffer[12] ^= 0xFF;
    let err = Sas7bdatReader::new(Cursor::new(buffer)).err().unwrap();
    assert!(matches!(err, Sas7bdatError::InvalidFormat { .. }));

    let err = Sas7bdatReader::new(Cursor::new(vec![0u8; 100])).err().unwrap();
    assert!(matches!(err, Sas7bdatError::InvalidFormat { .. }));
}

#[test]
fn test_truncated_page_is_an_error() {
    let mut dataset = Sas7bdatDataset::with_columns("BIG", vec![Column::numeric("ID")]);
    for i in 0..2_000 {
        dataset.add_row(vec![Value::Number(f64::from(i))]);
    }
    let mut buffer = write_to_vec(&dataset, WriterOptions::new().with_page_size(4096));
    buffer.truncate(buffer.len() - 100);

    let mut reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
    let result: Result<Vec<_>, _> = reader.rows().collect();
    assert!(matches!(result, Err(Sas7bdatError::InvalidFormat { .. })));
}

#[test]
fn test_missing_pages_stop_early() {
    let mut dataset = Sas7bdatDataset::with_columns("BIG", vec![Column::numeric("ID")]);
    for i in 0..2_000 {
        dataset.add_row(vec![Value::Number(f64::from(i))]);
    }
    let mut buffer = write_to_vec(&dataset, WriterOptions::new().with_page_size(4096));
    // Drop the last whole page
    buffer.truncate(buffer.len() - 4096);

    let mut reader = Sas7bdatReader::new(Cursor::new(buffer)).unwrap();
    let rows: Vec<_> = reader.rows().collect::<Result<_, _>>().unwrap();
    assert!(rows.len() < 2_000);
    assert_eq!(reader.rows_read(), rows.len() as u64);
}

#[test]
fn test_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_sas7bdat(&dir.path().join("missing.sas7bdat")).unwrap_err();
    assert!(matches!(err, Sas7bdatError::FileNotFound { .. }));
}

#[test]
fn test_write_and_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patient.sas7bdat");
    write_sas7bdat(&path, &patients()).unwrap();
    let read_back = read_sas7bdat(&path).unwrap();
    assert_eq!(read_back.rows, patients().rows);
}
