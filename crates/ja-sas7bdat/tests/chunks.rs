//! Chunked reading tests.

use std::io::Cursor;

use ja_sas7bdat::{
    Bitness, Column, Endianness, Sas7bdatDataset, Sas7bdatReader, Sas7bdatWriter, Value,
    WriterOptions,
};
use proptest::prelude::*;

fn numbered(rows: usize) -> Vec<u8> {
    numbered_with(rows, WriterOptions::new().with_page_size(8192))
}

fn numbered_with(rows: usize, options: WriterOptions) -> Vec<u8> {
    let mut dataset = Sas7bdatDataset::with_columns(
        "SEQ",
        vec![Column::numeric("ID"), Column::character("TAG", 4)],
    );
    for i in 0..rows {
        dataset.add_row(vec![Value::Number(i as f64), Value::text("ok")]);
    }
    let mut buffer = Vec::new();
    Sas7bdatWriter::with_options(Cursor::new(&mut buffer), options)
        .write_dataset(&dataset)
        .unwrap();
    buffer
}

#[test]
fn test_chunks_preserve_order() {
    let mut reader = Sas7bdatReader::new(Cursor::new(numbered(25_000))).unwrap();
    let chunks: Vec<_> = reader
        .chunks(10_000)
        .collect::<Result<_, _>>()
        .unwrap();

    let sizes: Vec<_> = chunks.iter().map(|chunk| chunk.len()).collect();
    assert_eq!(sizes, vec![10_000, 10_000, 5_000]);

    let starts: Vec<_> = chunks.iter().map(|chunk| chunk.first_row).collect();
    assert_eq!(starts, vec![0, 10_000, 20_000]);

    let ids: Vec<f64> = chunks
        .iter()
        .flat_map(|chunk| chunk.rows.iter())
        .filter_map(|row| row[0].as_f64())
        .collect();
    let expected: Vec<f64> = (0..25_000).map(f64::from).collect();
    assert_eq!(ids, expected);

    for chunk in &chunks {
        assert_eq!(&chunk.schema, reader.schema());
    }
}

#[test]
fn test_chunks_cross_from_mix_page_to_data_pages() {
    let options = WriterOptions::new()
        .with_bitness(Bitness::X86)
        .with_endianness(Endianness::Big)
        .with_page_size(4096)
        .with_mix_page(true);
    let mut reader = Sas7bdatReader::new(Cursor::new(numbered_with(2_500, options))).unwrap();
    let chunks: Vec<_> = reader.chunks(1_000).collect::<Result<_, _>>().unwrap();

    let sizes: Vec<_> = chunks.iter().map(|chunk| chunk.len()).collect();
    assert_eq!(sizes, vec![1_000, 1_000, 500]);
    let ids: Vec<f64> = chunks
        .iter()
        .flat_map(|chunk| chunk.rows.iter())
        .filter_map(|row| row[0].as_f64())
        .collect();
    let expected: Vec<f64> = (0..2_500).map(f64::from).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_zero_chunk_size_reads_single_rows() {
    let mut reader = Sas7bdatReader::new(Cursor::new(numbered(3))).unwrap();
    let sizes: Vec<_> = reader
        .chunks(0)
        .map(|chunk| chunk.unwrap().len())
        .collect();
    assert_eq!(sizes, vec![1, 1, 1]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chunks_partition_rows(rows in 0usize..1_500, chunk_size in 1usize..400) {
        let mut reader = Sas7bdatReader::new(Cursor::new(numbered(rows))).unwrap();
        let chunks: Vec<_> = reader.chunks(chunk_size).collect::<Result<_, _>>().unwrap();

        prop_assert_eq!(chunks.len(), rows.div_ceil(chunk_size));
        let total: usize = chunks.iter().map(|chunk| chunk.len()).sum();
        prop_assert_eq!(total, rows);
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.index, i);
            prop_assert_eq!(chunk.first_row, (i * chunk_size) as u64);
            if i + 1 < chunks.len() {
                prop_assert_eq!(chunk.len(), chunk_size);
            }
        }
    }
}
