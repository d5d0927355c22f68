//! Row compression: SAS run-length encoding (RLE) and Ross Data Compression (RDC).
//!
//! Decompressors expand one row to its declared length. Compressors are
//! simple greedy encoders used by the writer; any output they produce is
//! accepted by SAS-compatible readers.

use crate::error::{Result, Sas7bdatError};

/// Expand an RLE-compressed row to exactly `row_length` bytes.
pub fn rle_decompress(input: &[u8], row_length: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(row_length);
    let mut pos = 0usize;

    while pos < input.len() {
        let control = input[pos] & 0xF0;
        let low = usize::from(input[pos] & 0x0F);
        pos += 1;

        match control {
            0x00 => {
                let count = usize::from(byte_at(input, pos)?) + 64 + low * 256;
                pos += 1;
                out.extend_from_slice(slice_at(input, pos, count)?);
                pos += count;
            }
            0x40 => {
                let count = usize::from(byte_at(input, pos)?) + 18 + low * 256;
                let fill = byte_at(input, pos + 1)?;
                pos += 2;
                out.resize(out.len() + count, fill);
            }
            0x60 | 0x70 => {
                let count = low * 256 + usize::from(byte_at(input, pos)?) + 17;
                pos += 1;
                let fill = if control == 0x60 { b' ' } else { 0x00 };
                out.resize(out.len() + count, fill);
            }
            0x80 | 0x90 | 0xA0 | 0xB0 => {
                let count = low + 1 + usize::from((control - 0x80) >> 4) * 16;
                out.extend_from_slice(slice_at(input, pos, count)?);
                pos += count;
            }
            0xC0 => {
                let fill = byte_at(input, pos)?;
                pos += 1;
                out.resize(out.len() + low + 3, fill);
            }
            0xD0 => out.resize(out.len() + low + 2, b'@'),
            0xE0 => out.resize(out.len() + low + 2, b' '),
            0xF0 => out.resize(out.len() + low + 2, 0x00),
            other => {
                return Err(Sas7bdatError::decompression(format!(
                    "unknown RLE control byte 0x{other:02X}"
                )));
            }
        }

        if out.len() > row_length {
            return Err(Sas7bdatError::decompression(format!(
                "RLE output exceeds row length {row_length}"
            )));
        }
    }

    if out.len() != row_length {
        return Err(Sas7bdatError::decompression(format!(
            "RLE produced {} bytes, expected {row_length}",
            out.len()
        )));
    }
    Ok(out)
}

/// Expand an RDC-compressed row; short output is zero-padded to `row_length`.
pub fn rdc_decompress(input: &[u8], row_length: usize) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::with_capacity(row_length);
    let mut pos = 0usize;
    let mut control_bits: u16 = 0;
    let mut control_mask: u16 = 0;

    while pos < input.len() {
        control_mask >>= 1;
        if control_mask == 0 {
            control_bits = u16::from_be_bytes([byte_at(input, pos)?, byte_at(input, pos + 1)?]);
            pos += 2;
            control_mask = 0x8000;
        }

        if control_bits & control_mask == 0 {
            out.push(byte_at(input, pos)?);
            pos += 1;
        } else {
            let op = byte_at(input, pos)?;
            let command = op >> 4;
            let mut count = usize::from(op & 0x0F);
            pos += 1;

            match command {
                0 => {
                    count += 3;
                    let fill = byte_at(input, pos)?;
                    pos += 1;
                    out.resize(out.len() + count, fill);
                }
                1 => {
                    count += (usize::from(byte_at(input, pos)?) << 4) + 19;
                    let fill = byte_at(input, pos + 1)?;
                    pos += 2;
                    out.resize(out.len() + count, fill);
                }
                2 => {
                    let offset = count + 3 + (usize::from(byte_at(input, pos)?) << 4);
                    let length = usize::from(byte_at(input, pos + 1)?) + 16;
                    pos += 2;
                    copy_back_reference(&mut out, offset, length)?;
                }
                _ => {
                    let offset = count + 3 + (usize::from(byte_at(input, pos)?) << 4);
                    pos += 1;
                    copy_back_reference(&mut out, offset, usize::from(command))?;
                }
            }
        }

        if out.len() > row_length {
            return Err(Sas7bdatError::decompression(format!(
                "RDC output exceeds row length {row_length}"
            )));
        }
    }

    out.resize(row_length, 0);
    Ok(out)
}

fn copy_back_reference(out: &mut Vec<u8>, offset: usize, length: usize) -> Result<()> {
    if offset == 0 || offset > out.len() {
        return Err(Sas7bdatError::decompression(format!(
            "RDC back-reference {offset} outside {} decoded bytes",
            out.len()
        )));
    }
    let start = out.len() - offset;
    // Source and destination may overlap, so copy byte by byte.
    for k in 0..length {
        let byte = out[start + k];
        out.push(byte);
    }
    Ok(())
}

fn byte_at(input: &[u8], pos: usize) -> Result<u8> {
    input
        .get(pos)
        .copied()
        .ok_or_else(|| Sas7bdatError::decompression("compressed row ends mid-command"))
}

fn slice_at(input: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| input.get(pos..end))
        .ok_or_else(|| Sas7bdatError::decompression("compressed row ends mid-literal"))
}

/// Length of the run of `data[start]` beginning at `start`.
fn run_length(data: &[u8], start: usize) -> usize {
    let byte = data[start];
    data[start..].iter().take_while(|b| **b == byte).count()
}

/// Compress a row with SAS RLE.
#[must_use]
pub fn rle_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut literal_start = 0usize;
    let mut pos = 0usize;

    while pos < data.len() {
        let byte = data[pos];
        let run = run_length(data, pos);
        let min_run = if matches!(byte, b' ' | 0x00 | b'@') { 2 } else { 3 };
        if run < min_run {
            pos += run;
            continue;
        }
        push_rle_literal(&mut out, &data[literal_start..pos]);
        push_rle_run(&mut out, byte, run);
        pos += run;
        literal_start = pos;
    }
    push_rle_literal(&mut out, &data[literal_start..]);
    out
}

fn push_rle_literal(out: &mut Vec<u8>, mut literal: &[u8]) {
    while !literal.is_empty() {
        let take = literal.len().min(64 + 0x0FFF);
        if take > 64 {
            let extra = take - 64;
            out.push(((extra >> 8) & 0x0F) as u8);
            out.push((extra & 0xFF) as u8);
        } else {
            let group = (take - 1) / 16;
            let low = take - 1 - group * 16;
            out.push(0x80 + (group as u8) * 0x10 + low as u8);
        }
        out.extend_from_slice(&literal[..take]);
        literal = &literal[take..];
    }
}

fn push_rle_run(out: &mut Vec<u8>, byte: u8, mut run: usize) {
    while run > 0 {
        match byte {
            b' ' | 0x00 if run >= 17 => {
                let take = run.min(17 + 0x0FFF);
                let extra = take - 17;
                let control = if byte == b' ' { 0x60 } else { 0x70 };
                out.push(control | ((extra >> 8) & 0x0F) as u8);
                out.push((extra & 0xFF) as u8);
                run -= take;
            }
            b' ' | 0x00 | b'@' if run >= 2 => {
                let take = run.min(17);
                let control = match byte {
                    b' ' => 0xE0,
                    0x00 => 0xF0,
                    _ => 0xD0,
                };
                out.push(control | (take - 2) as u8);
                run -= take;
            }
            _ if run >= 18 => {
                let take = run.min(18 + 0x0FFF);
                let extra = take - 18;
                out.push(0x40 | ((extra >> 8) & 0x0F) as u8);
                out.push((extra & 0xFF) as u8);
                out.push(byte);
                run -= take;
            }
            _ if run >= 3 => {
                let take = run.min(18);
                out.push(0xC0 | (take - 3) as u8);
                out.push(byte);
                run -= take;
            }
            _ => {
                push_rle_literal(out, &vec![byte; run]);
                run = 0;
            }
        }
    }
}

/// Compress a row with RDC, using literal bytes and run commands.
#[must_use]
pub fn rdc_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8 + 2);
    let mut control_pos = 0usize;
    let mut item = 16usize;
    let mut pos = 0usize;

    while pos < data.len() {
        if item == 16 {
            control_pos = out.len();
            out.extend_from_slice(&[0, 0]);
            item = 0;
        }

        let byte = data[pos];
        let run = run_length(data, pos).min(19 + 0x0FFF);
        if run >= 3 {
            let bit = 0x8000u16 >> item;
            let control = u16::from_be_bytes([out[control_pos], out[control_pos + 1]]) | bit;
            out[control_pos..control_pos + 2].copy_from_slice(&control.to_be_bytes());
            if run <= 18 {
                out.push((run - 3) as u8);
                out.push(byte);
            } else {
                let extra = run - 19;
                out.push(0x10 | (extra & 0x0F) as u8);
                out.push((extra >> 4) as u8);
                out.push(byte);
            }
            pos += run;
        } else {
            out.push(byte);
            pos += 1;
        }
        item += 1;
    }
    out
}
