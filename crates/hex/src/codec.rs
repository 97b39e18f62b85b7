//! In-memory encode/decode of the testbench text formats
//!
//! Signed bytes travel as two lowercase hex digits per line holding the
//! two's-complement bit pattern; labels as decimal lines; scale factors as
//! `key: value` lines.

use std::fmt::Write;

use mnistq_fixed_point::{ScaleFactor, Shape, Tensor8};

use crate::constants::HEX_LINE_WIDTH;
use crate::error::{HexError, Result};

/// Source name used when decoding text that did not come from a file
const INLINE_SOURCE: &str = "<inline>";

/// Encode signed bytes as one `{:02x}` line each, in iteration order
pub fn encode_bytes(values: &[i8]) -> String {
    let mut out = String::with_capacity(values.len() * (HEX_LINE_WIDTH + 1));
    for &v in values {
        // `as u8` keeps the two's-complement bit pattern, i.e. `v & 0xFF`
        let _ = writeln!(out, "{:02x}", v as u8);
    }
    out
}

/// Decode hex lines back to signed bytes
pub fn decode_bytes(text: &str) -> Result<Vec<i8>> {
    decode_bytes_from(text, INLINE_SOURCE)
}

/// Decode hex lines, naming `source_name` in any error
pub fn decode_bytes_from(text: &str, source_name: &str) -> Result<Vec<i8>> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| decode_hex_line(line, source_name, idx + 1))
        .collect()
}

fn decode_hex_line(line: &str, source_name: &str, line_no: usize) -> Result<i8> {
    let bytes = line.as_bytes();
    if bytes.len() != HEX_LINE_WIDTH {
        return Err(HexError::format(
            source_name,
            line_no,
            line,
            "expected exactly two hex digits",
        ));
    }
    if !bytes.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(HexError::format(
            source_name,
            line_no,
            line,
            "expected lowercase hex digits [0-9a-f]",
        ));
    }

    let value = u8::from_str_radix(line, 16)
        .map_err(|_| HexError::format(source_name, line_no, line, "invalid hex byte"))?;

    // Values above 127 are negative in two's complement (value - 256)
    Ok(value as i8)
}

/// Decode a tensor of a known shape
pub fn decode_tensor(text: &str, source_name: &str, shape: Shape) -> Result<Tensor8> {
    let values = decode_bytes_from(text, source_name)?;
    let got = values.len();
    Tensor8::new(values, shape).map_err(|_| HexError::shape(source_name, shape.len(), got))
}

/// Decode a concatenation of images of `pixels_per_image` values each
pub fn decode_images(
    text: &str,
    source_name: &str,
    pixels_per_image: usize,
) -> Result<Vec<Tensor8>> {
    let values = decode_bytes_from(text, source_name)?;
    if pixels_per_image == 0 || values.len() % pixels_per_image != 0 {
        let expected = values.len().div_ceil(pixels_per_image.max(1)) * pixels_per_image;
        return Err(HexError::shape(source_name, expected, values.len()));
    }

    Ok(values
        .chunks_exact(pixels_per_image)
        .map(|chunk| Tensor8::vector(chunk.to_vec()))
        .collect())
}

/// Encode labels as decimal lines
pub fn encode_labels(labels: &[u8]) -> String {
    let mut out = String::with_capacity(labels.len() * 2);
    for &label in labels {
        let _ = writeln!(out, "{}", label);
    }
    out
}

/// Decode decimal label lines, each in `0..num_classes`
pub fn decode_labels(text: &str, source_name: &str, num_classes: usize) -> Result<Vec<u8>> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| {
            let line_no = idx + 1;
            if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
                return Err(HexError::format(
                    source_name,
                    line_no,
                    line,
                    "expected a decimal label",
                ));
            }
            let label: u8 = line.parse().map_err(|_| {
                HexError::format(source_name, line_no, line, "label out of range")
            })?;
            if label as usize >= num_classes {
                return Err(HexError::format(
                    source_name,
                    line_no,
                    line,
                    "label out of range",
                ));
            }
            Ok(label)
        })
        .collect()
}

/// Encode scale factors as `key: value` lines, in the order given
pub fn encode_scales(scales: &[(&str, ScaleFactor)]) -> String {
    let mut out = String::new();
    for (key, scale) in scales {
        let _ = writeln!(out, "{}: {}", key, scale);
    }
    out
}

/// Decode a scale table whose keys must match `keys` exactly and in order
pub fn decode_scales(text: &str, source_name: &str, keys: &[&str]) -> Result<Vec<ScaleFactor>> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() != keys.len() {
        return Err(HexError::shape(source_name, keys.len(), lines.len()));
    }

    lines
        .iter()
        .zip(keys)
        .enumerate()
        .map(|(idx, (line, key))| {
            let line_no = idx + 1;
            let (found, value) = line.split_once(':').ok_or_else(|| {
                HexError::format(source_name, line_no, line, "expected `key: value`")
            })?;
            if found.trim() != *key {
                return Err(HexError::format(
                    source_name,
                    line_no,
                    line,
                    "unexpected scale key",
                ));
            }
            let value: f32 = value.trim().parse().map_err(|_| {
                HexError::format(source_name, line_no, line, "invalid scale value")
            })?;
            ScaleFactor::new(value).map_err(|_| {
                HexError::format(
                    source_name,
                    line_no,
                    line,
                    "scale must be positive and finite",
                )
            })
        })
        .collect()
}
