//! Scoped reads and writes of whole artifact files
//!
//! Each call opens, fully reads or writes, and closes its file before
//! returning. Decode errors name the file path.

use std::fs;
use std::path::Path;

use mnistq_fixed_point::{ScaleFactor, Shape, Tensor8};

use crate::codec::{
    decode_images, decode_labels, decode_scales, decode_tensor, encode_bytes,
    encode_labels, encode_scales,
};
use crate::error::{HexError, Result};

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| HexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|source| HexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Write signed bytes as hex lines
pub fn write_bytes(path: &Path, values: &[i8]) -> Result<()> {
    tracing::debug!(path = %path.display(), lines = values.len(), "Writing hex file");
    write_text(path, &encode_bytes(values))
}

/// Read a hex file holding a tensor of the given shape
pub fn read_tensor(path: &Path, shape: Shape) -> Result<Tensor8> {
    let text = read_text(path)?;
    let tensor = decode_tensor(&text, &source_name(path), shape)?;
    tracing::debug!(path = %path.display(), %shape, "Read tensor");
    Ok(tensor)
}

/// Read a hex file of concatenated images
pub fn read_images(path: &Path, pixels_per_image: usize) -> Result<Vec<Tensor8>> {
    let text = read_text(path)?;
    decode_images(&text, &source_name(path), pixels_per_image)
}

/// Write decimal labels
pub fn write_labels(path: &Path, labels: &[u8]) -> Result<()> {
    tracing::debug!(path = %path.display(), lines = labels.len(), "Writing labels");
    write_text(path, &encode_labels(labels))
}

/// Read decimal labels, each below `num_classes`
pub fn read_labels(path: &Path, num_classes: usize) -> Result<Vec<u8>> {
    let text = read_text(path)?;
    decode_labels(&text, &source_name(path), num_classes)
}

/// Write a `key: value` scale table
pub fn write_scales(path: &Path, scales: &[(&str, ScaleFactor)]) -> Result<()> {
    write_text(path, &encode_scales(scales))
}

/// Read a scale table with exactly `keys`, in order
pub fn read_scales(path: &Path, keys: &[&str]) -> Result<Vec<ScaleFactor>> {
    let text = read_text(path)?;
    decode_scales(&text, &source_name(path), keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.hex");
        let tensor = Tensor8::matrix(vec![-128, -1, 0, 1, 127, 42], 3, 2).unwrap();

        write_bytes(&path, tensor.as_slice()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "80\nff\n00\n01\n7f\n2a\n");

        let back = read_tensor(&path, tensor.shape()).unwrap();
        assert_eq!(back, tensor);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tensor(&dir.path().join("absent.hex"), Shape::Vector(1)).unwrap_err();
        assert!(matches!(err, HexError::Io { .. }));
    }

    #[test]
    fn test_format_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b1.hex");
        std::fs::write(&path, "00\nabc\n").unwrap();

        let err = read_tensor(&path, Shape::Vector(2)).unwrap_err();
        match err {
            HexError::Format { source_name, line, .. } => {
                assert!(source_name.ends_with("b1.hex"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
