//! Codec error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HexError {
    #[error("{source_name}:{line}: {reason} (got {content:?})")]
    Format {
        source_name: String,
        line: usize,
        content: String,
        reason: &'static str,
    },

    #[error("{source_name}: expected {expected} values, got {got}")]
    Shape {
        source_name: String,
        expected: usize,
        got: usize,
    },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HexError {
    pub(crate) fn format(
        source_name: &str,
        line: usize,
        content: &str,
        reason: &'static str,
    ) -> Self {
        HexError::Format {
            source_name: source_name.to_string(),
            line,
            content: content.to_string(),
            reason,
        }
    }

    pub(crate) fn shape(source_name: &str, expected: usize, got: usize) -> Self {
        HexError::Shape {
            source_name: source_name.to_string(),
            expected,
            got,
        }
    }

    /// True for malformed-line errors
    pub fn is_format(&self) -> bool {
        matches!(self, HexError::Format { .. })
    }

    /// True for element-count errors
    pub fn is_shape(&self) -> bool {
        matches!(self, HexError::Shape { .. })
    }
}

pub type Result<T> = std::result::Result<T, HexError>;
