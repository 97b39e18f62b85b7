//! Model error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex codec error: {0}")]
    Hex(#[from] mnistq_hex::HexError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] mnistq_fixed_point::FixedPointError),

    #[error("Invalid tensor shape for {name}: expected {expected:?}, got {got:?}")]
    InvalidShape {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Model config error: {0}")]
    Config(String),

    #[error("Invalid test set: {0}")]
    TestSet(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
