//! Harness error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Model error: {0}")]
    Model(#[from] mnistq_model::ModelError),

    #[error("Hex codec error: {0}")]
    Hex(#[from] mnistq_hex::HexError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] mnistq_fixed_point::FixedPointError),

    #[error("Invalid engine config: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
