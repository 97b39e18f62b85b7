//! Fixed-point error types

use thiserror::Error;

use crate::tensor::Shape;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FixedPointError {
    #[error("Shape mismatch: {shape} needs {expected} elements, got {got}")]
    ShapeMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    #[error("Invalid scale factor: {0} (must be positive and finite)")]
    InvalidScale(f32),
}

pub type Result<T> = std::result::Result<T, FixedPointError>;
