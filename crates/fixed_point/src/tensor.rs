//! Signed 8-bit tensors

use std::fmt;

use crate::error::{FixedPointError, Result};

/// Shape of a rank-1 or rank-2 tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Vector of `len` elements
    Vector(usize),
    /// Row-major matrix, row index varying slowest
    Matrix { rows: usize, cols: usize },
}

impl Shape {
    /// Number of elements described by this shape
    pub fn len(&self) -> usize {
        match *self {
            Shape::Vector(len) => len,
            Shape::Matrix { rows, cols } => rows * cols,
        }
    }

    /// True when the shape holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows (a vector is a single row)
    pub fn rows(&self) -> usize {
        match *self {
            Shape::Vector(_) => 1,
            Shape::Matrix { rows, .. } => rows,
        }
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        match *self {
            Shape::Vector(len) => len,
            Shape::Matrix { cols, .. } => cols,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Vector(len) => write!(f, "({},)", len),
            Shape::Matrix { rows, cols } => write!(f, "({}, {})", rows, cols),
        }
    }
}

/// An immutable, fixed-shape array of signed 8-bit values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor8 {
    data: Vec<i8>,
    shape: Shape,
}

impl Tensor8 {
    /// Build a tensor, checking that `data` fills `shape` exactly
    pub fn new(data: Vec<i8>, shape: Shape) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(FixedPointError::ShapeMismatch {
                shape,
                expected: shape.len(),
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Build a vector tensor
    pub fn vector(data: Vec<i8>) -> Self {
        let shape = Shape::Vector(data.len());
        Self { data, shape }
    }

    /// Build a row-major matrix tensor
    pub fn matrix(data: Vec<i8>, rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, Shape::Matrix { rows, cols })
    }

    /// Tensor of zeros
    pub fn zeros(shape: Shape) -> Self {
        Self {
            data: vec![0; shape.len()],
            shape,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in storage (row-major) order
    pub fn as_slice(&self) -> &[i8] {
        &self.data
    }

    /// Element at flat index
    pub fn get(&self, index: usize) -> Option<i8> {
        self.data.get(index).copied()
    }

    /// Element at (row, col); a vector is treated as one row
    pub fn at(&self, row: usize, col: usize) -> i8 {
        self.data[row * self.shape.cols() + col]
    }

    /// Minimum and maximum element, `None` when empty
    pub fn range(&self) -> Option<(i8, i8)> {
        let min = *self.data.iter().min()?;
        let max = *self.data.iter().max()?;
        Some((min, max))
    }
}

impl fmt::Display for Tensor8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range() {
            Some((min, max)) => write!(f, "{} i8 [{}, {}]", self.shape, min, max),
            None => write!(f, "{} i8 (empty)", self.shape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_row_major_indexing() {
        let t = Tensor8::matrix(vec![1, 2, 3, 4, 5, 6], 2, 3).unwrap();
        assert_eq!(t.at(0, 2), 3);
        assert_eq!(t.at(1, 0), 4);
        assert_eq!(t.shape().rows(), 2);
        assert_eq!(t.shape().cols(), 3);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = Tensor8::matrix(vec![0; 5], 2, 3);
        assert!(matches!(
            result,
            Err(FixedPointError::ShapeMismatch { expected: 6, got: 5, .. })
        ));
    }

    #[test]
    fn test_range() {
        let t = Tensor8::vector(vec![-3, 7, 0, -128]);
        assert_eq!(t.range(), Some((-128, 7)));
        assert_eq!(Tensor8::vector(vec![]).range(), None);
    }

    #[test]
    fn test_display() {
        let t = Tensor8::matrix(vec![-1, 1], 1, 2).unwrap();
        assert_eq!(t.to_string(), "(1, 2) i8 [-1, 1]");
    }
}
