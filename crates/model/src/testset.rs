//! Quantized test vectors and their selection from a float test set

use rand::seq::index;
use rand::Rng;

use mnistq_fixed_point::{quantize_input, Tensor8};

use crate::error::{ModelError, Result};
use crate::float::FloatTestSet;

/// One quantized image and its expected class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    pub image: Tensor8,
    pub label: u8,
}

impl TestVector {
    pub fn new(image: Tensor8, label: u8) -> Self {
        Self { image, label }
    }

    /// Quantize a normalized float image with the fixed input scale
    pub fn from_float(pixels: &[f32], label: u8) -> Self {
        Self {
            image: quantize_input(pixels),
            label,
        }
    }
}

/// Pick `n` distinct indices out of `0..total`, in the order drawn.
///
/// The generator is supplied by the caller so selections are reproducible
/// without any global seed.
pub fn select_indices<R: Rng + ?Sized>(rng: &mut R, total: usize, n: usize) -> Result<Vec<usize>> {
    if n > total {
        return Err(ModelError::TestSet(format!(
            "cannot select {} images from a set of {}",
            n, total
        )));
    }
    Ok(index::sample(rng, total, n).into_vec())
}

/// Quantize the images at `indices`, keeping their order
pub fn quantize_selection(set: &FloatTestSet, indices: &[usize]) -> Result<Vec<TestVector>> {
    indices
        .iter()
        .map(|&i| {
            let image = set.images.get(i).ok_or_else(|| {
                ModelError::TestSet(format!("index {} out of range for {} images", i, set.len()))
            })?;
            let label = *set.labels.get(i).ok_or_else(|| {
                ModelError::TestSet(format!("index {} has no label", i))
            })?;
            Ok(TestVector::from_float(image, label))
        })
        .collect()
}
