//! Float reference evaluation
//!
//! Accuracy of the unquantized model, measured on the same images the
//! fixed-point engine is validated on, so a large gap between the two
//! points at a quantization or datapath bug.

use mnistq_model::{FloatModel, FloatTestSet};

use crate::error::{HarnessError, Result};

/// Float accuracy over the whole test set
pub fn float_accuracy(model: &FloatModel, set: &FloatTestSet) -> Result<f64> {
    let indices: Vec<usize> = (0..set.len()).collect();
    float_accuracy_on(model, set, &indices)
}

/// Float accuracy over the images at `indices`; 0.0 when `indices` is empty
pub fn float_accuracy_on(model: &FloatModel, set: &FloatTestSet, indices: &[usize]) -> Result<f64> {
    set.validate(&model.config())?;
    if indices.is_empty() {
        return Ok(0.0);
    }

    let mut correct = 0usize;
    for &i in indices {
        let image = set.images.get(i).ok_or_else(|| {
            HarnessError::InvalidInput(format!("index {} out of range for {} images", i, set.len()))
        })?;
        if model.predict(image) == set.labels[i] as usize {
            correct += 1;
        }
    }
    Ok(correct as f64 / indices.len() as f64)
}
