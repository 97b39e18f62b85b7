//! Per-tensor symmetric int8 quantization

use std::fmt;

use crate::error::{FixedPointError, Result};
use crate::fixed::{quantize_scalar, I8_MAX};
use crate::tensor::{Shape, Tensor8};

/// Fixed scale applied to raw input pixels, which arrive normalized to [0, 1]
pub const INPUT_SCALE: f32 = 127.0;

/// Multiplier relating float values to their quantized representation
/// (`quantized ≈ round(original * scale)`)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ScaleFactor(f32);

impl ScaleFactor {
    /// Scale used for all-zero tensors
    pub const UNIT: ScaleFactor = ScaleFactor(1.0);

    pub fn new(value: f32) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(FixedPointError::InvalidScale(value))
        }
    }

    /// Symmetric scale mapping `max_abs` onto 127
    pub fn for_max_abs(max_abs: f32) -> Self {
        if max_abs == 0.0 || !max_abs.is_finite() {
            return Self::UNIT;
        }
        let scale = I8_MAX as f32 / max_abs;
        if scale.is_finite() {
            Self(scale)
        } else {
            Self::UNIT
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for ScaleFactor {
    /// Shortest representation that parses back to the same `f32`,
    /// always carrying a fractional part (`254.0`, not `254`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A quantized tensor travelling together with the scale it was produced with
#[derive(Debug, Clone, PartialEq)]
pub struct Quantized {
    pub tensor: Tensor8,
    pub scale: ScaleFactor,
}

impl Quantized {
    pub fn new(tensor: Tensor8, scale: ScaleFactor) -> Self {
        Self { tensor, scale }
    }

    pub fn shape(&self) -> Shape {
        self.tensor.shape()
    }

    /// Map back to floats with the scale this tensor carries
    pub fn dequantize(&self) -> Vec<f32> {
        dequantize(self)
    }
}

/// Quantize a float tensor to int8 with a per-tensor symmetric scale.
///
/// `scale = 127 / max|x|` (1.0 for an all-zero tensor); each element is
/// rounded half-to-even and saturated to [-128, 127].
pub fn quantize(values: &[f32], shape: Shape) -> Result<Quantized> {
    if values.len() != shape.len() {
        return Err(FixedPointError::ShapeMismatch {
            shape,
            expected: shape.len(),
            got: values.len(),
        });
    }

    let max_abs = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f32, |acc, v| acc.max(v.abs()));
    let scale = ScaleFactor::for_max_abs(max_abs);

    let data = values
        .iter()
        .map(|&v| quantize_scalar(v, scale.value()))
        .collect();

    Ok(Quantized {
        tensor: Tensor8::new(data, shape)?,
        scale,
    })
}

/// Quantize raw input values with the fixed input scale (`round(x * 127)`)
pub fn quantize_input(values: &[f32]) -> Tensor8 {
    Tensor8::vector(
        values
            .iter()
            .map(|&v| quantize_scalar(v, INPUT_SCALE))
            .collect(),
    )
}

/// Map a quantized tensor back to floats (`v / scale`)
pub fn dequantize(q: &Quantized) -> Vec<f32> {
    let scale = q.scale.value();
    q.tensor
        .as_slice()
        .iter()
        .map(|&v| v as f32 / scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_zero_tensor() {
        let q = quantize(&[0.0; 6], Shape::Matrix { rows: 2, cols: 3 }).unwrap();
        assert_eq!(q.scale, ScaleFactor::UNIT);
        assert_eq!(q.tensor.as_slice(), &[0; 6]);
    }

    #[test]
    fn test_max_magnitude_maps_to_127() {
        let q = quantize(&[0.25, -0.5, 0.1], Shape::Vector(3)).unwrap();
        assert_eq!(q.scale.value(), 254.0);
        assert_eq!(q.tensor.as_slice(), &[64, -127, 25]);

        let q = quantize(&[0.3, 0.9, -0.2], Shape::Vector(3)).unwrap();
        assert_eq!(q.tensor.get(1), Some(127));
    }

    #[test]
    fn test_rounding_is_half_even() {
        // scale = 127 / 127 = 1, so the values are rounded as-is
        let q = quantize(&[127.0, 0.5, 1.5, 2.5, -2.5], Shape::Vector(5)).unwrap();
        assert_eq!(q.scale.value(), 1.0);
        assert_eq!(q.tensor.as_slice(), &[127, 0, 2, 2, -2]);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = quantize(&[1.0, 2.0], Shape::Vector(3));
        assert!(matches!(result, Err(FixedPointError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_input_policy_uses_fixed_scale() {
        let t = quantize_input(&[0.0, 1.0, 0.5, 0.2, 1.5]);
        // 63.5 rounds to the even neighbour 64; 1.5 saturates
        assert_eq!(t.as_slice(), &[0, 127, 64, 25, 127]);
    }

    #[test]
    fn test_invalid_scale() {
        assert!(ScaleFactor::new(0.0).is_err());
        assert!(ScaleFactor::new(-1.0).is_err());
        assert!(ScaleFactor::new(f32::NAN).is_err());
        assert!(ScaleFactor::new(2.5).is_ok());
    }

    #[test]
    fn test_scale_display_round_trips() {
        let scale = ScaleFactor::for_max_abs(0.37);
        let parsed: f32 = scale.to_string().parse().unwrap();
        assert_eq!(parsed, scale.value());
        assert_eq!(ScaleFactor::UNIT.to_string(), "1.0");
    }

    proptest! {
        #[test]
        fn test_dequantize_error_bounded(values in prop::collection::vec(-10.0f32..10.0f32, 1..256)) {
            let q = quantize(&values, Shape::Vector(values.len())).unwrap();
            let back = q.dequantize();
            let bound = 1.0 / q.scale.value();
            for (orig, deq) in values.iter().zip(&back) {
                prop_assert!((orig - deq).abs() <= bound,
                    "error {} exceeds 1/scale {}", (orig - deq).abs(), bound);
            }
        }

        #[test]
        fn test_quantize_deterministic(values in prop::collection::vec(-5.0f32..5.0f32, 1..64)) {
            let a = quantize(&values, Shape::Vector(values.len())).unwrap();
            let b = quantize(&values, Shape::Vector(values.len())).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
