//! mnistq fixed-point primitives
//!
//! Signed 8-bit tensors, per-tensor symmetric quantization and the scalar
//! saturate/round/requantize operations the integer datapath is built from.

mod error;
mod fixed;
mod quant;
mod tensor;

pub use error::{FixedPointError, Result};
pub use fixed::{
    quantize_scalar, requantize_divide, requantize_relu, round_half_even, saturate_i8, I8_MAX,
    I8_MIN,
};
pub use quant::{dequantize, quantize, quantize_input, Quantized, ScaleFactor, INPUT_SCALE};
pub use tensor::{Shape, Tensor8};
