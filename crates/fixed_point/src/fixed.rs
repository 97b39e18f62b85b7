//! Scalar fixed-point primitives shared by the quantizer and the integer engine

/// Largest representable signed 8-bit value
pub const I8_MAX: i32 = i8::MAX as i32;

/// Smallest representable signed 8-bit value
pub const I8_MIN: i32 = i8::MIN as i32;

/// Clamp a wide integer into [-128, 127]
pub fn saturate_i8(value: i64) -> i8 {
    value.clamp(I8_MIN as i64, I8_MAX as i64) as i8
}

/// Round to nearest, ties to even
///
/// Matches the rounding of the numeric library the float model is trained
/// and exported with, so `0.5 -> 0`, `1.5 -> 2`, `-2.5 -> -2`.
pub fn round_half_even(value: f32) -> f32 {
    value.round_ties_even()
}

/// Round a scaled float and saturate it to a signed byte.
///
/// NaN maps to 0; infinities saturate.
pub fn quantize_scalar(value: f32, scale: f32) -> i8 {
    let rounded = round_half_even(value * scale);
    if rounded.is_nan() {
        return 0;
    }
    // f32 -> i64 casts saturate, so +-inf land on the clamp bounds
    saturate_i8(rounded as i64)
}

/// ReLU followed by requantization of a wide accumulator to a signed byte.
///
/// Negative accumulators become 0, accumulators above `ceiling` become 127,
/// everything else is arithmetically shifted right by `shift` bits (floor
/// division by `2^shift`) and saturated.
pub fn requantize_relu(acc: i32, shift: u32, ceiling: i32) -> i8 {
    if acc < 0 {
        0
    } else if acc > ceiling {
        i8::MAX
    } else {
        saturate_i8((acc >> shift) as i64)
    }
}

/// ReLU followed by division by a float divisor, truncating toward zero.
///
/// Requantization of the float-side reference evaluation: an accumulator
/// carrying `input_scale * weight_scale` is brought back to int8 by dividing
/// by that product. Non-positive accumulators and a non-finite result
/// become 0.
pub fn requantize_divide(acc: i32, divisor: f64) -> i8 {
    if acc <= 0 {
        return 0;
    }
    let q = (acc as f64 / divisor).trunc();
    if q.is_nan() {
        return 0;
    }
    saturate_i8(q as i64)
}
