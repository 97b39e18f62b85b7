//! mnistq hex codec
//!
//! Text formats exchanged with the HDL testbench: two-digit lowercase hex
//! lines for signed bytes, decimal lines for labels, and a `key: value`
//! scale table.

mod codec;
mod constants;
mod error;
pub mod files;

pub use codec::{
    decode_bytes, decode_bytes_from, decode_images, decode_labels, decode_scales, decode_tensor,
    encode_bytes, encode_labels, encode_scales,
};
pub use constants::*;
pub use error::{HexError, Result};
