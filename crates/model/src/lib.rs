//! mnistq model
//!
//! Quantized parameters of the 784-32-10 network, the float model and test
//! set handed over by training, test-vector selection, and the artifact
//! directory shared with the HDL testbench.

mod config;
mod error;
mod float;
mod loader;
mod testset;
mod weights;

pub use config::{ExportConfig, ModelConfig};
pub use error::{ModelError, Result};
pub use float::{FloatLayer, FloatModel, FloatTestSet};
pub use loader::{ArtifactLoader, ArtifactWriter};
pub use testset::{quantize_selection, select_indices, TestVector};
pub use weights::{LayerParams, Model, ModelSummary, TensorSummary};
