//! mnistq harness
//!
//! Integer inference engine reproducing the hardware datapath, the batch
//! validator run over exported test vectors, and the float reference used
//! to judge quantization quality.

mod engine;
mod error;
mod pipeline;
mod reference;
mod validator;

pub use engine::{
    argmax, BiasScale, EngineConfig, FixedPointEngine, Inference, Requantization,
    DEFAULT_ACTIVATION_CEILING, DEFAULT_REQUANT_SHIFT, HARDWARE_BIAS_SCALE, REFERENCE_BIAS_SCALE,
};
pub use error::{HarnessError, Result};
pub use pipeline::{
    PipelineOutput, PipelineReport, QuantizationPipeline, ACCURACY_TOLERANCE, DEFAULT_EVAL_SAMPLES,
};
pub use reference::{float_accuracy, float_accuracy_on};
pub use validator::{Report, SampleResult, Validator};
