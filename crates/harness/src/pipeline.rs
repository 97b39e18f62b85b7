//! End-to-end quantize, evaluate and export pipeline

use std::path::Path;

use rand::Rng;

use mnistq_model::{
    quantize_selection, select_indices, ArtifactWriter, FloatModel, FloatTestSet, Model,
    TestVector,
};

use crate::error::Result;
use crate::reference::{self, float_accuracy_on};
use crate::validator::{Report, Validator};

/// Largest acceptable drop from float to fixed-point accuracy on the same
/// images (5 percentage points)
pub const ACCURACY_TOLERANCE: f64 = 0.05;

/// Test images evaluated in fixed point at quantization time, taken from
/// the front of the test set
pub const DEFAULT_EVAL_SAMPLES: usize = 1000;

/// Float vs fixed-point accuracy on one selection of test images
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Test set indices of the selected images, in export order
    pub indices: Vec<usize>,
    pub float_accuracy: f64,
    /// Per-image results of the fixed-point engine
    pub validation: Report,
    /// Float accuracy over the whole test set
    pub full_float_accuracy: f64,
    /// Fixed-point results over the first `eval_samples` test images
    pub evaluation: Report,
}

impl PipelineReport {
    pub fn quantized_accuracy(&self) -> f64 {
        self.validation.accuracy()
    }

    /// Float accuracy minus fixed-point accuracy
    pub fn accuracy_gap(&self) -> f64 {
        self.float_accuracy - self.quantized_accuracy()
    }

    /// Fixed-point accuracy over the evaluation sample
    pub fn evaluated_accuracy(&self) -> f64 {
        self.evaluation.accuracy()
    }

    /// True when the fixed-point accuracy stays within `ACCURACY_TOLERANCE`
    pub fn within_tolerance(&self) -> bool {
        self.accuracy_gap().abs() <= ACCURACY_TOLERANCE + f64::EPSILON
    }
}

/// Everything produced by one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub model: Model,
    pub vectors: Vec<TestVector>,
    pub report: PipelineReport,
}

impl PipelineOutput {
    /// Write weights, scales, test images and labels into `dir`
    pub fn export<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let writer = ArtifactWriter::new(dir)?;
        writer.write_model(&self.model)?;
        writer.write_test_vectors(&self.vectors)?;
        Ok(())
    }
}

/// Quantizes a float model and checks it against the fixed-point engine
#[derive(Debug, Clone)]
pub struct QuantizationPipeline {
    validator: Validator,
    eval_samples: usize,
}

impl Default for QuantizationPipeline {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}

impl QuantizationPipeline {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            eval_samples: DEFAULT_EVAL_SAMPLES,
        }
    }

    /// Number of leading test images evaluated in fixed point, capped at the
    /// test set size
    pub fn with_eval_samples(mut self, eval_samples: usize) -> Self {
        self.eval_samples = eval_samples;
        self
    }

    pub fn eval_samples(&self) -> usize {
        self.eval_samples
    }

    /// Quantize `float_model`, draw `num_images` test images with `rng`, and
    /// compare float and fixed-point accuracy on them
    pub fn run<R: Rng + ?Sized>(
        &self,
        float_model: &FloatModel,
        test_set: &FloatTestSet,
        rng: &mut R,
        num_images: usize,
    ) -> Result<PipelineOutput> {
        let indices = select_indices(rng, test_set.len(), num_images)?;
        self.run_on(float_model, test_set, indices)
    }

    /// Same as [`run`](Self::run) with an explicit selection
    pub fn run_on(
        &self,
        float_model: &FloatModel,
        test_set: &FloatTestSet,
        indices: Vec<usize>,
    ) -> Result<PipelineOutput> {
        test_set.validate(&float_model.config())?;

        let model = Model::from_float(float_model)?;
        let vectors = quantize_selection(test_set, &indices)?;

        let float_accuracy = float_accuracy_on(float_model, test_set, &indices)?;
        let validation = self.validator.validate(&vectors, &model);

        let full_float_accuracy = reference::float_accuracy(float_model, test_set)?;
        let eval_indices: Vec<usize> = (0..self.eval_samples.min(test_set.len())).collect();
        let eval_vectors = quantize_selection(test_set, &eval_indices)?;
        let evaluation = self.validator.validate_parallel(&eval_vectors, &model);
        tracing::info!(
            float_accuracy = full_float_accuracy,
            quantized_accuracy = evaluation.accuracy(),
            samples = evaluation.total(),
            "Test set evaluated"
        );

        let report = PipelineReport {
            indices,
            float_accuracy,
            validation,
            full_float_accuracy,
            evaluation,
        };
        tracing::info!(
            float_accuracy = report.float_accuracy,
            quantized_accuracy = report.quantized_accuracy(),
            images = vectors.len(),
            "Quantized model evaluated"
        );
        if !report.within_tolerance() {
            tracing::warn!(
                gap = report.accuracy_gap(),
                "Fixed-point accuracy diverges from float accuracy"
            );
        }

        Ok(PipelineOutput {
            model,
            vectors,
            report,
        })
    }
}
