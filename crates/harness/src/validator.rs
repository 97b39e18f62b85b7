//! Batch validation of exported test vectors against the integer engine

use std::fmt;

use rayon::prelude::*;

use mnistq_model::{Model, TestVector};

use crate::engine::{FixedPointEngine, Inference};

/// Outcome for one test vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleResult {
    /// Position of the vector in the batch
    pub index: usize,
    pub predicted: usize,
    pub expected: u8,
    pub passed: bool,
}

impl SampleResult {
    fn new(index: usize, inference: &Inference, expected: u8) -> Self {
        Self {
            index,
            predicted: inference.predicted,
            expected,
            passed: inference.predicted == expected as usize,
        }
    }
}

impl fmt::Display for SampleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Test {:2}: {} - Predicted: {}, Expected: {}",
            self.index + 1,
            if self.passed { "PASS" } else { "FAIL" },
            self.predicted,
            self.expected
        )
    }
}

/// Per-vector results in batch order, plus aggregate accuracy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub samples: Vec<SampleResult>,
}

impl Report {
    pub fn total(&self) -> usize {
        self.samples.len()
    }

    pub fn correct(&self) -> usize {
        self.samples.iter().filter(|s| s.passed).count()
    }

    /// `correct / total`, 0.0 for an empty batch
    pub fn accuracy(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.correct() as f64 / self.total() as f64
    }

    pub fn failures(&self) -> impl Iterator<Item = &SampleResult> {
        self.samples.iter().filter(|s| !s.passed)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accuracy: {}/{} = {:.1}%",
            self.correct(),
            self.total(),
            self.accuracy() * 100.0
        )
    }
}

/// Runs the fixed-point engine over batches of test vectors
#[derive(Debug, Clone, Default)]
pub struct Validator {
    engine: FixedPointEngine,
}

impl Validator {
    pub fn new(engine: FixedPointEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &FixedPointEngine {
        &self.engine
    }

    /// Classify every vector and compare against its label
    pub fn validate(&self, vectors: &[TestVector], model: &Model) -> Report {
        let samples = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| self.check(i, v, model))
            .collect();
        let report = Report { samples };
        tracing::debug!(
            correct = report.correct(),
            total = report.total(),
            "Validation finished"
        );
        report
    }

    /// Same as [`validate`](Self::validate), one inference per rayon task.
    /// Results keep the batch order.
    pub fn validate_parallel(&self, vectors: &[TestVector], model: &Model) -> Report {
        let samples = vectors
            .par_iter()
            .enumerate()
            .map(|(i, v)| self.check(i, v, model))
            .collect();
        Report { samples }
    }

    /// Raw scores for the vector at `index`
    pub fn debug_scores(
        &self,
        vectors: &[TestVector],
        model: &Model,
        index: usize,
    ) -> Option<Inference> {
        vectors
            .get(index)
            .map(|v| self.engine.infer(&v.image, model))
    }

    /// Raw scores for the first vector
    pub fn debug_first(&self, vectors: &[TestVector], model: &Model) -> Option<Inference> {
        self.debug_scores(vectors, model, 0)
    }

    fn check(&self, index: usize, vector: &TestVector, model: &Model) -> SampleResult {
        let inference = self.engine.infer(&vector.image, model);
        SampleResult::new(index, &inference, vector.label)
    }
}
