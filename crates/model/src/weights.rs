//! Quantized model parameters

use std::fmt;

use mnistq_fixed_point::{quantize, Quantized, Shape};

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::float::{FloatLayer, FloatModel};

/// Quantized weights for one fully-connected layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerParams {
    /// Layer name ("layer1", "layer2")
    pub name: String,
    /// Weight matrix (in_features × out_features) with its scale
    weight: Quantized,
    /// Bias vector (out_features) with its scale
    bias: Quantized,
}

impl LayerParams {
    /// Bundle a weight matrix and bias vector, checking their shapes agree
    pub fn new(name: impl Into<String>, weight: Quantized, bias: Quantized) -> Result<Self> {
        let name = name.into();
        let Shape::Matrix { rows, cols } = weight.shape() else {
            return Err(ModelError::Config(format!(
                "{name}.weight must be a matrix, got shape {}",
                weight.shape()
            )));
        };
        if bias.shape() != Shape::Vector(cols) {
            return Err(ModelError::InvalidShape {
                name: format!("{name}.bias"),
                expected: vec![cols],
                got: vec![bias.tensor.len()],
            });
        }
        tracing::trace!(%name, rows, cols, "Layer params assembled");
        Ok(Self { name, weight, bias })
    }

    /// Quantize a float layer, one scale per tensor
    pub fn from_float(name: impl Into<String>, layer: &FloatLayer) -> Result<Self> {
        let name = name.into();
        layer.validate(&name)?;
        let weight = quantize(
            &layer.weight,
            Shape::Matrix {
                rows: layer.in_features,
                cols: layer.out_features,
            },
        )?;
        let bias = quantize(&layer.bias, Shape::Vector(layer.out_features))?;
        Self::new(name, weight, bias)
    }

    pub fn weight(&self) -> &Quantized {
        &self.weight
    }

    pub fn bias(&self) -> &Quantized {
        &self.bias
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape().rows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape().cols()
    }

    /// Weight at (in_idx, out_idx)
    pub fn get_weight(&self, in_idx: usize, out_idx: usize) -> i8 {
        self.weight.tensor.at(in_idx, out_idx)
    }
}

/// The quantized two-layer network
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub layer1: LayerParams,
    pub layer2: LayerParams,
}

impl Model {
    /// Compose two layers, checking that layer 1 feeds layer 2
    pub fn new(layer1: LayerParams, layer2: LayerParams) -> Result<Self> {
        if layer1.out_features() != layer2.in_features() {
            return Err(ModelError::InvalidShape {
                name: format!("{}.weight", layer2.name),
                expected: vec![layer1.out_features(), layer2.out_features()],
                got: vec![layer2.in_features(), layer2.out_features()],
            });
        }
        Ok(Self { layer1, layer2 })
    }

    /// Quantize every tensor of a float model
    pub fn from_float(model: &FloatModel) -> Result<Self> {
        model.validate()?;
        let layer1 = LayerParams::from_float("layer1", &model.layer1)?;
        let layer2 = LayerParams::from_float("layer2", &model.layer2)?;
        let model = Self::new(layer1, layer2)?;
        tracing::info!(
            sw1 = %model.layer1.weight.scale,
            sb1 = %model.layer1.bias.scale,
            sw2 = %model.layer2.weight.scale,
            sb2 = %model.layer2.bias.scale,
            "Model quantized to int8"
        );
        Ok(model)
    }

    /// Dimensions of this network
    pub fn config(&self) -> ModelConfig {
        ModelConfig {
            input_size: self.layer1.in_features(),
            hidden_size: self.layer1.out_features(),
            num_classes: self.layer2.out_features(),
        }
    }

    /// Shapes, value ranges and scales of every tensor
    pub fn summary(&self) -> ModelSummary {
        let entry = |name: &str, q: &Quantized| TensorSummary::new(name, q);
        ModelSummary {
            tensors: vec![
                entry("w1", self.layer1.weight()),
                entry("b1", self.layer1.bias()),
                entry("w2", self.layer2.weight()),
                entry("b2", self.layer2.bias()),
            ],
            num_parameters: self.config().num_parameters(),
        }
    }
}

/// Diagnostic view of one quantized tensor
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSummary {
    pub name: String,
    pub shape: Shape,
    pub range: Option<(i8, i8)>,
    pub scale: f32,
}

impl TensorSummary {
    fn new(name: &str, q: &Quantized) -> Self {
        Self {
            name: name.to_string(),
            shape: q.shape(),
            range: q.tensor.range(),
            scale: q.scale.value(),
        }
    }
}

/// Diagnostic view of a whole model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub tensors: Vec<TensorSummary>,
    pub num_parameters: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.tensors {
            match t.range {
                Some((min, max)) => writeln!(
                    f,
                    "{:<3} {:<10} range [{}, {}] scale {:?}",
                    t.name,
                    t.shape.to_string(),
                    min,
                    max,
                    t.scale
                )?,
                None => writeln!(f, "{:<3} {:<10} (empty)", t.name, t.shape.to_string())?,
            }
        }
        write!(f, "Total parameters: {} int8 values", self.num_parameters)
    }
}
