//! Floating-point model and test set handed over by the training procedure

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};

/// Float weights for a dense layer (Y = XW + b)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatLayer {
    /// Weight matrix (in_features × out_features), row-major
    pub weight: Vec<f32>,
    /// Bias vector (out_features)
    pub bias: Vec<f32>,
    pub in_features: usize,
    pub out_features: usize,
}

impl FloatLayer {
    /// Check weight and bias lengths against the declared dimensions
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.weight.len() != self.in_features * self.out_features {
            return Err(ModelError::InvalidShape {
                name: format!("{name}.weight"),
                expected: vec![self.in_features, self.out_features],
                got: vec![self.weight.len()],
            });
        }
        if self.bias.len() != self.out_features {
            return Err(ModelError::InvalidShape {
                name: format!("{name}.bias"),
                expected: vec![self.out_features],
                got: vec![self.bias.len()],
            });
        }
        Ok(())
    }

    /// Y = XW + b
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (i, &xi) in x.iter().enumerate().take(self.in_features) {
            let row = &self.weight[i * self.out_features..(i + 1) * self.out_features];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
        out
    }
}

/// Float network: dense + ReLU, then dense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatModel {
    pub layer1: FloatLayer,
    pub layer2: FloatLayer,
}

impl FloatModel {
    /// Load from a JSON document
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        self.layer1.validate("layer1")?;
        self.layer2.validate("layer2")?;
        if self.layer1.out_features != self.layer2.in_features {
            return Err(ModelError::InvalidShape {
                name: "layer2.weight".into(),
                expected: vec![self.layer1.out_features, self.layer2.out_features],
                got: vec![self.layer2.in_features, self.layer2.out_features],
            });
        }
        Ok(())
    }

    /// Dimensions of this network
    pub fn config(&self) -> ModelConfig {
        ModelConfig {
            input_size: self.layer1.in_features,
            hidden_size: self.layer1.out_features,
            num_classes: self.layer2.out_features,
        }
    }

    /// Raw logits (softmax is monotonic and not needed for classification)
    pub fn forward(&self, image: &[f32]) -> Vec<f32> {
        let mut hidden = self.layer1.forward(image);
        for h in hidden.iter_mut() {
            *h = h.max(0.0);
        }
        self.layer2.forward(&hidden)
    }

    /// Predicted class, ties to the lowest index
    pub fn predict(&self, image: &[f32]) -> usize {
        let logits = self.forward(image);
        let mut best = 0;
        for (i, &v) in logits.iter().enumerate() {
            if v > logits[best] {
                best = i;
            }
        }
        best
    }
}

/// Float test images normalized to [0, 1], with their labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatTestSet {
    pub images: Vec<Vec<f32>>,
    pub labels: Vec<u8>,
}

impl FloatTestSet {
    /// Load from a JSON document
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let set: Self = serde_json::from_str(&content)?;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Check image sizes and labels against a model configuration
    pub fn validate(&self, config: &ModelConfig) -> Result<()> {
        if self.images.len() != self.labels.len() {
            return Err(ModelError::TestSet(format!(
                "{} images but {} labels",
                self.images.len(),
                self.labels.len()
            )));
        }
        if let Some((i, img)) = self
            .images
            .iter()
            .enumerate()
            .find(|(_, img)| img.len() != config.input_size)
        {
            return Err(ModelError::TestSet(format!(
                "image {} has {} pixels, expected {}",
                i,
                img.len(),
                config.input_size
            )));
        }
        if let Some(&label) = self
            .labels
            .iter()
            .find(|&&l| l as usize >= config.num_classes)
        {
            return Err(ModelError::TestSet(format!(
                "label {} out of range for {} classes",
                label, config.num_classes
            )));
        }
        Ok(())
    }
}
