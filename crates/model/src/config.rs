//! Network and export configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};

/// Dimensions of the two-layer fully-connected network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Flattened image size (28 x 28)
    #[serde(default = "default_input_size")]
    pub input_size: usize,

    /// Hidden layer width
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Number of output classes
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

fn default_input_size() -> usize { 784 }
fn default_hidden_size() -> usize { 32 }
fn default_num_classes() -> usize { 10 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            hidden_size: default_hidden_size(),
            num_classes: default_num_classes(),
        }
    }
}

impl ModelConfig {
    /// Load config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Total number of int8 parameters (weights and biases of both layers)
    pub fn num_parameters(&self) -> usize {
        self.input_size * self.hidden_size
            + self.hidden_size
            + self.hidden_size * self.num_classes
            + self.num_classes
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.hidden_size == 0 || self.num_classes == 0 {
            return Err(ModelError::Config(format!(
                "all dimensions must be non-zero, got {}x{}x{}",
                self.input_size, self.hidden_size, self.num_classes
            )));
        }
        // Labels are stored as u8
        if self.num_classes > u8::MAX as usize + 1 {
            return Err(ModelError::Config(format!(
                "num_classes ({}) exceeds 256",
                self.num_classes
            )));
        }
        Ok(())
    }
}

/// Settings for exporting an artifact directory
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output directory for hex files
    pub data_dir: PathBuf,

    /// Number of test images to export
    pub num_images: usize,

    /// Seed for the test image selection generator
    pub seed: u64,

    /// Leading test images evaluated in fixed point before export
    pub eval_samples: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            num_images: 20,
            seed: 42,
            eval_samples: 1000,
        }
    }
}

impl ExportConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("MNISTQ_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(n) = std::env::var("MNISTQ_NUM_IMAGES") {
            if let Ok(n) = n.parse() {
                config.num_images = n;
            }
        }

        if let Ok(seed) = std::env::var("MNISTQ_SEED") {
            if let Ok(s) = seed.parse() {
                config.seed = s;
            }
        }

        if let Ok(n) = std::env::var("MNISTQ_EVAL_SAMPLES") {
            if let Ok(n) = n.parse() {
                config.eval_samples = n;
            }
        }

        config
    }
}
