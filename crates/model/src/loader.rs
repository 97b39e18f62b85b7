//! Artifact directory export and import
//!
//! The directory holds the hex files consumed by the HDL testbench. Every
//! file is written or read in full before the next one is touched, and a
//! failed load returns an error without handing back any partial model.

use std::fs;
use std::path::{Path, PathBuf};

use mnistq_fixed_point::{Quantized, ScaleFactor, Shape};
use mnistq_hex::{
    files, HexError, B1_FILE, B2_FILE, SCALES_FILE, SCALE_KEYS, TEST_IMAGES_FILE,
    TEST_LABELS_FILE, W1_FILE, W2_FILE,
};

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::testset::TestVector;
use crate::weights::{LayerParams, Model};

/// Writes a model and test vectors into an artifact directory
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `w1.hex`, `b1.hex`, `w2.hex`, `b2.hex` and `scales.txt`
    pub fn write_model(&self, model: &Model) -> Result<()> {
        let l1 = &model.layer1;
        let l2 = &model.layer2;

        files::write_bytes(&self.dir.join(W1_FILE), l1.weight().tensor.as_slice())?;
        files::write_bytes(&self.dir.join(B1_FILE), l1.bias().tensor.as_slice())?;
        files::write_bytes(&self.dir.join(W2_FILE), l2.weight().tensor.as_slice())?;
        files::write_bytes(&self.dir.join(B2_FILE), l2.bias().tensor.as_slice())?;

        let scales = [
            l1.weight().scale,
            l1.bias().scale,
            l2.weight().scale,
            l2.bias().scale,
        ];
        let table: Vec<(&str, ScaleFactor)> = SCALE_KEYS.iter().copied().zip(scales).collect();
        files::write_scales(&self.dir.join(SCALES_FILE), &table)?;

        tracing::info!(dir = %self.dir.display(), "Weights exported");
        Ok(())
    }

    /// Write `test_imgs.hex` and `test_labels.txt`, in the given order
    pub fn write_test_vectors(&self, vectors: &[TestVector]) -> Result<()> {
        let pixels: Vec<i8> = vectors
            .iter()
            .flat_map(|v| v.image.as_slice().iter().copied())
            .collect();
        let labels: Vec<u8> = vectors.iter().map(|v| v.label).collect();

        files::write_bytes(&self.dir.join(TEST_IMAGES_FILE), &pixels)?;
        files::write_labels(&self.dir.join(TEST_LABELS_FILE), &labels)?;

        tracing::info!(
            dir = %self.dir.display(),
            images = vectors.len(),
            "Test images exported"
        );
        Ok(())
    }
}

/// Reads a model and test vectors back from an artifact directory
pub struct ArtifactLoader {
    dir: PathBuf,
    config: ModelConfig,
}

impl ArtifactLoader {
    /// Loader expecting tensors of the dimensions in `config`
    pub fn new<P: AsRef<Path>>(dir: P, config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            config,
        })
    }

    /// Loader for the default 784-32-10 network
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::new(dir, ModelConfig::default())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Load all four tensors and their scales
    pub fn load_model(&self) -> Result<Model> {
        let c = &self.config;
        let w1 = files::read_tensor(
            &self.dir.join(W1_FILE),
            Shape::Matrix {
                rows: c.input_size,
                cols: c.hidden_size,
            },
        )?;
        let b1 = files::read_tensor(&self.dir.join(B1_FILE), Shape::Vector(c.hidden_size))?;
        let w2 = files::read_tensor(
            &self.dir.join(W2_FILE),
            Shape::Matrix {
                rows: c.hidden_size,
                cols: c.num_classes,
            },
        )?;
        let b2 = files::read_tensor(&self.dir.join(B2_FILE), Shape::Vector(c.num_classes))?;

        let scales = files::read_scales(&self.dir.join(SCALES_FILE), &SCALE_KEYS)?;
        let [sw1, sb1, sw2, sb2] = scales[..] else {
            return Err(ModelError::Config(format!(
                "expected {} scales, got {}",
                SCALE_KEYS.len(),
                scales.len()
            )));
        };

        let layer1 = LayerParams::new("layer1", Quantized::new(w1, sw1), Quantized::new(b1, sb1))?;
        let layer2 = LayerParams::new("layer2", Quantized::new(w2, sw2), Quantized::new(b2, sb2))?;
        let model = Model::new(layer1, layer2)?;

        tracing::info!(
            dir = %self.dir.display(),
            parameters = c.num_parameters(),
            "Model loaded"
        );
        Ok(model)
    }

    /// Load test images and labels, paired in file order
    pub fn load_test_vectors(&self) -> Result<Vec<TestVector>> {
        let images = files::read_images(&self.dir.join(TEST_IMAGES_FILE), self.config.input_size)?;
        let labels_path = self.dir.join(TEST_LABELS_FILE);
        let labels = files::read_labels(&labels_path, self.config.num_classes)?;

        if images.len() != labels.len() {
            return Err(ModelError::Hex(HexError::Shape {
                source_name: labels_path.display().to_string(),
                expected: images.len(),
                got: labels.len(),
            }));
        }

        tracing::info!(images = images.len(), "Test vectors loaded");
        Ok(images
            .into_iter()
            .zip(labels)
            .map(|(image, label)| TestVector::new(image, label))
            .collect())
    }
}
