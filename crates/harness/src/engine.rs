//! Integer emulation of the hardware inference datapath
//!
//! Layer 1: `acc[i] = b1[i] * BIAS_SCALE + Σ_j x[j] * w1[j][i]` in a 32-bit
//! accumulator, then ReLU + requantization to int8 (`acc >> 8`, saturating
//! at the activation ceiling). Layer 2: `acc[i] = b2[i] + Σ_j a1[j] * w2[j][i]`.
//! The predicted class is the first index of the largest layer-2 accumulator.
//!
//! [`EngineConfig::reference`] instead reproduces the integer evaluation run
//! at quantization time: bias × 127 and `trunc(acc / (127 * sw1))`.

use std::fmt;
use std::str::FromStr;

use mnistq_fixed_point::{requantize_divide, requantize_relu, Tensor8, INPUT_SCALE};
use mnistq_model::{LayerParams, Model};

use crate::error::{HarnessError, Result};

/// Bias pre-scale of the hardware path (`b1 << 8`)
pub const HARDWARE_BIAS_SCALE: i32 = 256;

/// Bias pre-scale of the reference evaluation (`b1 * 127`)
pub const REFERENCE_BIAS_SCALE: i32 = 127;

/// Right shift bringing layer-1 accumulators back to int8 (divide by 256)
pub const DEFAULT_REQUANT_SHIFT: u32 = 8;

/// Layer-1 accumulators above this saturate to 127
pub const DEFAULT_ACTIVATION_CEILING: i32 = 32767;

/// Layer-1 bias pre-scaling convention. One engine uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiasScale {
    /// ×256, matching the hardware datapath
    #[default]
    Shift8,
    /// ×127, the bias pre-scale of the reference evaluation. On its own it
    /// only changes the bias; pair it with [`Requantization::WeightScale`]
    /// (see [`EngineConfig::reference`]) to reproduce that evaluation.
    Times127,
}

impl BiasScale {
    pub fn multiplier(self) -> i32 {
        match self {
            BiasScale::Shift8 => HARDWARE_BIAS_SCALE,
            BiasScale::Times127 => REFERENCE_BIAS_SCALE,
        }
    }
}

impl FromStr for BiasScale {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift8" | "256" => Ok(BiasScale::Shift8),
            "times127" | "127" => Ok(BiasScale::Times127),
            other => Err(HarnessError::Config(format!(
                "unknown bias scale {:?} (expected shift8 or times127)",
                other
            ))),
        }
    }
}

impl fmt::Display for BiasScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasScale::Shift8 => write!(f, "shift8"),
            BiasScale::Times127 => write!(f, "times127"),
        }
    }
}

/// How layer-1 accumulators are brought back to int8 activations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requantization {
    /// ReLU, then `acc >> requant_shift`, saturating above the activation
    /// ceiling. The hardware datapath.
    #[default]
    Shift,
    /// ReLU, then `trunc(acc / (127 * sw1))` with `sw1` the scale of the
    /// layer-1 weights
    WeightScale,
}

impl FromStr for Requantization {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" => Ok(Requantization::Shift),
            "weight-scale" | "weightscale" => Ok(Requantization::WeightScale),
            other => Err(HarnessError::Config(format!(
                "unknown requantization {:?} (expected shift or weight-scale)",
                other
            ))),
        }
    }
}

impl fmt::Display for Requantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requantization::Shift => write!(f, "shift"),
            Requantization::WeightScale => write!(f, "weight-scale"),
        }
    }
}

/// Fixed-point datapath parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Layer-1 bias pre-scale
    pub bias_scale: BiasScale,
    /// Layer-1 requantization policy
    pub requantization: Requantization,
    /// Arithmetic right shift applied to layer-1 accumulators
    pub requant_shift: u32,
    /// Accumulators above this saturate to 127
    pub activation_ceiling: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bias_scale: BiasScale::default(),
            requantization: Requantization::default(),
            requant_shift: DEFAULT_REQUANT_SHIFT,
            activation_ceiling: DEFAULT_ACTIVATION_CEILING,
        }
    }
}

impl EngineConfig {
    /// The integer evaluation run at quantization time: bias × 127 and
    /// division by `127 * sw1`
    pub fn reference() -> Self {
        Self {
            bias_scale: BiasScale::Times127,
            requantization: Requantization::WeightScale,
            ..Self::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(scale) = std::env::var("MNISTQ_BIAS_SCALE") {
            if let Ok(s) = scale.parse() {
                config.bias_scale = s;
            }
        }

        if let Ok(policy) = std::env::var("MNISTQ_REQUANT") {
            if let Ok(p) = policy.parse() {
                config.requantization = p;
            }
        }

        if let Ok(shift) = std::env::var("MNISTQ_REQUANT_SHIFT") {
            if let Ok(s) = shift.parse() {
                config.requant_shift = s;
            }
        }

        if let Ok(ceiling) = std::env::var("MNISTQ_ACT_CEILING") {
            if let Ok(c) = ceiling.parse() {
                config.activation_ceiling = c;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.requant_shift >= i32::BITS {
            return Err(HarnessError::Config(format!(
                "requant_shift ({}) must be below 32",
                self.requant_shift
            )));
        }
        if self.activation_ceiling < 0 {
            return Err(HarnessError::Config(format!(
                "activation_ceiling ({}) must be non-negative",
                self.activation_ceiling
            )));
        }
        Ok(())
    }
}

/// Result of one integer inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    /// Index of the largest score
    pub predicted: usize,
    /// Raw layer-2 accumulators, one per class
    pub scores: Vec<i32>,
}

/// Bit-exact software model of the int8 inference pipeline
#[derive(Debug, Clone, Default)]
pub struct FixedPointEngine {
    config: EngineConfig,
}

impl FixedPointEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one image through both layers.
    ///
    /// # Panics
    ///
    /// If the image length differs from the model's input size. Callers
    /// validate shapes before inference.
    pub fn infer(&self, image: &Tensor8, model: &Model) -> Inference {
        let acc1 = self.layer1_accumulate(image, &model.layer1);
        let act1 = self.activate(&acc1, &model.layer1);
        let scores = self.layer2_accumulate(&act1, &model.layer2);
        Inference {
            predicted: argmax(&scores),
            scores,
        }
    }

    /// Layer-1 pre-activations: pre-scaled bias plus the image dot products
    pub fn layer1_accumulate(&self, image: &Tensor8, layer: &LayerParams) -> Vec<i32> {
        assert_eq!(
            image.len(),
            layer.in_features(),
            "precondition violated: image has {} pixels, {} expects {}",
            image.len(),
            layer.name,
            layer.in_features()
        );
        accumulate(image.as_slice(), layer, self.config.bias_scale.multiplier())
    }

    /// ReLU and requantize layer-1 accumulators to int8 activations.
    /// `layer` supplies the weight scale for [`Requantization::WeightScale`].
    pub fn activate(&self, acc: &[i32], layer: &LayerParams) -> Vec<i8> {
        match self.config.requantization {
            Requantization::Shift => acc
                .iter()
                .map(|&a| {
                    requantize_relu(a, self.config.requant_shift, self.config.activation_ceiling)
                })
                .collect(),
            Requantization::WeightScale => {
                let divisor = INPUT_SCALE as f64 * layer.weight().scale.value() as f64;
                acc.iter().map(|&a| requantize_divide(a, divisor)).collect()
            }
        }
    }

    /// Layer-2 scores: unscaled bias plus the activation dot products
    pub fn layer2_accumulate(&self, activations: &[i8], layer: &LayerParams) -> Vec<i32> {
        assert_eq!(
            activations.len(),
            layer.in_features(),
            "precondition violated: {} activations, {} expects {}",
            activations.len(),
            layer.name,
            layer.in_features()
        );
        accumulate(activations, layer, 1)
    }
}

/// `acc[i] = bias[i] * bias_multiplier + Σ_j inputs[j] * weight[j][i]`
///
/// 8×8-bit products are widened to 32 bits and summed with wrapping adds,
/// the behaviour of a 32-bit hardware accumulator.
fn accumulate(inputs: &[i8], layer: &LayerParams, bias_multiplier: i32) -> Vec<i32> {
    let bias = layer.bias().tensor.as_slice();
    (0..layer.out_features())
        .map(|i| {
            let mut acc = (bias[i] as i32).wrapping_mul(bias_multiplier);
            for (j, &x) in inputs.iter().enumerate() {
                acc = acc.wrapping_add(x as i32 * layer.get_weight(j, i) as i32);
            }
            acc
        })
        .collect()
}

/// Index of the maximum, first occurrence on ties; 0 for an empty slice
pub fn argmax(scores: &[i32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}
