//! mnistq command-line tool
//!
//! Quantizes a trained float model into the hex artifacts consumed by the
//! HDL testbench, and re-runs the integer datapath over an exported
//! directory to check the hardware's expected outputs.
//!
//! # Usage
//!
//! ```bash
//! # Quantize and export 20 test images selected with seed 42
//! mnistq export --weights model.json --test-set test.json --out data
//!
//! # Re-run fixed-point inference over the exported files
//! mnistq verify --data-dir data
//!
//! # Print tensor shapes, ranges and scales
//! mnistq inspect --data-dir data
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mnistq_fixed_point::INPUT_SCALE;
use mnistq_harness::{
    BiasScale, EngineConfig, FixedPointEngine, QuantizationPipeline, Requantization, Validator,
};
use mnistq_model::{ArtifactLoader, ExportConfig, FloatModel, FloatTestSet, ModelConfig};

#[derive(Parser)]
#[command(name = "mnistq")]
#[command(version)]
#[command(about = "Int8 quantization and bit-exact verification for a 784-32-10 MNIST network")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize a float model and export weights and test vectors as hex
    Export {
        /// Float model JSON (layer1 / layer2 weights and biases)
        #[arg(short, long)]
        weights: PathBuf,

        /// Float test set JSON (normalized images and labels)
        #[arg(short, long)]
        test_set: PathBuf,

        /// Output directory [env: MNISTQ_DATA_DIR, default: data]
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of test images to export [env: MNISTQ_NUM_IMAGES, default: 20]
        #[arg(short, long)]
        num_images: Option<usize>,

        /// Seed for the test image selection [env: MNISTQ_SEED, default: 42]
        #[arg(short, long)]
        seed: Option<u64>,

        /// Leading test images evaluated in fixed point [env: MNISTQ_EVAL_SAMPLES, default: 1000]
        #[arg(long)]
        eval_samples: Option<usize>,
    },

    /// Run the fixed-point engine over an exported directory
    Verify {
        /// Artifact directory [env: MNISTQ_DATA_DIR, default: data]
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Test vector whose raw scores are printed
        #[arg(long, default_value = "0")]
        debug_index: usize,

        /// Validate test vectors on the rayon thread pool
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Layer-1 bias convention: shift8 (hardware) or times127 [env: MNISTQ_BIAS_SCALE]
        #[arg(long)]
        bias_scale: Option<BiasScale>,

        /// Layer-1 requantization: shift (hardware) or weight-scale [env: MNISTQ_REQUANT]
        #[arg(long)]
        requant: Option<Requantization>,

        /// Reproduce the quantization-time evaluation (times127 + weight-scale)
        #[arg(long, default_value = "false", conflicts_with_all = ["bias_scale", "requant"])]
        reference: bool,

        /// Network dimensions JSON, when not 784-32-10
        #[arg(long)]
        model_config: Option<PathBuf>,
    },

    /// Print the shapes, value ranges and scales of an exported model
    Inspect {
        /// Artifact directory [env: MNISTQ_DATA_DIR, default: data]
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Network dimensions JSON, when not 784-32-10
        #[arg(long)]
        model_config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mnistq=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            weights,
            test_set,
            out,
            num_images,
            seed,
            eval_samples,
        } => {
            let mut config = ExportConfig::from_env();
            if let Some(out) = out {
                config.data_dir = out;
            }
            if let Some(n) = num_images {
                config.num_images = n;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(n) = eval_samples {
                config.eval_samples = n;
            }
            cmd_export(&weights, &test_set, &config)
        }
        Commands::Verify {
            data_dir,
            debug_index,
            parallel,
            bias_scale,
            requant,
            reference,
            model_config,
        } => {
            let mut engine = if reference {
                EngineConfig::reference()
            } else {
                EngineConfig::from_env()
            };
            if let Some(scale) = bias_scale {
                engine.bias_scale = scale;
            }
            if let Some(policy) = requant {
                engine.requantization = policy;
            }
            let dir = data_dir.unwrap_or_else(|| ExportConfig::from_env().data_dir);
            let loader = open_loader(&dir, model_config.as_deref())?;
            cmd_verify(&loader, engine, debug_index, parallel)
        }
        Commands::Inspect {
            data_dir,
            model_config,
        } => {
            let dir = data_dir.unwrap_or_else(|| ExportConfig::from_env().data_dir);
            let loader = open_loader(&dir, model_config.as_deref())?;
            cmd_inspect(&loader)
        }
    }
}

fn open_loader(dir: &Path, model_config: Option<&Path>) -> Result<ArtifactLoader> {
    let config = match model_config {
        Some(path) => ModelConfig::from_json_file(path)
            .with_context(|| format!("Failed to read model config {}", path.display()))?,
        None => ModelConfig::default(),
    };
    Ok(ArtifactLoader::new(dir, config)?)
}

fn cmd_export(weights: &Path, test_set: &Path, config: &ExportConfig) -> Result<()> {
    let model = FloatModel::from_json_file(weights)
        .with_context(|| format!("Failed to load float model {}", weights.display()))?;
    let set = FloatTestSet::from_json_file(test_set)
        .with_context(|| format!("Failed to load test set {}", test_set.display()))?;
    tracing::info!(
        images = set.len(),
        seed = config.seed,
        num_images = config.num_images,
        "Quantizing model"
    );

    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let output = QuantizationPipeline::default()
        .with_eval_samples(config.eval_samples)
        .run(&model, &set, &mut rng, config.num_images)?;
    output
        .export(&config.data_dir)
        .with_context(|| format!("Failed to export to {}", config.data_dir.display()))?;

    let report = &output.report;
    println!("{}", output.model.summary());
    println!();
    println!(
        "Float accuracy (full test set):   {:.2}% ({} images)",
        report.full_float_accuracy * 100.0,
        set.len()
    );
    println!(
        "Fixed-point accuracy (first {}): {:.2}% ({}/{})",
        report.evaluation.total(),
        report.evaluated_accuracy() * 100.0,
        report.evaluation.correct(),
        report.evaluation.total()
    );
    println!();
    println!("Selected test images: {:?}", report.indices);
    println!("Float accuracy:       {:.1}%", report.float_accuracy * 100.0);
    println!("Fixed-point accuracy: {:.1}%", report.quantized_accuracy() * 100.0);
    if !report.within_tolerance() {
        println!(
            "WARNING: accuracy gap {:.1} points exceeds tolerance",
            report.accuracy_gap() * 100.0
        );
    }
    println!("Exported to {}", config.data_dir.display());
    Ok(())
}

fn cmd_verify(
    loader: &ArtifactLoader,
    engine: EngineConfig,
    debug_index: usize,
    parallel: bool,
) -> Result<()> {
    let model = loader.load_model().context("Failed to load weights")?;
    let vectors = loader
        .load_test_vectors()
        .context("Failed to load test vectors")?;

    let validator = Validator::new(FixedPointEngine::new(engine)?);
    tracing::info!(
        bias_scale = %engine.bias_scale,
        requantization = %engine.requantization,
        images = vectors.len(),
        parallel,
        "Verifying"
    );

    let report = if parallel {
        validator.validate_parallel(&vectors, &model)
    } else {
        validator.validate(&vectors, &model)
    };

    for sample in &report.samples {
        println!("{sample}");
    }
    println!();
    println!("{report}");

    if let Some(debug) = validator.debug_scores(&vectors, &model, debug_index) {
        println!();
        println!("Debug - test {} scores:", debug_index + 1);
        for (class, score) in debug.scores.iter().enumerate() {
            println!("  {class}: {score}");
        }
        println!(
            "Predicted: {}, Expected: {}",
            debug.predicted, vectors[debug_index].label
        );
    }
    Ok(())
}

fn cmd_inspect(loader: &ArtifactLoader) -> Result<()> {
    let model = loader.load_model().context("Failed to load weights")?;
    println!("{}", model.summary());
    println!("Input scale: {:?}", INPUT_SCALE);

    let vectors = loader
        .load_test_vectors()
        .context("Failed to load test vectors")?;
    let mut counts = vec![0usize; loader.config().num_classes];
    for v in &vectors {
        counts[v.label as usize] += 1;
    }
    println!("Test vectors: {}", vectors.len());
    println!("Labels per class: {:?}", counts);
    Ok(())
}
