//! mnistq integration tests
//!
//! Quantize → export → load → fixed-point inference → validation, on the
//! full 784-32-10 network shape.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use mnistq_fixed_point::{Quantized, ScaleFactor, Shape, Tensor8};
use mnistq_harness::{
    BiasScale, EngineConfig, FixedPointEngine, PipelineReport, QuantizationPipeline, Validator,
    ACCURACY_TOLERANCE, DEFAULT_EVAL_SAMPLES,
};
use mnistq_hex::{decode_bytes, HexError, TEST_IMAGES_FILE, W1_FILE};
use mnistq_model::{
    ArtifactLoader, FloatLayer, FloatModel, FloatTestSet, LayerParams, Model, ModelConfig,
    ModelError, TestVector,
};

const INPUT: usize = 784;
const HIDDEN: usize = 32;
const CLASSES: usize = 10;
const BLOCK: usize = 78;

// =============================================================================
// Fixtures
// =============================================================================

/// A "trained" template-matching network: hidden unit `h < 10` responds to
/// pixel block `h`, and class `c` reads hidden unit `c`.
fn template_model() -> FloatModel {
    let mut w1 = vec![0.0f32; INPUT * HIDDEN];
    for j in 0..INPUT {
        for h in 0..CLASSES {
            w1[j * HIDDEN + h] = if j / BLOCK == h { 0.05 } else { -0.02 };
        }
    }
    let mut w2 = vec![0.0f32; HIDDEN * CLASSES];
    for c in 0..CLASSES {
        w2[c * CLASSES + c] = 1.0;
    }

    FloatModel {
        layer1: FloatLayer {
            weight: w1,
            bias: vec![0.0; HIDDEN],
            in_features: INPUT,
            out_features: HIDDEN,
        },
        layer2: FloatLayer {
            weight: w2,
            bias: vec![0.0; CLASSES],
            in_features: HIDDEN,
            out_features: CLASSES,
        },
    }
}

/// Images with block `label` lit and low-level noise elsewhere
fn template_test_set(rng: &mut ChaCha20Rng, n: usize) -> FloatTestSet {
    let mut images = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = i % CLASSES;
        let image = (0..INPUT)
            .map(|j| {
                if j / BLOCK == label {
                    1.0
                } else {
                    rng.gen_range(0.0f32..0.2)
                }
            })
            .collect();
        images.push(image);
        labels.push(label as u8);
    }
    FloatTestSet { images, labels }
}

fn raw_layer(name: &str, weight: Vec<i8>, rows: usize, cols: usize, bias: Vec<i8>) -> LayerParams {
    LayerParams::new(
        name,
        Quantized::new(Tensor8::matrix(weight, rows, cols).unwrap(), ScaleFactor::UNIT),
        Quantized::new(Tensor8::vector(bias), ScaleFactor::UNIT),
    )
    .unwrap()
}

// =============================================================================
// Section 1: Datapath scenarios
// =============================================================================

mod datapath_tests {
    use super::*;

    /// Zero layer-1 weights with b1 = [1, 0, ...]: neuron 0 accumulates
    /// exactly 256 and requantizes to 1
    #[test]
    fn test_bias_only_layer1() {
        let mut b1 = vec![0i8; HIDDEN];
        b1[0] = 1;
        let layer1 = raw_layer("layer1", vec![0; INPUT * HIDDEN], INPUT, HIDDEN, b1);
        let engine = FixedPointEngine::new(EngineConfig {
            bias_scale: BiasScale::Shift8,
            ..Default::default()
        })
        .unwrap();

        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..4 {
            let pixels: Vec<i8> = (0..INPUT).map(|_| rng.gen()).collect();
            let image = Tensor8::vector(pixels);

            let acc = engine.layer1_accumulate(&image, &layer1);
            assert_eq!(acc[0], 256);
            assert!(acc[1..].iter().all(|&a| a == 0));

            let act = engine.activate(&acc, &layer1);
            assert_eq!(act[0], 1);
            assert!(act[1..].iter().all(|&a| a == 0));
        }
    }

    #[test]
    fn test_bias_conventions_never_mixed() {
        let mut b1 = vec![0i8; HIDDEN];
        b1[3] = 2;
        let layer1 = raw_layer("layer1", vec![0; INPUT * HIDDEN], INPUT, HIDDEN, b1);
        let image = Tensor8::zeros(Shape::Vector(INPUT));

        let hardware = FixedPointEngine::default();
        let reference = FixedPointEngine::new(EngineConfig {
            bias_scale: BiasScale::Times127,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(hardware.layer1_accumulate(&image, &layer1)[3], 512);
        assert_eq!(reference.layer1_accumulate(&image, &layer1)[3], 254);
    }

    #[test]
    fn test_worst_case_accumulator_fits_i32() {
        // -128 * -128 over every input plus the largest bias
        let layer1 = raw_layer(
            "layer1",
            vec![-128; INPUT * HIDDEN],
            INPUT,
            HIDDEN,
            vec![127; HIDDEN],
        );
        let image = Tensor8::vector(vec![-128; INPUT]);
        let acc = FixedPointEngine::default().layer1_accumulate(&image, &layer1);
        let expected = 127 * 256 + (INPUT as i32) * 128 * 128;
        assert!(acc.iter().all(|&a| a == expected));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let model = Model::from_float(&template_model()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let set = template_test_set(&mut rng, 5);
        let engine = FixedPointEngine::default();

        for img in &set.images {
            let v = TestVector::from_float(img, 0);
            let a = engine.infer(&v.image, &model);
            let b = engine.infer(&v.image, &model);
            assert_eq!(a, b);
            assert_eq!(a.scores.len(), CLASSES);
        }
    }
}

// =============================================================================
// Section 2: Codec scenarios
// =============================================================================

mod codec_tests {
    use super::*;

    #[test]
    fn test_sign_conversion_lines() {
        assert_eq!(decode_bytes("ff").unwrap(), vec![-1]);
        assert_eq!(decode_bytes("7f").unwrap(), vec![127]);
        assert_eq!(decode_bytes("80").unwrap(), vec![-128]);
    }
}

// =============================================================================
// Section 3: Export / import / validate
// =============================================================================

mod pipeline_tests {
    use super::*;

    fn run_pipeline(seed: u64) -> mnistq_harness::PipelineOutput {
        let mut data_rng = ChaCha20Rng::seed_from_u64(seed);
        let set = template_test_set(&mut data_rng, 200);
        let mut select_rng = ChaCha20Rng::seed_from_u64(42);
        QuantizationPipeline::default()
            .run(&template_model(), &set, &mut select_rng, 20)
            .unwrap()
    }

    #[test]
    fn test_quantized_accuracy_tracks_float() {
        let output = run_pipeline(1);
        let report = &output.report;

        assert_eq!(report.indices.len(), 20);
        assert_eq!(report.validation.total(), 20);
        assert!(report.float_accuracy >= 0.95);
        assert!(
            report.accuracy_gap().abs() <= ACCURACY_TOLERANCE,
            "float {} vs fixed-point {}",
            report.float_accuracy,
            report.quantized_accuracy()
        );
        assert!(report.within_tolerance());
    }

    #[test]
    fn test_selection_reproducible_with_same_generator() {
        let a = run_pipeline(1);
        let b = run_pipeline(1);
        assert_eq!(a.report.indices, b.report.indices);
        assert_eq!(a.vectors, b.vectors);
    }

    #[test]
    fn test_export_then_validate_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_pipeline(2);
        output.export(dir.path()).unwrap();

        let w1 = std::fs::read_to_string(dir.path().join(W1_FILE)).unwrap();
        assert_eq!(w1.lines().count(), INPUT * HIDDEN);
        let imgs = std::fs::read_to_string(dir.path().join(TEST_IMAGES_FILE)).unwrap();
        assert_eq!(imgs.lines().count(), 20 * INPUT);

        let loader = ArtifactLoader::from_directory(dir.path()).unwrap();
        let model = loader.load_model().unwrap();
        let vectors = loader.load_test_vectors().unwrap();
        assert_eq!(model, output.model);
        assert_eq!(vectors, output.vectors);

        let validator = Validator::default();
        let from_files = validator.validate(&vectors, &model);
        assert_eq!(from_files, output.report.validation);
        assert_eq!(validator.validate_parallel(&vectors, &model), from_files);

        let debug = validator.debug_first(&vectors, &model).unwrap();
        assert_eq!(debug.predicted, from_files.samples[0].predicted);
    }

    #[test]
    fn test_corrupted_weight_file_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        run_pipeline(3).export(dir.path()).unwrap();

        let path = dir.path().join(W1_FILE);
        let mut lines: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        lines[100] = "zz".into();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        let err = ArtifactLoader::new(dir.path(), ModelConfig::default())
            .unwrap()
            .load_model()
            .unwrap_err();
        match err {
            ModelError::Hex(HexError::Format { line, content, .. }) => {
                assert_eq!(line, 101);
                assert_eq!(content, "zz");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_image_file_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        run_pipeline(4).export(dir.path()).unwrap();

        let path = dir.path().join(TEST_IMAGES_FILE);
        let text = std::fs::read_to_string(&path).unwrap();
        let truncated: String = text.lines().take(INPUT + 5).map(|l| format!("{l}\n")).collect();
        std::fs::write(&path, truncated).unwrap();

        let err = ArtifactLoader::from_directory(dir.path())
            .unwrap()
            .load_test_vectors()
            .unwrap_err();
        assert!(matches!(err, ModelError::Hex(HexError::Shape { .. })));
    }

    #[test]
    fn test_full_set_evaluation_capped_at_set_size() {
        let output = run_pipeline(5);
        let report = &output.report;

        assert_eq!(DEFAULT_EVAL_SAMPLES, 1000);
        assert_eq!(report.evaluation.total(), 200);
        assert_eq!(report.full_float_accuracy, 1.0);
        assert_eq!(report.evaluated_accuracy(), 1.0);
        // Evaluation walks the test set from the front
        for (i, sample) in report.evaluation.samples.iter().enumerate() {
            assert_eq!(sample.expected as usize, i % CLASSES);
        }
    }

    #[test]
    fn test_eval_samples_configurable() {
        let mut data_rng = ChaCha20Rng::seed_from_u64(6);
        let set = template_test_set(&mut data_rng, 200);
        let pipeline = QuantizationPipeline::default().with_eval_samples(50);
        assert_eq!(pipeline.eval_samples(), 50);

        let output = pipeline
            .run_on(&template_model(), &set, (0..20).collect())
            .unwrap();
        assert_eq!(output.report.evaluation.total(), 50);
        assert_eq!(output.report.validation.total(), 20);
    }

    #[test]
    fn test_collapsed_datapath_flagged() {
        let mut data_rng = ChaCha20Rng::seed_from_u64(7);
        let set = template_test_set(&mut data_rng, 200);
        // Every activation shifts to 0, so every score is 0 and class 0 wins
        let engine = FixedPointEngine::new(EngineConfig {
            requant_shift: 31,
            activation_ceiling: i32::MAX,
            ..Default::default()
        })
        .unwrap();

        let output = QuantizationPipeline::new(Validator::new(engine))
            .run_on(&template_model(), &set, (0..20).collect())
            .unwrap();
        let report = &output.report;

        assert_eq!(report.float_accuracy, 1.0);
        // Only the two label-0 images of 0..20 pass
        assert_eq!(report.validation.correct(), 2);
        assert!(report.accuracy_gap() > ACCURACY_TOLERANCE);
        assert!(!report.within_tolerance());
        assert!((report.evaluated_accuracy() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_negated_output_weights_flagged() {
        let output = run_pipeline(8);
        let layer2 = &output.model.layer2;
        let negated: Vec<i8> = layer2
            .weight()
            .tensor
            .as_slice()
            .iter()
            .map(|&w| w.saturating_neg())
            .collect();
        let broken = Model::new(
            output.model.layer1.clone(),
            LayerParams::new(
                "layer2",
                Quantized::new(
                    Tensor8::matrix(negated, HIDDEN, CLASSES).unwrap(),
                    layer2.weight().scale,
                ),
                layer2.bias().clone(),
            )
            .unwrap(),
        )
        .unwrap();

        let validator = Validator::default();
        let report = PipelineReport {
            indices: output.report.indices.clone(),
            float_accuracy: output.report.float_accuracy,
            validation: validator.validate(&output.vectors, &broken),
            full_float_accuracy: output.report.full_float_accuracy,
            evaluation: validator.validate(&output.vectors, &broken),
        };

        assert_eq!(report.quantized_accuracy(), 0.0);
        assert!(report.accuracy_gap() > ACCURACY_TOLERANCE);
        assert!(!report.within_tolerance());
    }
}
