//! Artifact file names and format constants shared with the testbench

/// Layer 1 weight matrix (input index outer, neuron index inner)
pub const W1_FILE: &str = "w1.hex";

/// Layer 1 bias vector
pub const B1_FILE: &str = "b1.hex";

/// Layer 2 weight matrix (input index outer, class index inner)
pub const W2_FILE: &str = "w2.hex";

/// Layer 2 bias vector
pub const B2_FILE: &str = "b2.hex";

/// Scale factors as `key: value` lines
pub const SCALES_FILE: &str = "scales.txt";

/// Concatenated quantized test images
pub const TEST_IMAGES_FILE: &str = "test_imgs.hex";

/// Decimal test labels, one per image
pub const TEST_LABELS_FILE: &str = "test_labels.txt";

/// Scale keys, in the order they appear in the scales file
pub const SCALE_KEYS: [&str; 4] = ["sw1", "sb1", "sw2", "sb2"];

/// Characters per hex line (newline excluded)
pub const HEX_LINE_WIDTH: usize = 2;
