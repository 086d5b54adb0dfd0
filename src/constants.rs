//! Central Configuration Constants
//!
//! Single source of truth for architecture and training defaults.
//! The architecture values are part of the model artifact; changing them
//! produces artifacts that older predictors cannot reconstruct.

// ============================================
// Architecture
// ============================================

/// Learned summary tokens per path
pub const DEFAULT_NUM_TOKENS: usize = 4;

/// Width of the positional path and of each token
pub const D_MODEL: usize = 32;

/// Convolution filters in the recalibration path
pub const CONV_FILTERS: usize = 32;

/// Convolution kernel width
pub const CONV_KERNEL: usize = 3;

/// Squeeze-excite bottleneck reduction factor
pub const SE_REDUCTION: usize = 8;

/// Cross-attention key/value projection width
pub const KEY_DIM: usize = 16;

/// Hidden units in the classification head
pub const HEAD_HIDDEN: usize = 64;

/// Head dropout rate (training only)
pub const HEAD_DROPOUT: f64 = 0.3;

/// Batch normalization moving-average momentum
pub const BN_MOMENTUM: f64 = 0.99;

/// Batch / layer normalization epsilon
pub const NORM_EPSILON: f64 = 1e-3;

/// Stddev of the positional embedding initializer
pub const POSITIONAL_INIT_STDDEV: f64 = 0.05;

/// Attack decision threshold (fixed, never tuned)
pub const DECISION_THRESHOLD: f64 = 0.5;

// ============================================
// Training
// ============================================

/// Passes over the training partition
pub const DEFAULT_EPOCHS: usize = 30;

/// Mini-batch size
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Held-out fraction
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Split / init / shuffle seed
pub const DEFAULT_SEED: u64 = 42;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "AI Security IDS";

/// Directory name under the local data dir
pub const DATA_DIR_NAME: &str = "ai-security-ids";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get epoch count from environment or use default
pub fn get_epochs() -> usize {
    env_or("IDS_EPOCHS", DEFAULT_EPOCHS)
}

/// Get batch size from environment or use default
pub fn get_batch_size() -> usize {
    env_or("IDS_BATCH_SIZE", DEFAULT_BATCH_SIZE)
}

/// Get learning rate from environment or use default
pub fn get_learning_rate() -> f64 {
    env_or("IDS_LEARNING_RATE", DEFAULT_LEARNING_RATE)
}

/// Get seed from environment or use default
pub fn get_seed() -> u64 {
    env_or("IDS_SEED", DEFAULT_SEED)
}

/// Get held-out fraction from environment or use default
pub fn get_test_size() -> f64 {
    env_or("IDS_TEST_SIZE", DEFAULT_TEST_SIZE)
}

/// Get token count from environment or use default
pub fn get_num_tokens() -> usize {
    env_or("IDS_NUM_TOKENS", DEFAULT_NUM_TOKENS)
}

/// Check if the training-only vocabulary (with unknown bucket) is enabled
pub fn is_strict_vocabulary() -> bool {
    std::env::var("IDS_STRICT_VOCABULARY")
        .map(|s| s.to_lowercase() == "true" || s == "1")
        .unwrap_or(false)
}
