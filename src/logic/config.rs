//! Configuration module
//!
//! Architecture hyperparameters travel with the model artifact; training
//! parameters are read from the environment with constant fallbacks.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::error::{IdsError, Result};
use crate::logic::features::VocabularyScope;

/// Fixed architecture description, sufficient to rebuild the forward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    /// Positions per sample (encoded feature width)
    pub sequence_length: usize,
    pub num_tokens: usize,
    pub d_model: usize,
    pub conv_filters: usize,
    pub conv_kernel: usize,
    pub se_reduction: usize,
    pub key_dim: usize,
    pub head_hidden: usize,
    pub dropout: f64,
}

impl ArchitectureConfig {
    pub fn new(sequence_length: usize) -> Self {
        Self {
            sequence_length,
            num_tokens: constants::DEFAULT_NUM_TOKENS,
            d_model: constants::D_MODEL,
            conv_filters: constants::CONV_FILTERS,
            conv_kernel: constants::CONV_KERNEL,
            se_reduction: constants::SE_REDUCTION,
            key_dim: constants::KEY_DIM,
            head_hidden: constants::HEAD_HIDDEN,
            dropout: constants::HEAD_DROPOUT,
        }
    }

    pub fn with_num_tokens(mut self, num_tokens: usize) -> Self {
        self.num_tokens = num_tokens;
        self
    }

    /// Squeeze-excite bottleneck width
    pub fn se_hidden(&self) -> usize {
        (self.conv_filters / self.se_reduction.max(1)).max(1)
    }

    /// Channel width after cross-attention concatenation
    pub fn fused_width(&self) -> usize {
        self.conv_filters + self.d_model
    }

    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(IdsError::InvalidConfig("sequence_length must be >= 1".into()));
        }
        if self.num_tokens == 0 {
            return Err(IdsError::InvalidConfig("num_tokens must be >= 1".into()));
        }
        if self.conv_kernel == 0 || self.conv_kernel % 2 == 0 {
            return Err(IdsError::InvalidConfig(format!(
                "conv_kernel must be odd, got {}",
                self.conv_kernel
            )));
        }
        if self.d_model == 0 || self.conv_filters == 0 || self.key_dim == 0 || self.head_hidden == 0 {
            return Err(IdsError::InvalidConfig("layer widths must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(IdsError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub seed: u64,
    /// Held-out fraction for the train/test split
    pub test_size: f64,
    pub num_tokens: usize,
    pub vocabulary: VocabularyScope,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: constants::DEFAULT_EPOCHS,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            seed: constants::DEFAULT_SEED,
            test_size: constants::DEFAULT_TEST_SIZE,
            num_tokens: constants::DEFAULT_NUM_TOKENS,
            vocabulary: VocabularyScope::FullDataset,
        }
    }
}

impl TrainingConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            epochs: constants::get_epochs(),
            batch_size: constants::get_batch_size(),
            learning_rate: constants::get_learning_rate(),
            seed: constants::get_seed(),
            test_size: constants::get_test_size(),
            num_tokens: constants::get_num_tokens(),
            vocabulary: if constants::is_strict_vocabulary() {
                VocabularyScope::TrainingOnly
            } else {
                VocabularyScope::FullDataset
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(IdsError::InvalidConfig("epochs must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(IdsError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(IdsError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(IdsError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.num_tokens == 0 {
            return Err(IdsError::InvalidConfig("num_tokens must be >= 1".into()));
        }
        Ok(())
    }
}
