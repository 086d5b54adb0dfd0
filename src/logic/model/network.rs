//! Hybrid dual-path network
//!
//! ```text
//! (B, L, 1) ─┬─ Conv1D → BatchNorm → Squeeze-Excite ── TokenLearner ─┐
//!            │                                                        ├─ CrossAttention ×2 → concat → Head → logit
//!            └─ Dense → + positional table → LayerNorm ── TokenLearner ─┘
//! ```
//!
//! The model is composed of explicit parameter containers and stateless
//! forward/backward functions; no layer keeps state between calls.

use ndarray::{s, Array1, Array3, ArrayViewD, ArrayViewMutD, Axis};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::cross_attention::{FuserCache, FuserParams};
use super::head::{HeadCache, HeadParams};
use super::params::{DenseParams, ParamSet};
use super::stages::{
    backprop_path, run_path, BatchNormParams, Conv1dParams, LayerNormParams, PathStage, PositionalEmbeddingParams,
    SqueezeExciteParams, StageCache,
};
use super::tensor::{sigmoid, Activation, Mode};
use super::token_learner::{TokenLearnerCache, TokenLearnerParams};
use crate::constants::{BN_MOMENTUM, NORM_EPSILON, POSITIONAL_INIT_STDDEV};
use crate::logic::config::ArchitectureConfig;
use crate::logic::error::{IdsError, Result};

// ============================================================================
// PARAMETERS
// ============================================================================

/// Every trainable tensor plus the batch-norm moving statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub recalibration: Vec<PathStage>,
    pub positional: Vec<PathStage>,
    pub cnn_tokens: TokenLearnerParams,
    pub positional_tokens: TokenLearnerParams,
    pub fuser: FuserParams,
    pub head: HeadParams,
}

impl ModelParameters {
    /// Fresh parameters: Glorot-uniform kernels, zero biases, unit norms,
    /// random-normal positional table
    pub fn init(arch: &ArchitectureConfig, rng: &mut StdRng) -> Result<Self> {
        arch.validate()?;

        let taps = arch.conv_kernel;
        let limit = (6.0 / (taps + taps * arch.conv_filters) as f64).sqrt();
        let conv = Conv1dParams {
            kernel: Array3::random_using((taps, 1, arch.conv_filters), Uniform::new(-limit, limit), rng),
            bias: Array1::zeros(arch.conv_filters),
            activation: Activation::Relu,
        };

        let recalibration = vec![
            PathStage::Conv1d(conv),
            PathStage::BatchNorm(BatchNormParams::new(arch.conv_filters, BN_MOMENTUM, NORM_EPSILON)),
            PathStage::SqueezeExcite(SqueezeExciteParams {
                squeeze: DenseParams::glorot(rng, arch.conv_filters, arch.se_hidden()),
                excite: DenseParams::glorot(rng, arch.se_hidden(), arch.conv_filters),
            }),
        ];

        let normal = Normal::new(0.0, POSITIONAL_INIT_STDDEV).map_err(|e| IdsError::InvalidConfig(e.to_string()))?;
        let positional = vec![
            PathStage::Dense(DenseParams::glorot(rng, 1, arch.d_model)),
            PathStage::PositionalEmbedding(PositionalEmbeddingParams {
                table: ndarray::Array2::random_using((arch.sequence_length, arch.d_model), normal, rng),
            }),
            PathStage::LayerNorm(LayerNormParams::new(arch.d_model, NORM_EPSILON)),
        ];

        Ok(Self {
            recalibration,
            positional,
            cnn_tokens: TokenLearnerParams::new(rng, arch.conv_filters, arch.num_tokens)?,
            positional_tokens: TokenLearnerParams::new(rng, arch.d_model, arch.num_tokens)?,
            fuser: FuserParams::new(rng, arch.conv_filters, arch.d_model, arch.key_dim),
            head: HeadParams::new(rng, arch.fused_width(), arch.head_hidden, arch.dropout),
        })
    }

    /// Zero gradient container with identical layout
    pub fn zeros_like(&self) -> Self {
        Self {
            recalibration: self.recalibration.iter().map(PathStage::zeros_like).collect(),
            positional: self.positional.iter().map(PathStage::zeros_like).collect(),
            cnn_tokens: self.cnn_tokens.zeros_like(),
            positional_tokens: self.positional_tokens.zeros_like(),
            fuser: self.fuser.zeros_like(),
            head: self.head.zeros_like(),
        }
    }

    /// Parameters and moving statistics are all finite
    pub fn is_finite(&self) -> bool {
        self.all_finite()
            && self
                .recalibration
                .iter()
                .chain(self.positional.iter())
                .all(PathStage::state_finite)
    }

    pub fn update_moving_stats(&mut self, cache: &ForwardCache) {
        for (stage, c) in self.recalibration.iter_mut().zip(cache.recalibration.iter()) {
            stage.update_moving_stats(c);
        }
        for (stage, c) in self.positional.iter_mut().zip(cache.positional.iter()) {
            stage.update_moving_stats(c);
        }
    }

    /// Rows of the positional table (the sequence length it was built for)
    pub fn positional_length(&self) -> Option<usize> {
        self.positional.iter().find_map(|stage| match stage {
            PathStage::PositionalEmbedding(p) => Some(p.table.nrows()),
            _ => None,
        })
    }
}

impl ParamSet for ModelParameters {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        for (p, g) in self.recalibration.iter_mut().zip(grads.recalibration.iter()) {
            p.visit_pairs(g, f);
        }
        for (p, g) in self.positional.iter_mut().zip(grads.positional.iter()) {
            p.visit_pairs(g, f);
        }
        self.cnn_tokens.visit_pairs(&grads.cnn_tokens, f);
        self.positional_tokens.visit_pairs(&grads.positional_tokens, f);
        self.fuser.visit_pairs(&grads.fuser, f);
        self.head.visit_pairs(&grads.head, f);
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        for p in self.recalibration.iter_mut().chain(self.positional.iter_mut()) {
            p.visit(f);
        }
        self.cnn_tokens.visit(f);
        self.positional_tokens.visit(f);
        self.fuser.visit(f);
        self.head.visit(f);
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        for p in self.recalibration.iter().chain(self.positional.iter()) {
            p.visit_ref(f);
        }
        self.cnn_tokens.visit_ref(f);
        self.positional_tokens.visit_ref(f);
        self.fuser.visit_ref(f);
        self.head.visit_ref(f);
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Everything the backward pass needs from one forward pass
#[derive(Debug, Clone)]
pub struct ForwardCache {
    recalibration: Vec<StageCache>,
    positional: Vec<StageCache>,
    cnn_tokens: TokenLearnerCache,
    positional_tokens: TokenLearnerCache,
    fuser: FuserCache,
    head: HeadCache,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridModel {
    pub config: ArchitectureConfig,
    pub params: ModelParameters,
}

impl HybridModel {
    pub fn new(config: ArchitectureConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let params = ModelParameters::init(&config, &mut rng)?;
        log::info!(
            "Model initialized: L={}, tokens={}, {} trainable parameters",
            config.sequence_length,
            config.num_tokens,
            params.count()
        );
        Ok(Self { config, params })
    }

    /// Rebuild from persisted parts, checking they agree
    pub fn from_parts(config: ArchitectureConfig, params: ModelParameters) -> Result<Self> {
        config.validate()?;
        if params.positional_length() != Some(config.sequence_length) {
            return Err(IdsError::ShapeMismatch(format!(
                "positional table built for {:?} positions, architecture says {}",
                params.positional_length(),
                config.sequence_length
            )));
        }
        if params.cnn_tokens.num_tokens() != config.num_tokens {
            return Err(IdsError::ShapeMismatch(format!(
                "token learner has {} tokens, architecture says {}",
                params.cnn_tokens.num_tokens(),
                config.num_tokens
            )));
        }
        Ok(Self { config, params })
    }

    fn check_input(&self, x: &Array3<f64>) -> Result<()> {
        let (_, len, channels) = x.dim();
        if len != self.config.sequence_length {
            return Err(IdsError::SchemaMismatch {
                expected: self.config.sequence_length,
                actual: len,
            });
        }
        if channels != 1 {
            return Err(IdsError::ShapeMismatch(format!("expected 1 input channel, got {}", channels)));
        }
        Ok(())
    }

    /// (B, L, 1) → logits (B)
    pub fn forward(&self, x: &Array3<f64>, mode: Mode, rng: &mut StdRng) -> Result<(Array1<f64>, ForwardCache)> {
        self.check_input(x)?;
        let p = &self.params;

        let (cnn_seq, recalibration) = run_path(&p.recalibration, x, mode)?;
        let (pos_seq, positional) = run_path(&p.positional, x, mode)?;

        let (cnn_tokens_out, cnn_tokens) = p.cnn_tokens.forward(&cnn_seq);
        let (pos_tokens_out, positional_tokens) = p.positional_tokens.forward(&pos_seq);

        let (fused, fuser) = p.fuser.forward(&cnn_tokens_out, &pos_tokens_out)?;
        let (logits, head) = p.head.forward(&fused, mode, rng);

        let cache = ForwardCache {
            recalibration,
            positional,
            cnn_tokens,
            positional_tokens,
            fuser,
            head,
        };
        Ok((logits, cache))
    }

    /// Gradients of every trainable tensor given dLoss/dlogit
    pub fn backward(&self, cache: &ForwardCache, dlogits: &Array1<f64>) -> Result<ModelParameters> {
        let p = &self.params;
        let mut grads = p.zeros_like();

        let dfused = p.head.backward(&cache.head, dlogits, &mut grads.head);
        let (dcnn_tokens, dpos_tokens) = p.fuser.backward(&cache.fuser, &dfused, &mut grads.fuser);

        let dcnn_seq = p.cnn_tokens.backward(&cache.cnn_tokens, &dcnn_tokens, &mut grads.cnn_tokens);
        let dpos_seq = p
            .positional_tokens
            .backward(&cache.positional_tokens, &dpos_tokens, &mut grads.positional_tokens);

        backprop_path(&p.recalibration, &cache.recalibration, &dcnn_seq, &mut grads.recalibration)?;
        backprop_path(&p.positional, &cache.positional, &dpos_seq, &mut grads.positional)?;
        Ok(grads)
    }

    /// Inference-mode logits
    pub fn logits(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        // no randomness is drawn in inference mode
        let mut rng = StdRng::seed_from_u64(0);
        let (logits, _) = self.forward(x, Mode::Infer, &mut rng)?;
        Ok(logits)
    }

    /// Attack probabilities in [0, 1]
    pub fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        Ok(self.logits(x)?.mapv_into(sigmoid))
    }

    /// `predict` in chunks of `batch_size` samples
    pub fn predict_batched(&self, x: &Array3<f64>, batch_size: usize) -> Result<Array1<f64>> {
        let n = x.len_of(Axis(0));
        let step = batch_size.max(1);
        let mut out = Vec::with_capacity(n);
        let mut start = 0;
        while start < n {
            let end = (start + step).min(n);
            let chunk = x.slice(s![start..end, .., ..]).to_owned();
            out.extend(self.predict(&chunk)?);
            start = end;
        }
        Ok(Array1::from(out))
    }
}
