//! TokenLearner - summarize a sequence into a fixed number of learned tokens
//!
//! Scores come from a Dense(C → T) per position; the softmax runs across
//! positions so each token is a convex combination of the sequence:
//! `tokens = Aᵀ · X`, followed by a Dense(C → C). Output is (T, C) for any L.

use ndarray::{Array3, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::params::{DenseParams, ParamSet};
use super::tensor::{bmm, bmm_nt, bmm_tn, softmax_axis, softmax_backward};
use crate::logic::error::{IdsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLearnerParams {
    /// C → num_tokens
    pub attention: DenseParams,
    /// C → C
    pub projection: DenseParams,
}

#[derive(Debug, Clone)]
pub struct TokenLearnerCache {
    input: Array3<f64>,
    weights: Array3<f64>,
    tokens: Array3<f64>,
}

impl TokenLearnerParams {
    pub fn new(rng: &mut StdRng, channels: usize, num_tokens: usize) -> Result<Self> {
        if num_tokens == 0 {
            return Err(IdsError::InvalidConfig("num_tokens must be >= 1".into()));
        }
        Ok(Self {
            attention: DenseParams::glorot(rng, channels, num_tokens),
            projection: DenseParams::glorot(rng, channels, channels),
        })
    }

    pub fn num_tokens(&self) -> usize {
        self.attention.output_dim()
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            attention: self.attention.zeros_like(),
            projection: self.projection.zeros_like(),
        }
    }

    /// (B, L, C) → (B, T, C)
    pub fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, TokenLearnerCache) {
        let scores = self.attention.forward_seq(x);
        let weights = softmax_axis(&scores, Axis(1));
        let tokens = bmm_tn(&weights, x);
        let output = self.projection.forward_seq(&tokens);

        let cache = TokenLearnerCache {
            input: x.clone(),
            weights,
            tokens,
        };
        (output, cache)
    }

    pub fn backward(&self, cache: &TokenLearnerCache, dy: &Array3<f64>, grad: &mut TokenLearnerParams) -> Array3<f64> {
        let dtokens = self.projection.backward_seq(&cache.tokens, dy, &mut grad.projection);

        // tokens = Aᵀ X  ⇒  dA = X dTᵀ, dX = A dT
        let dweights = bmm_nt(&cache.input, &dtokens);
        let dx_direct = bmm(&cache.weights, &dtokens);

        let dscores = softmax_backward(&cache.weights, &dweights, Axis(1));
        let dx_scores = self.attention.backward_seq(&cache.input, &dscores, &mut grad.attention);

        dx_direct + dx_scores
    }
}

impl ParamSet for TokenLearnerParams {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        self.attention.visit_pairs(&grads.attention, f);
        self.projection.visit_pairs(&grads.projection, f);
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        self.attention.visit(f);
        self.projection.visit(f);
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        self.attention.visit_ref(f);
        self.projection.visit_ref(f);
    }
}
