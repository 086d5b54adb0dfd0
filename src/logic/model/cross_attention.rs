//! Bidirectional cross-attention between the two token sets
//!
//! (a) CNN tokens attend to positional tokens, (b) positional tokens attend
//! to CNN tokens. Both results are concatenated along channels.

use ndarray::{concatenate, s, Array3, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::params::{DenseParams, ParamSet};
use super::tensor::{bmm, bmm_nt, bmm_tn, softmax_axis, softmax_backward};
use crate::logic::error::{IdsError, Result};

// ============================================================================
// SINGLE-HEAD ATTENTION
// ============================================================================

/// Scaled dot-product attention with one head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionParams {
    pub query: DenseParams,
    pub key: DenseParams,
    pub value: DenseParams,
    /// key_dim → query width
    pub output: DenseParams,
}

#[derive(Debug, Clone)]
pub struct AttentionCache {
    query_in: Array3<f64>,
    kv_in: Array3<f64>,
    q: Array3<f64>,
    k: Array3<f64>,
    v: Array3<f64>,
    weights: Array3<f64>,
    context: Array3<f64>,
}

impl AttentionParams {
    pub fn new(rng: &mut StdRng, query_dim: usize, kv_dim: usize, key_dim: usize) -> Self {
        Self {
            query: DenseParams::glorot(rng, query_dim, key_dim),
            key: DenseParams::glorot(rng, kv_dim, key_dim),
            value: DenseParams::glorot(rng, kv_dim, key_dim),
            output: DenseParams::glorot(rng, key_dim, query_dim),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            query: self.query.zeros_like(),
            key: self.key.zeros_like(),
            value: self.value.zeros_like(),
            output: self.output.zeros_like(),
        }
    }

    fn scale(&self) -> f64 {
        1.0 / (self.query.output_dim().max(1) as f64).sqrt()
    }

    /// query (B, Tq, Cq), key/value (B, Tk, Ck) → (B, Tq, Cq)
    pub fn forward(&self, query_in: &Array3<f64>, kv_in: &Array3<f64>) -> (Array3<f64>, AttentionCache) {
        let q = self.query.forward_seq(query_in);
        let k = self.key.forward_seq(kv_in);
        let v = self.value.forward_seq(kv_in);

        let scores = bmm_nt(&q, &k) * self.scale();
        let weights = softmax_axis(&scores, Axis(2));
        let context = bmm(&weights, &v);
        let output = self.output.forward_seq(&context);

        let cache = AttentionCache {
            query_in: query_in.clone(),
            kv_in: kv_in.clone(),
            q,
            k,
            v,
            weights,
            context,
        };
        (output, cache)
    }

    /// Returns (d query_in, d kv_in)
    pub fn backward(
        &self,
        cache: &AttentionCache,
        dy: &Array3<f64>,
        grad: &mut AttentionParams,
    ) -> (Array3<f64>, Array3<f64>) {
        let dcontext = self.output.backward_seq(&cache.context, dy, &mut grad.output);

        let dweights = bmm_nt(&dcontext, &cache.v);
        let dv = bmm_tn(&cache.weights, &dcontext);
        let dscores = softmax_backward(&cache.weights, &dweights, Axis(2)) * self.scale();

        let dq = bmm(&dscores, &cache.k);
        let dk = bmm_tn(&dscores, &cache.q);

        let dquery_in = self.query.backward_seq(&cache.query_in, &dq, &mut grad.query);
        let dkv_in = self.key.backward_seq(&cache.kv_in, &dk, &mut grad.key)
            + self.value.backward_seq(&cache.kv_in, &dv, &mut grad.value);
        (dquery_in, dkv_in)
    }
}

impl ParamSet for AttentionParams {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        self.query.visit_pairs(&grads.query, f);
        self.key.visit_pairs(&grads.key, f);
        self.value.visit_pairs(&grads.value, f);
        self.output.visit_pairs(&grads.output, f);
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        self.query.visit(f);
        self.key.visit(f);
        self.value.visit(f);
        self.output.visit(f);
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        self.query.visit_ref(f);
        self.key.visit_ref(f);
        self.value.visit_ref(f);
        self.output.visit_ref(f);
    }
}

// ============================================================================
// FUSER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuserParams {
    /// CNN tokens query the positional tokens
    pub cnn_to_positional: AttentionParams,
    /// Positional tokens query the CNN tokens
    pub positional_to_cnn: AttentionParams,
}

#[derive(Debug, Clone)]
pub struct FuserCache {
    forward: AttentionCache,
    reverse: AttentionCache,
    cnn_width: usize,
}

impl FuserParams {
    pub fn new(rng: &mut StdRng, cnn_dim: usize, positional_dim: usize, key_dim: usize) -> Self {
        Self {
            cnn_to_positional: AttentionParams::new(rng, cnn_dim, positional_dim, key_dim),
            positional_to_cnn: AttentionParams::new(rng, positional_dim, cnn_dim, key_dim),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            cnn_to_positional: self.cnn_to_positional.zeros_like(),
            positional_to_cnn: self.positional_to_cnn.zeros_like(),
        }
    }

    /// (B, T, Cc) + (B, T, Cp) → (B, T, Cc + Cp)
    pub fn forward(&self, cnn: &Array3<f64>, positional: &Array3<f64>) -> Result<(Array3<f64>, FuserCache)> {
        if cnn.len_of(Axis(1)) != positional.len_of(Axis(1)) {
            return Err(IdsError::ShapeMismatch(format!(
                "token counts differ: {} vs {}",
                cnn.len_of(Axis(1)),
                positional.len_of(Axis(1))
            )));
        }

        let (a, forward) = self.cnn_to_positional.forward(cnn, positional);
        let (b, reverse) = self.positional_to_cnn.forward(positional, cnn);

        let fused = concatenate(Axis(2), &[a.view(), b.view()]).map_err(|e| IdsError::ShapeMismatch(e.to_string()))?;
        let cache = FuserCache {
            forward,
            reverse,
            cnn_width: a.len_of(Axis(2)),
        };
        Ok((fused, cache))
    }

    /// Returns (d cnn tokens, d positional tokens)
    pub fn backward(&self, cache: &FuserCache, dy: &Array3<f64>, grad: &mut FuserParams) -> (Array3<f64>, Array3<f64>) {
        let da = dy.slice(s![.., .., ..cache.cnn_width]).to_owned();
        let db = dy.slice(s![.., .., cache.cnn_width..]).to_owned();

        let (dcnn_q, dpos_kv) = self
            .cnn_to_positional
            .backward(&cache.forward, &da, &mut grad.cnn_to_positional);
        let (dpos_q, dcnn_kv) = self
            .positional_to_cnn
            .backward(&cache.reverse, &db, &mut grad.positional_to_cnn);

        (dcnn_q + dcnn_kv, dpos_kv + dpos_q)
    }
}

impl ParamSet for FuserParams {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        self.cnn_to_positional.visit_pairs(&grads.cnn_to_positional, f);
        self.positional_to_cnn.visit_pairs(&grads.positional_to_cnn, f);
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        self.cnn_to_positional.visit(f);
        self.positional_to_cnn.visit(f);
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        self.cnn_to_positional.visit_ref(f);
        self.positional_to_cnn.visit_ref(f);
    }
}
