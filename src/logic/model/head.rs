//! Classification head: GAP over tokens → Dense(ReLU) → Dropout → Dense(1)
//!
//! Produces logits; the sigmoid is applied by the caller (loss and
//! prediction both start from the logit for numerical stability).

use ndarray::{Array1, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::params::{DenseParams, ParamSet};
use super::tensor::{mean_over_positions, relu, unpool_positions, Mode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadParams {
    pub hidden: DenseParams,
    pub output: DenseParams,
    pub dropout: f64,
}

#[derive(Debug, Clone)]
pub struct HeadCache {
    pooled: Array2<f64>,
    hidden: Array2<f64>,
    /// Inverted-dropout multipliers (training only)
    mask: Option<Array2<f64>>,
    dropped: Array2<f64>,
    tokens: usize,
}

impl HeadParams {
    pub fn new(rng: &mut StdRng, input: usize, hidden: usize, dropout: f64) -> Self {
        Self {
            hidden: DenseParams::glorot(rng, input, hidden),
            output: DenseParams::glorot(rng, hidden, 1),
            dropout,
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            hidden: self.hidden.zeros_like(),
            output: self.output.zeros_like(),
            dropout: self.dropout,
        }
    }

    /// (B, T, C) → logits (B)
    pub fn forward(&self, tokens: &Array3<f64>, mode: Mode, rng: &mut StdRng) -> (Array1<f64>, HeadCache) {
        let pooled = mean_over_positions(tokens);
        let hidden = self.hidden.forward(&pooled).mapv_into(relu);

        let mask = match mode {
            Mode::Train if self.dropout > 0.0 => {
                let keep = 1.0 - self.dropout;
                let rate = self.dropout;
                Some(Array2::from_shape_fn(hidden.raw_dim(), |_| {
                    if rng.gen::<f64>() < rate {
                        0.0
                    } else {
                        1.0 / keep
                    }
                }))
            }
            _ => None,
        };
        let dropped = match &mask {
            Some(m) => &hidden * m,
            None => hidden.clone(),
        };

        let logits = self.output.forward(&dropped).index_axis_move(Axis(1), 0);
        let cache = HeadCache {
            pooled,
            hidden,
            mask,
            dropped,
            tokens: tokens.len_of(Axis(1)),
        };
        (logits, cache)
    }

    pub fn backward(&self, cache: &HeadCache, dlogits: &Array1<f64>, grad: &mut HeadParams) -> Array3<f64> {
        let dout = dlogits.view().insert_axis(Axis(1)).to_owned();
        let mut dhidden = self.output.backward(&cache.dropped, &dout, &mut grad.output);

        if let Some(mask) = &cache.mask {
            dhidden *= mask;
        }
        dhidden.zip_mut_with(&cache.hidden, |d, &h| {
            if h <= 0.0 {
                *d = 0.0;
            }
        });

        let dpooled = self.hidden.backward(&cache.pooled, &dhidden, &mut grad.hidden);
        unpool_positions(&dpooled, cache.tokens)
    }
}

impl ParamSet for HeadParams {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        self.hidden.visit_pairs(&grads.hidden, f);
        self.output.visit_pairs(&grads.output, f);
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        self.hidden.visit(f);
        self.output.visit(f);
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        self.hidden.visit_ref(f);
        self.output.visit_ref(f);
    }
}
