//! Tensor helpers shared by the forward/backward passes
//!
//! Sequences are `(batch, positions, channels)`; dense layers run on the
//! `(batch * positions, channels)` row view.

use ndarray::{Array2, Array3, ArrayViewMut1, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Whether a forward pass belongs to a training step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Infer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
}

impl Activation {
    pub fn apply(self, x: Array3<f64>) -> Array3<f64> {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.mapv_into(relu),
        }
    }

    /// Gradient through the activation, given its output
    pub fn backward(self, output: &Array3<f64>, dy: &Array3<f64>) -> Array3<f64> {
        match self {
            Activation::Linear => dy.clone(),
            Activation::Relu => {
                let mut dz = dy.clone();
                dz.zip_mut_with(output, |d, &o| {
                    if o <= 0.0 {
                        *d = 0.0;
                    }
                });
                dz
            }
        }
    }
}

/// ReLU that lets NaN through so divergence stays visible downstream
pub fn relu(v: f64) -> f64 {
    if v > 0.0 || v.is_nan() {
        v
    } else {
        0.0
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// (B, L, C) → (B*L, C)
pub fn to_rows(x: &Array3<f64>) -> Array2<f64> {
    let (b, l, c) = x.dim();
    Array2::from_shape_fn((b * l, c), |(r, j)| x[[r / l, r % l, j]])
}

/// (B*L, C) → (B, L, C)
pub fn from_rows(x: &Array2<f64>, batch: usize, len: usize) -> Array3<f64> {
    let c = x.ncols();
    Array3::from_shape_fn((batch, len, c), |(b, t, j)| x[[b * len + t, j]])
}

// ============================================================================
// BATCHED MATMUL
// ============================================================================

/// (B, M, K) · (B, K, N) → (B, M, N)
pub fn bmm(a: &Array3<f64>, b: &Array3<f64>) -> Array3<f64> {
    let (batch, m, _) = a.dim();
    let n = b.len_of(Axis(2));
    let mut out = Array3::zeros((batch, m, n));
    for i in 0..batch {
        out.index_axis_mut(Axis(0), i)
            .assign(&a.index_axis(Axis(0), i).dot(&b.index_axis(Axis(0), i)));
    }
    out
}

/// (B, K, M)ᵀ · (B, K, N) → (B, M, N)
pub fn bmm_tn(a: &Array3<f64>, b: &Array3<f64>) -> Array3<f64> {
    let (batch, _, m) = a.dim();
    let n = b.len_of(Axis(2));
    let mut out = Array3::zeros((batch, m, n));
    for i in 0..batch {
        out.index_axis_mut(Axis(0), i)
            .assign(&a.index_axis(Axis(0), i).t().dot(&b.index_axis(Axis(0), i)));
    }
    out
}

/// (B, M, K) · (B, N, K)ᵀ → (B, M, N)
pub fn bmm_nt(a: &Array3<f64>, b: &Array3<f64>) -> Array3<f64> {
    let (batch, m, _) = a.dim();
    let n = b.len_of(Axis(1));
    let mut out = Array3::zeros((batch, m, n));
    for i in 0..batch {
        out.index_axis_mut(Axis(0), i)
            .assign(&a.index_axis(Axis(0), i).dot(&b.index_axis(Axis(0), i).t()));
    }
    out
}

// ============================================================================
// ACTIVATIONS
// ============================================================================

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn softmax_inplace(mut lane: ArrayViewMut1<'_, f64>) {
    let max = lane.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    lane.mapv_inplace(|v| (v - max).exp());
    let sum = lane.sum();
    if sum > 0.0 {
        lane.mapv_inplace(|v| v / sum);
    }
}

/// Softmax along `axis`
pub fn softmax_axis(x: &Array3<f64>, axis: Axis) -> Array3<f64> {
    let mut out = x.clone();
    for lane in out.lanes_mut(axis) {
        softmax_inplace(lane);
    }
    out
}

/// Gradient of the scores given softmax output `a` and upstream `da`
pub fn softmax_backward(a: &Array3<f64>, da: &Array3<f64>, axis: Axis) -> Array3<f64> {
    let dot = (a * da).sum_axis(axis).insert_axis(axis);
    a * &(da - &dot)
}

// ============================================================================
// INITIALIZERS
// ============================================================================

/// Glorot uniform: U(-l, l), l = sqrt(6 / (fan_in + fan_out))
pub fn glorot_uniform(rng: &mut StdRng, fan_in: usize, fan_out: usize, shape: (usize, usize)) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
    Array2::random_using(shape, Uniform::new(-limit, limit), rng)
}

pub fn all_finite<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

/// Mean over positions: (B, L, C) → (B, C)
pub fn mean_over_positions(x: &Array3<f64>) -> Array2<f64> {
    let len = x.len_of(Axis(1)).max(1) as f64;
    x.sum_axis(Axis(1)) / len
}

/// Spread a pooled gradient back over `len` positions: (B, C) → (B, L, C)
pub fn unpool_positions(d: &Array2<f64>, len: usize) -> Array3<f64> {
    let scale = 1.0 / len.max(1) as f64;
    let (batch, c) = d.dim();
    Array3::from_shape_fn((batch, len, c), |(b, _, j)| d[[b, j]] * scale)
}
