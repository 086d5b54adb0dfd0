//! Path stages
//!
//! Each path of the model is a list of `PathStage`s, every stage mapping a
//! batch of sequences `(B, L, C_in)` to `(B, L, C_out)`. Stages are plain
//! parameter containers; `forward` returns a cache that `backward` consumes.

use ndarray::{s, Array1, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis};
use serde::{Deserialize, Serialize};

use super::params::{DenseParams, ParamSet};
use super::tensor::{all_finite, from_rows, mean_over_positions, relu, sigmoid, to_rows, unpool_positions, Activation, Mode};
use crate::logic::error::{IdsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathStage {
    Conv1d(Conv1dParams),
    BatchNorm(BatchNormParams),
    SqueezeExcite(SqueezeExciteParams),
    Dense(DenseParams),
    PositionalEmbedding(PositionalEmbeddingParams),
    LayerNorm(LayerNormParams),
}

/// Intermediate values kept from a forward pass
#[derive(Debug, Clone)]
pub enum StageCache {
    Conv1d { input: Array3<f64>, output: Array3<f64> },
    BatchNorm(NormCache),
    SqueezeExcite {
        input: Array3<f64>,
        pooled: Array2<f64>,
        hidden: Array2<f64>,
        gate: Array2<f64>,
    },
    Dense { input: Array3<f64> },
    PositionalEmbedding,
    LayerNorm(NormCache),
}

/// Normalized rows and their inverse standard deviation
#[derive(Debug, Clone)]
pub struct NormCache {
    xhat: Array2<f64>,
    inv_std: Array1<f64>,
    batch_mean: Array1<f64>,
    batch_var: Array1<f64>,
    training: bool,
    batch: usize,
    len: usize,
}

impl PathStage {
    pub fn kind(&self) -> &'static str {
        match self {
            PathStage::Conv1d(_) => "conv1d",
            PathStage::BatchNorm(_) => "batch_norm",
            PathStage::SqueezeExcite(_) => "squeeze_excite",
            PathStage::Dense(_) => "dense",
            PathStage::PositionalEmbedding(_) => "positional_embedding",
            PathStage::LayerNorm(_) => "layer_norm",
        }
    }

    pub fn forward(&self, x: &Array3<f64>, mode: Mode) -> Result<(Array3<f64>, StageCache)> {
        match self {
            PathStage::Conv1d(p) => p.forward(x),
            PathStage::BatchNorm(p) => Ok(p.forward(x, mode)),
            PathStage::SqueezeExcite(p) => Ok(p.forward(x)),
            PathStage::Dense(p) => Ok((p.forward_seq(x), StageCache::Dense { input: x.clone() })),
            PathStage::PositionalEmbedding(p) => p.forward(x),
            PathStage::LayerNorm(p) => Ok(p.forward(x)),
        }
    }

    /// Accumulate parameter gradients into `grad` (same variant) and return `dx`
    pub fn backward(&self, cache: &StageCache, dy: &Array3<f64>, grad: &mut PathStage) -> Result<Array3<f64>> {
        match (self, cache, grad) {
            (PathStage::Conv1d(p), StageCache::Conv1d { input, output }, PathStage::Conv1d(g)) => {
                Ok(p.backward(input, output, dy, g))
            }
            (PathStage::BatchNorm(p), StageCache::BatchNorm(c), PathStage::BatchNorm(g)) => Ok(p.backward(c, dy, g)),
            (
                PathStage::SqueezeExcite(p),
                StageCache::SqueezeExcite {
                    input,
                    pooled,
                    hidden,
                    gate,
                },
                PathStage::SqueezeExcite(g),
            ) => Ok(p.backward(input, pooled, hidden, gate, dy, g)),
            (PathStage::Dense(p), StageCache::Dense { input }, PathStage::Dense(g)) => {
                Ok(p.backward_seq(input, dy, g))
            }
            (PathStage::PositionalEmbedding(_), StageCache::PositionalEmbedding, PathStage::PositionalEmbedding(g)) => {
                g.table += &dy.sum_axis(Axis(0));
                Ok(dy.clone())
            }
            (PathStage::LayerNorm(p), StageCache::LayerNorm(c), PathStage::LayerNorm(g)) => Ok(p.backward(c, dy, g)),
            (stage, _, grad) => Err(IdsError::ShapeMismatch(format!(
                "stage {} cannot backpropagate with a {} gradient",
                stage.kind(),
                grad.kind()
            ))),
        }
    }

    /// Fold batch statistics from a training forward pass into the moving averages
    pub fn update_moving_stats(&mut self, cache: &StageCache) {
        if let (PathStage::BatchNorm(p), StageCache::BatchNorm(c)) = (self, cache) {
            if c.training {
                let m = p.momentum;
                p.moving_mean = &p.moving_mean * m + &c.batch_mean * (1.0 - m);
                p.moving_var = &p.moving_var * m + &c.batch_var * (1.0 - m);
            }
        }
    }

    /// Zero gradient container with the same shapes
    pub fn zeros_like(&self) -> PathStage {
        match self {
            PathStage::Conv1d(p) => PathStage::Conv1d(Conv1dParams {
                kernel: Array3::zeros(p.kernel.raw_dim()),
                bias: Array1::zeros(p.bias.raw_dim()),
                activation: p.activation,
            }),
            PathStage::BatchNorm(p) => PathStage::BatchNorm(BatchNormParams {
                gamma: Array1::zeros(p.gamma.raw_dim()),
                beta: Array1::zeros(p.beta.raw_dim()),
                moving_mean: Array1::zeros(p.moving_mean.raw_dim()),
                moving_var: Array1::zeros(p.moving_var.raw_dim()),
                momentum: p.momentum,
                epsilon: p.epsilon,
            }),
            PathStage::SqueezeExcite(p) => PathStage::SqueezeExcite(SqueezeExciteParams {
                squeeze: p.squeeze.zeros_like(),
                excite: p.excite.zeros_like(),
            }),
            PathStage::Dense(p) => PathStage::Dense(p.zeros_like()),
            PathStage::PositionalEmbedding(p) => PathStage::PositionalEmbedding(PositionalEmbeddingParams {
                table: Array2::zeros(p.table.raw_dim()),
            }),
            PathStage::LayerNorm(p) => PathStage::LayerNorm(LayerNormParams {
                gamma: Array1::zeros(p.gamma.raw_dim()),
                beta: Array1::zeros(p.beta.raw_dim()),
                epsilon: p.epsilon,
            }),
        }
    }

    /// Moving statistics are state, not parameters, but must stay finite too
    pub fn state_finite(&self) -> bool {
        match self {
            PathStage::BatchNorm(p) => all_finite(p.moving_mean.iter().chain(p.moving_var.iter())),
            _ => true,
        }
    }
}

// ============================================================================
// PATH HELPERS
// ============================================================================

/// Run a whole path, keeping one cache per stage
pub fn run_path(stages: &[PathStage], x: &Array3<f64>, mode: Mode) -> Result<(Array3<f64>, Vec<StageCache>)> {
    let mut caches = Vec::with_capacity(stages.len());
    let mut current = x.clone();
    for stage in stages {
        let (next, cache) = stage.forward(&current, mode)?;
        caches.push(cache);
        current = next;
    }
    Ok((current, caches))
}

/// Backpropagate through a path in reverse order
pub fn backprop_path(
    stages: &[PathStage],
    caches: &[StageCache],
    dy: &Array3<f64>,
    grads: &mut [PathStage],
) -> Result<Array3<f64>> {
    if stages.len() != caches.len() || stages.len() != grads.len() {
        return Err(IdsError::ShapeMismatch(format!(
            "path has {} stages, {} caches, {} gradients",
            stages.len(),
            caches.len(),
            grads.len()
        )));
    }
    let mut d = dy.clone();
    for ((stage, cache), grad) in stages.iter().zip(caches.iter()).zip(grads.iter_mut()).rev() {
        d = stage.backward(cache, &d, grad)?;
    }
    Ok(d)
}

// ============================================================================
// CONV1D
// ============================================================================

/// 1-D convolution with same padding; `kernel` is (K, C_in, C_out)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv1dParams {
    pub kernel: Array3<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
}

impl Conv1dParams {
    /// Output positions `t` that read input position `t + k - pad`
    fn window(k: usize, pad: usize, len: usize) -> Option<(usize, usize, isize)> {
        let shift = k as isize - pad as isize;
        let lo = (-shift).max(0) as usize;
        let hi = (len as isize - shift).min(len as isize);
        if hi <= lo as isize {
            return None;
        }
        Some((lo, hi as usize, shift))
    }

    fn forward(&self, x: &Array3<f64>) -> Result<(Array3<f64>, StageCache)> {
        let (batch, len, channels) = x.dim();
        let (taps, c_in, c_out) = self.kernel.dim();
        if channels != c_in {
            return Err(IdsError::ShapeMismatch(format!(
                "conv1d expects {} input channels, got {}",
                c_in, channels
            )));
        }
        let pad = taps / 2;

        let mut z = Array3::zeros((batch, len, c_out));
        z += &self.bias;
        for k in 0..taps {
            let Some((lo, hi, shift)) = Self::window(k, pad, len) else {
                continue;
            };
            let src = x
                .slice(s![.., (lo as isize + shift) as usize..(hi as isize + shift) as usize, ..])
                .to_owned();
            let contrib = to_rows(&src).dot(&self.kernel.index_axis(Axis(0), k));
            let mut dst = z.slice_mut(s![.., lo..hi, ..]);
            dst += &from_rows(&contrib, batch, hi - lo);
        }

        let output = self.activation.apply(z);
        let cache = StageCache::Conv1d {
            input: x.clone(),
            output: output.clone(),
        };
        Ok((output, cache))
    }

    fn backward(&self, x: &Array3<f64>, output: &Array3<f64>, dy: &Array3<f64>, grad: &mut Conv1dParams) -> Array3<f64> {
        let (batch, len, _) = x.dim();
        let taps = self.kernel.len_of(Axis(0));
        let pad = taps / 2;

        let dz = self.activation.backward(output, dy);
        grad.bias += &to_rows(&dz).sum_axis(Axis(0));

        let mut dx = Array3::zeros(x.raw_dim());
        for k in 0..taps {
            let Some((lo, hi, shift)) = Self::window(k, pad, len) else {
                continue;
            };
            let src_range = (lo as isize + shift) as usize..(hi as isize + shift) as usize;
            let src = to_rows(&x.slice(s![.., src_range.clone(), ..]).to_owned());
            let dz_rows = to_rows(&dz.slice(s![.., lo..hi, ..]).to_owned());

            let mut gk = grad.kernel.index_axis_mut(Axis(0), k);
            gk += &src.t().dot(&dz_rows);

            let back = dz_rows.dot(&self.kernel.index_axis(Axis(0), k).t());
            let mut dst = dx.slice_mut(s![.., src_range, ..]);
            dst += &from_rows(&back, batch, hi - lo);
        }
        dx
    }
}

// ============================================================================
// BATCH NORMALIZATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNormParams {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
    /// Non-trainable
    pub moving_mean: Array1<f64>,
    /// Non-trainable
    pub moving_var: Array1<f64>,
    pub momentum: f64,
    pub epsilon: f64,
}

impl BatchNormParams {
    pub fn new(channels: usize, momentum: f64, epsilon: f64) -> Self {
        Self {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
            moving_mean: Array1::zeros(channels),
            moving_var: Array1::ones(channels),
            momentum,
            epsilon,
        }
    }

    fn forward(&self, x: &Array3<f64>, mode: Mode) -> (Array3<f64>, StageCache) {
        let (batch, len, _) = x.dim();
        let rows = to_rows(x);
        let n = rows.nrows().max(1) as f64;

        let (mean, var, training) = match mode {
            Mode::Train => {
                let mean = rows.sum_axis(Axis(0)) / n;
                let centered = &rows - &mean;
                let var = (&centered * &centered).sum_axis(Axis(0)) / n;
                (mean, var, true)
            }
            Mode::Infer => (self.moving_mean.clone(), self.moving_var.clone(), false),
        };

        let inv_std = var.mapv(|v| 1.0 / (v + self.epsilon).sqrt());
        let xhat = (&rows - &mean) * &inv_std;
        let y = &xhat * &self.gamma + &self.beta;

        let cache = NormCache {
            xhat,
            inv_std,
            batch_mean: mean,
            batch_var: var,
            training,
            batch,
            len,
        };
        (from_rows(&y, batch, len), StageCache::BatchNorm(cache))
    }

    fn backward(&self, cache: &NormCache, dy: &Array3<f64>, grad: &mut BatchNormParams) -> Array3<f64> {
        let dy_rows = to_rows(dy);
        grad.gamma += &(&dy_rows * &cache.xhat).sum_axis(Axis(0));
        grad.beta += &dy_rows.sum_axis(Axis(0));

        let dxhat = &dy_rows * &self.gamma;
        if !cache.training {
            return from_rows(&(&dxhat * &cache.inv_std), cache.batch, cache.len);
        }

        // column statistics couple every row in the batch
        let n = dxhat.nrows() as f64;
        let sum_dxhat = dxhat.sum_axis(Axis(0));
        let sum_dxhat_xhat = (&dxhat * &cache.xhat).sum_axis(Axis(0));
        let dx = (&dxhat * n - &sum_dxhat - &cache.xhat * &sum_dxhat_xhat) * &(&cache.inv_std / n);
        from_rows(&dx, cache.batch, cache.len)
    }
}

// ============================================================================
// SQUEEZE-EXCITE
// ============================================================================

/// Channel gate: GAP → Dense(C/r, ReLU) → Dense(C, sigmoid) → scale every position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqueezeExciteParams {
    pub squeeze: DenseParams,
    pub excite: DenseParams,
}

impl SqueezeExciteParams {
    fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, StageCache) {
        let pooled = mean_over_positions(x);
        let hidden = self.squeeze.forward(&pooled).mapv_into(relu);
        let gate = self.excite.forward(&hidden).mapv_into(sigmoid);

        let y = x * &gate.view().insert_axis(Axis(1));
        let cache = StageCache::SqueezeExcite {
            input: x.clone(),
            pooled,
            hidden,
            gate,
        };
        (y, cache)
    }

    fn backward(
        &self,
        x: &Array3<f64>,
        pooled: &Array2<f64>,
        hidden: &Array2<f64>,
        gate: &Array2<f64>,
        dy: &Array3<f64>,
        grad: &mut SqueezeExciteParams,
    ) -> Array3<f64> {
        let len = x.len_of(Axis(1));

        let dgate = (dy * x).sum_axis(Axis(1));
        let dexcite = &dgate * &gate.mapv(|g| g * (1.0 - g));
        let mut dhidden = self.excite.backward(hidden, &dexcite, &mut grad.excite);
        dhidden.zip_mut_with(hidden, |d, &h| {
            if h <= 0.0 {
                *d = 0.0;
            }
        });
        let dpooled = self.squeeze.backward(pooled, &dhidden, &mut grad.squeeze);

        dy * &gate.view().insert_axis(Axis(1)) + unpool_positions(&dpooled, len)
    }
}

// ============================================================================
// POSITIONAL EMBEDDING
// ============================================================================

/// Learned (L, C) table added to every sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionalEmbeddingParams {
    pub table: Array2<f64>,
}

impl PositionalEmbeddingParams {
    fn forward(&self, x: &Array3<f64>) -> Result<(Array3<f64>, StageCache)> {
        let (_, len, channels) = x.dim();
        if self.table.dim() != (len, channels) {
            return Err(IdsError::ShapeMismatch(format!(
                "positional table is {:?}, input positions are ({}, {})",
                self.table.dim(),
                len,
                channels
            )));
        }
        Ok((x + &self.table, StageCache::PositionalEmbedding))
    }
}

// ============================================================================
// LAYER NORMALIZATION
// ============================================================================

/// Normalizes each position over its channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerNormParams {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
    pub epsilon: f64,
}

impl LayerNormParams {
    pub fn new(channels: usize, epsilon: f64) -> Self {
        Self {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
            epsilon,
        }
    }

    fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, StageCache) {
        let (batch, len, channels) = x.dim();
        let rows = to_rows(x);
        let c = channels.max(1) as f64;

        let mean = rows.sum_axis(Axis(1)) / c;
        let centered = &rows - &mean.view().insert_axis(Axis(1));
        let var = (&centered * &centered).sum_axis(Axis(1)) / c;
        let inv_std = var.mapv(|v| 1.0 / (v + self.epsilon).sqrt());
        let xhat = &centered * &inv_std.view().insert_axis(Axis(1));
        let y = &xhat * &self.gamma + &self.beta;

        let cache = NormCache {
            xhat,
            inv_std,
            batch_mean: mean,
            batch_var: var,
            training: true,
            batch,
            len,
        };
        (from_rows(&y, batch, len), StageCache::LayerNorm(cache))
    }

    fn backward(&self, cache: &NormCache, dy: &Array3<f64>, grad: &mut LayerNormParams) -> Array3<f64> {
        let dy_rows = to_rows(dy);
        grad.gamma += &(&dy_rows * &cache.xhat).sum_axis(Axis(0));
        grad.beta += &dy_rows.sum_axis(Axis(0));

        let dxhat = &dy_rows * &self.gamma;
        let c = dxhat.ncols() as f64;
        let sum_dxhat = dxhat.sum_axis(Axis(1)).insert_axis(Axis(1));
        let sum_dxhat_xhat = (&dxhat * &cache.xhat).sum_axis(Axis(1)).insert_axis(Axis(1));
        let scale = (&cache.inv_std / c).insert_axis(Axis(1));
        let dx = (&dxhat * c - &sum_dxhat - &cache.xhat * &sum_dxhat_xhat) * &scale;
        from_rows(&dx, cache.batch, cache.len)
    }
}

// ============================================================================
// PARAMETER VISITING
// ============================================================================

impl ParamSet for PathStage {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        match (self, grads) {
            (PathStage::Conv1d(p), PathStage::Conv1d(g)) => {
                f(p.kernel.view_mut().into_dyn(), g.kernel.view().into_dyn());
                f(p.bias.view_mut().into_dyn(), g.bias.view().into_dyn());
            }
            (PathStage::BatchNorm(p), PathStage::BatchNorm(g)) => {
                f(p.gamma.view_mut().into_dyn(), g.gamma.view().into_dyn());
                f(p.beta.view_mut().into_dyn(), g.beta.view().into_dyn());
            }
            (PathStage::SqueezeExcite(p), PathStage::SqueezeExcite(g)) => {
                p.squeeze.visit_pairs(&g.squeeze, f);
                p.excite.visit_pairs(&g.excite, f);
            }
            (PathStage::Dense(p), PathStage::Dense(g)) => p.visit_pairs(g, f),
            (PathStage::PositionalEmbedding(p), PathStage::PositionalEmbedding(g)) => {
                f(p.table.view_mut().into_dyn(), g.table.view().into_dyn());
            }
            (PathStage::LayerNorm(p), PathStage::LayerNorm(g)) => {
                f(p.gamma.view_mut().into_dyn(), g.gamma.view().into_dyn());
                f(p.beta.view_mut().into_dyn(), g.beta.view().into_dyn());
            }
            (stage, grad) => log::error!("Gradient layout {} does not match stage {}", grad.kind(), stage.kind()),
        }
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        match self {
            PathStage::Conv1d(p) => {
                f(p.kernel.view_mut().into_dyn());
                f(p.bias.view_mut().into_dyn());
            }
            PathStage::BatchNorm(p) => {
                f(p.gamma.view_mut().into_dyn());
                f(p.beta.view_mut().into_dyn());
            }
            PathStage::SqueezeExcite(p) => {
                p.squeeze.visit(f);
                p.excite.visit(f);
            }
            PathStage::Dense(p) => p.visit(f),
            PathStage::PositionalEmbedding(p) => f(p.table.view_mut().into_dyn()),
            PathStage::LayerNorm(p) => {
                f(p.gamma.view_mut().into_dyn());
                f(p.beta.view_mut().into_dyn());
            }
        }
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        match self {
            PathStage::Conv1d(p) => {
                f(p.kernel.view().into_dyn());
                f(p.bias.view().into_dyn());
            }
            PathStage::BatchNorm(p) => {
                f(p.gamma.view().into_dyn());
                f(p.beta.view().into_dyn());
            }
            PathStage::SqueezeExcite(p) => {
                p.squeeze.visit_ref(f);
                p.excite.visit_ref(f);
            }
            PathStage::Dense(p) => p.visit_ref(f),
            PathStage::PositionalEmbedding(p) => f(p.table.view().into_dyn()),
            PathStage::LayerNorm(p) => {
                f(p.gamma.view().into_dyn());
                f(p.beta.view().into_dyn());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn identity_conv() -> Conv1dParams {
        let mut kernel = Array3::zeros((3, 1, 1));
        kernel[[1, 0, 0]] = 1.0;
        Conv1dParams {
            kernel,
            bias: Array1::zeros(1),
            activation: Activation::Linear,
        }
    }

    #[test]
    fn test_conv_same_padding_keeps_length() {
        let stage = PathStage::Conv1d(identity_conv());
        let x = Array3::from_shape_fn((2, 5, 1), |(b, t, _)| (b * 10 + t) as f64);
        let (y, _) = stage.forward(&x, Mode::Infer).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn test_conv_edges_are_zero_padded() {
        let mut conv = identity_conv();
        conv.kernel.fill(1.0);
        let x = array![[[1.0], [2.0], [3.0]]];
        let (y, _) = PathStage::Conv1d(conv).forward(&x, Mode::Infer).unwrap();
        assert_eq!(y, array![[[3.0], [6.0], [5.0]]]);
    }

    #[test]
    fn test_batch_norm_train_normalizes() {
        let stage = PathStage::BatchNorm(BatchNormParams::new(1, 0.99, 1e-3));
        let x = array![[[1.0], [3.0]], [[5.0], [7.0]]];
        let (y, _) = stage.forward(&x, Mode::Train).unwrap();
        let mean: f64 = y.iter().sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
    }

    #[test]
    fn test_batch_norm_moving_stats_update() {
        let mut stage = PathStage::BatchNorm(BatchNormParams::new(1, 0.9, 1e-3));
        let x = array![[[2.0], [2.0]]];
        let (_, cache) = stage.forward(&x, Mode::Train).unwrap();
        stage.update_moving_stats(&cache);
        if let PathStage::BatchNorm(p) = &stage {
            assert!((p.moving_mean[0] - 0.2).abs() < 1e-12);
            assert!((p.moving_var[0] - 0.9).abs() < 1e-12);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_layer_norm_rows_are_standardized() {
        let stage = PathStage::LayerNorm(LayerNormParams::new(4, 1e-3));
        let x = Array3::from_shape_fn((2, 3, 4), |(b, t, c)| (b + t * c) as f64);
        let (y, _) = stage.forward(&x, Mode::Infer).unwrap();
        for row in to_rows(&y).rows() {
            assert!(row.sum().abs() < 1e-9);
        }
    }

    #[test]
    fn test_positional_table_must_match_length() {
        let stage = PathStage::PositionalEmbedding(PositionalEmbeddingParams {
            table: Array2::zeros((4, 2)),
        });
        assert!(stage.forward(&Array3::zeros((1, 4, 2)), Mode::Train).is_ok());
        assert!(matches!(
            stage.forward(&Array3::zeros((1, 5, 2)), Mode::Train),
            Err(IdsError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_mismatched_gradient_variant_is_error() {
        let stage = PathStage::Conv1d(identity_conv());
        let x = Array3::zeros((1, 3, 1));
        let (y, cache) = stage.forward(&x, Mode::Train).unwrap();
        let mut wrong = PathStage::LayerNorm(LayerNormParams::new(1, 1e-3));
        assert!(stage.backward(&cache, &y, &mut wrong).is_err());
    }
}
