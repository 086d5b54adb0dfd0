//! Dense parameters and the parameter-visiting trait used by the optimizer

use ndarray::{Array1, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::tensor::{all_finite, from_rows, glorot_uniform, to_rows};

/// Walks every trainable tensor in a fixed order.
///
/// Non-trainable state (batch-norm moving statistics) is never visited, so
/// the optimizer cannot touch it.
pub trait ParamSet {
    /// Visit each trainable tensor together with its gradient
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>));

    /// Visit each trainable tensor mutably
    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>));

    /// Visit each trainable tensor read-only
    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>));

    /// Number of trainable scalars
    fn count(&self) -> usize {
        let mut n = 0;
        self.visit_ref(&mut |t| n += t.len());
        n
    }

    fn zero(&mut self) {
        self.visit(&mut |mut t| t.fill(0.0));
    }

    fn all_finite(&self) -> bool {
        let mut ok = true;
        self.visit_ref(&mut |t| ok &= all_finite(t.iter()));
        ok
    }
}

/// Fully connected layer: `y = x·W + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseParams {
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseParams {
    /// Glorot-uniform weights, zero bias
    pub fn glorot(rng: &mut StdRng, input: usize, output: usize) -> Self {
        Self {
            weight: glorot_uniform(rng, input, output, (input, output)),
            bias: Array1::zeros(output),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub fn output_dim(&self) -> usize {
        self.weight.ncols()
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight) + &self.bias
    }

    /// Accumulate gradients into `grad` and return `dx`
    pub fn backward(&self, x: &Array2<f64>, dy: &Array2<f64>, grad: &mut DenseParams) -> Array2<f64> {
        grad.weight += &x.t().dot(dy);
        grad.bias += &dy.sum_axis(Axis(0));
        dy.dot(&self.weight.t())
    }

    /// Apply position-wise to a (B, L, C) sequence
    pub fn forward_seq(&self, x: &Array3<f64>) -> Array3<f64> {
        let (batch, len, _) = x.dim();
        from_rows(&self.forward(&to_rows(x)), batch, len)
    }

    pub fn backward_seq(&self, x: &Array3<f64>, dy: &Array3<f64>, grad: &mut DenseParams) -> Array3<f64> {
        let (batch, len, _) = x.dim();
        from_rows(&self.backward(&to_rows(x), &to_rows(dy), grad), batch, len)
    }
}

impl ParamSet for DenseParams {
    fn visit_pairs(&mut self, grads: &Self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>, ArrayViewD<'_, f64>)) {
        f(self.weight.view_mut().into_dyn(), grads.weight.view().into_dyn());
        f(self.bias.view_mut().into_dyn(), grads.bias.view().into_dyn());
    }

    fn visit(&mut self, f: &mut dyn FnMut(ArrayViewMutD<'_, f64>)) {
        f(self.weight.view_mut().into_dyn());
        f(self.bias.view_mut().into_dyn());
    }

    fn visit_ref(&self, f: &mut dyn FnMut(ArrayViewD<'_, f64>)) {
        f(self.weight.view().into_dyn());
        f(self.bias.view().into_dyn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_dense_forward_backward() {
        let dense = DenseParams {
            weight: array![[1.0, 2.0], [3.0, 4.0]],
            bias: array![0.5, -0.5],
        };
        let x = array![[1.0, 1.0]];
        assert_eq!(dense.forward(&x), array![[4.5, 5.5]]);

        let mut grad = dense.zeros_like();
        let dx = dense.backward(&x, &array![[1.0, 0.0]], &mut grad);
        assert_eq!(dx, array![[1.0, 3.0]]);
        assert_eq!(grad.weight, array![[1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(grad.bias, array![1.0, 0.0]);
    }

    #[test]
    fn test_param_count_and_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dense = DenseParams::glorot(&mut rng, 3, 4);
        assert_eq!(dense.count(), 16);
        assert!(dense.all_finite());

        dense.zero();
        assert!(dense.weight.iter().all(|&w| w == 0.0));
    }
}
