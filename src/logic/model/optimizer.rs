//! Adam optimizer (Adaptive Moment Estimation)
//!
//! Moments are kept per trainable tensor, in the order `ParamSet` visits them.

use ndarray::{ArrayD, Zip};

use super::params::ParamSet;
use crate::logic::config::TrainingConfig;

#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    /// (first moment, second moment) per tensor
    moments: Vec<(ArrayD<f64>, ArrayD<f64>)>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            moments: Vec::new(),
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.learning_rate)
            .with_betas(config.beta1, config.beta2)
            .with_epsilon(config.epsilon)
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update to every trainable tensor of `params`
    pub fn step<P: ParamSet>(&mut self, params: &mut P, grads: &P) {
        self.t += 1;

        let (beta1, beta2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);
        let correction1 = 1.0 - beta1.powi(self.t);
        let correction2 = 1.0 - beta2.powi(self.t);

        let moments = &mut self.moments;
        let mut index = 0;
        params.visit_pairs(grads, &mut |mut weights, gradients| {
            if moments.len() <= index {
                moments.push((ArrayD::zeros(gradients.raw_dim()), ArrayD::zeros(gradients.raw_dim())));
            }
            let (m, v) = &mut moments[index];

            Zip::from(&mut weights)
                .and(&gradients)
                .and(m)
                .and(v)
                .for_each(|w, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *w -= lr * m_hat / (v_hat.sqrt() + eps);
                });

            index += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::params::DenseParams;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_adam_update() {
        let mut params = DenseParams {
            weight: Array2::ones((3, 2)),
            bias: Array1::zeros(2),
        };
        let grads = DenseParams {
            weight: Array2::ones((3, 2)),
            bias: Array1::ones(2),
        };

        let mut optimizer = Adam::new(0.001);
        optimizer.step(&mut params, &grads);

        // first bias-corrected step moves each weight by ~lr
        assert!((params.weight[[0, 0]] - 0.999).abs() < 1e-6);
        assert!((params.bias[0] + 0.001).abs() < 1e-6);

        for _ in 0..9 {
            optimizer.step(&mut params, &grads);
        }
        assert_eq!(optimizer.steps(), 10);
        assert!(params.weight[[0, 0]] < 0.995);
    }

    #[test]
    fn test_zero_gradient_leaves_weights() {
        let mut params = DenseParams {
            weight: Array2::ones((2, 2)),
            bias: Array1::zeros(2),
        };
        let grads = params.zeros_like();
        let mut optimizer = Adam::new(0.01);
        optimizer.step(&mut params, &grads);
        assert_eq!(params.weight, Array2::<f64>::ones((2, 2)));
    }
}
