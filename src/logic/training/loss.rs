//! Binary cross-entropy computed from logits

use ndarray::Array1;

use crate::logic::error::{IdsError, Result};
use crate::logic::model::sigmoid;

/// Mean of `w · BCE(σ(z), y)` over the batch, and its gradient w.r.t. `z`.
///
/// Uses `max(z, 0) - z·y + ln(1 + e^-|z|)`, which stays finite for any
/// finite logit.
pub fn weighted_bce_with_logits(logits: &Array1<f64>, labels: &[u8], weights: &[f64]) -> Result<(f64, Array1<f64>)> {
    let n = logits.len();
    if labels.len() != n || weights.len() != n {
        return Err(IdsError::ShapeMismatch(format!(
            "{} logits, {} labels, {} weights",
            n,
            labels.len(),
            weights.len()
        )));
    }
    if n == 0 {
        return Err(IdsError::EmptyDataset("empty batch".into()));
    }

    let batch = n as f64;
    let mut total = 0.0;
    let mut grad = Array1::zeros(n);
    for (i, &z) in logits.iter().enumerate() {
        let y = f64::from(labels[i]);
        let w = weights[i];
        total += w * (z.max(0.0) - z * y + (-z.abs()).exp().ln_1p());
        grad[i] = w * (sigmoid(z) - y) / batch;
    }
    Ok((total / batch, grad))
}

/// Unweighted mean BCE
pub fn bce_with_logits(logits: &Array1<f64>, labels: &[u8]) -> Result<f64> {
    let ones = vec![1.0; labels.len()];
    weighted_bce_with_logits(logits, labels, &ones).map(|(loss, _)| loss)
}

/// Fraction of samples where `σ(z) > 0.5` agrees with the label
pub fn accuracy_from_logits(logits: &Array1<f64>, labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = logits
        .iter()
        .zip(labels.iter())
        .filter(|(&z, &y)| u8::from(z > 0.0) == y)
        .count();
    correct as f64 / labels.len() as f64
}
