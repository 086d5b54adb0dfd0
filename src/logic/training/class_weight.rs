//! Balanced class weights: `n_samples / (n_classes * class_count)`

use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWeightTable {
    /// Indexed by label (0 = normal, 1 = attack)
    pub weights: [f64; 2],
    pub counts: [usize; 2],
}

impl ClassWeightTable {
    pub fn balanced(labels: &[u8]) -> Result<Self> {
        if labels.is_empty() {
            return Err(IdsError::EmptyDataset("no training labels".into()));
        }

        let mut counts = [0usize; 2];
        for &label in labels {
            counts[usize::from(label.min(1))] += 1;
        }
        if counts[0] == 0 || counts[1] == 0 {
            let present = if counts[0] == 0 { 1 } else { 0 };
            return Err(IdsError::ClassImbalanceDegenerate { present });
        }

        let n = labels.len() as f64;
        let weights = [n / (2.0 * counts[0] as f64), n / (2.0 * counts[1] as f64)];
        log::info!(
            "Class weights: normal={:.4} ({}), attack={:.4} ({})",
            weights[0],
            counts[0],
            weights[1],
            counts[1]
        );
        Ok(Self { weights, counts })
    }

    pub fn weight(&self, label: u8) -> f64 {
        self.weights[usize::from(label.min(1))]
    }

    pub fn sample_weights(&self, labels: &[u8]) -> Vec<f64> {
        labels.iter().map(|&l| self.weight(l)).collect()
    }
}
