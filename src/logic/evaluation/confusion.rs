//! 2×2 confusion matrix

use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

/// Rows = actual {Normal, Attack}, columns = predicted {Normal, Attack}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(IdsError::ShapeMismatch(format!(
                "{} labels vs {} predictions",
                actual.len(),
                predicted.len()
            )));
        }
        let mut matrix = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            matrix[usize::from(a.min(1))][usize::from(p.min(1))] += 1;
        }
        Ok(Self { matrix })
    }

    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Samples whose actual class is `class`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Samples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix[0][class] + self.matrix[1][class]
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negatives() + self.true_positives()) as f64 / total as f64
    }
}
