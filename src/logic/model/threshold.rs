//! Decision threshold

use serde::{Deserialize, Serialize};

use crate::constants::DECISION_THRESHOLD;

/// Probability strictly above the threshold is an attack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThreshold(pub f64);

impl Default for DecisionThreshold {
    fn default() -> Self {
        Self(DECISION_THRESHOLD)
    }
}

impl DecisionThreshold {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_attack(&self, probability: f64) -> bool {
        probability > self.0
    }

    /// 1 = attack, 0 = normal
    pub fn binarize(&self, probabilities: &[f64]) -> Vec<u8> {
        probabilities.iter().map(|&p| u8::from(self.is_attack(p))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        let t = DecisionThreshold::default();
        assert!(!t.is_attack(0.5));
        assert!(t.is_attack(0.5000001));
        assert_eq!(t.binarize(&[0.1, 0.5, 0.9]), vec![0, 0, 1]);
    }
}
