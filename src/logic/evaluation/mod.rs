//! Evaluation Module - binary metrics over held-out predictions
//!
//! Produces data only (confusion matrix, report, curve arrays, history);
//! rendering is left to whoever consumes the JSON payload.

pub mod confusion;
pub mod curves;
pub mod report;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use confusion::ConfusionMatrix;
pub use curves::{auc, precision_recall_curve, roc_curve, PrecisionRecallCurve, RocCurve};
pub use report::{ClassMetrics, ClassificationReport};

use crate::logic::error::Result;
use crate::logic::model::DecisionThreshold;
use crate::logic::training::TrainingHistory;

/// Complete results payload of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub threshold: f64,
    pub samples: usize,
    pub confusion_matrix: ConfusionMatrix,
    pub classification_report: ClassificationReport,
    pub roc: RocCurve,
    pub precision_recall: PrecisionRecallCurve,
    pub history: Option<TrainingHistory>,
}

/// Score `probabilities` against `labels` at the fixed decision threshold
pub fn evaluate(probabilities: &[f64], labels: &[u8]) -> Result<EvaluationReport> {
    let threshold = DecisionThreshold::default();
    let predicted = threshold.binarize(probabilities);

    let confusion_matrix = ConfusionMatrix::from_labels(labels, &predicted)?;
    let classification_report = ClassificationReport::from_confusion(&confusion_matrix);
    let roc = roc_curve(labels, probabilities)?;
    let precision_recall = precision_recall_curve(labels, probabilities)?;

    log::info!(
        "Evaluation: {} samples, accuracy {:.4}, AUC {:.4}",
        labels.len(),
        classification_report.accuracy,
        roc.auc
    );

    Ok(EvaluationReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        threshold: threshold.value(),
        samples: labels.len(),
        confusion_matrix,
        classification_report,
        roc,
        precision_recall,
        history: None,
    })
}

impl EvaluationReport {
    pub fn with_history(mut self, history: TrainingHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Write the payload as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        log::info!("Evaluation report saved: {}", path.display());
        Ok(())
    }
}
