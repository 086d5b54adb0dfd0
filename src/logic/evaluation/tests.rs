use tempfile::tempdir;

use super::*;
use crate::logic::error::IdsError;

#[test]
fn test_perfect_predictions_confusion_matrix() {
    let labels = [0, 0, 1, 1];
    let probs = [0.1, 0.2, 0.8, 0.9];
    let report = evaluate(&probs, &labels).unwrap();

    assert_eq!(report.confusion_matrix.matrix, [[2, 0], [0, 2]]);
    assert_eq!(report.classification_report.accuracy, 1.0);
    assert_eq!(report.classification_report.attack.f1_score, 1.0);
    assert_eq!(report.classification_report.normal.support, 2);
}

#[test]
fn test_separable_scores_have_unit_auc() {
    let labels = [0, 0, 1, 1];
    let probs = [0.1, 0.4, 0.35, 0.8];
    let roc = roc_curve(&labels, &[0.1, 0.2, 0.8, 0.9]).unwrap();
    assert!((roc.auc - 1.0).abs() < 1e-12);

    // one inversion out of four pairs
    let roc = roc_curve(&labels, &probs).unwrap();
    assert!((roc.auc - 0.75).abs() < 1e-12);
}

#[test]
fn test_roc_curve_points() {
    let labels = [0, 0, 1, 1];
    let roc = roc_curve(&labels, &[0.1, 0.4, 0.35, 0.8]).unwrap();
    assert_eq!(roc.fpr, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
    assert_eq!(roc.tpr, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
    assert!(roc.thresholds[0].is_infinite());
    assert_eq!(&roc.thresholds[1..], &[0.8, 0.4, 0.35, 0.1]);
}

#[test]
fn test_tied_scores_share_a_threshold() {
    let roc = roc_curve(&[0, 1, 1], &[0.5, 0.5, 0.9]).unwrap();
    assert_eq!(roc.thresholds.len(), 3);
    assert_eq!(roc.fpr, vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_precision_recall_curve() {
    let labels = [0, 0, 1, 1];
    let pr = precision_recall_curve(&labels, &[0.1, 0.4, 0.35, 0.8]).unwrap();

    assert_eq!(pr.thresholds, vec![0.1, 0.35, 0.4, 0.8]);
    assert_eq!(pr.recall, vec![1.0, 1.0, 0.5, 0.5, 0.0]);
    assert_eq!(pr.precision[0], 0.5);
    assert!((pr.precision[1] - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(pr.precision[2], 0.5);
    assert_eq!(pr.precision[3], 1.0);
    assert_eq!(pr.precision[4], 1.0);
}

#[test]
fn test_report_zero_division_is_zero() {
    // nothing predicted as attack
    let cm = ConfusionMatrix::from_labels(&[0, 1, 1], &[0, 0, 0]).unwrap();
    let report = ClassificationReport::from_confusion(&cm);
    assert_eq!(report.attack.precision, 0.0);
    assert_eq!(report.attack.f1_score, 0.0);
    assert!((report.normal.precision - 1.0 / 3.0).abs() < 1e-12);
    assert!((report.weighted_avg.recall - 1.0 / 3.0).abs() < 1e-12);
    assert!((report.macro_avg.recall - 0.5).abs() < 1e-12);
}

#[test]
fn test_auc_direction_independent() {
    let x = [0.0, 0.5, 1.0];
    let y = [0.0, 1.0, 1.0];
    let forward = auc(&x, &y).unwrap();
    let xr: Vec<f64> = x.iter().rev().copied().collect();
    let yr: Vec<f64> = y.iter().rev().copied().collect();
    assert!((forward - 0.75).abs() < 1e-12);
    assert!((auc(&xr, &yr).unwrap() - forward).abs() < 1e-12);
}

#[test]
fn test_mismatched_lengths_rejected() {
    assert!(matches!(evaluate(&[0.1], &[0, 1]), Err(IdsError::ShapeMismatch(_))));
}

#[test]
fn test_report_saved_as_json() {
    let report = evaluate(&[0.1, 0.9], &[0, 1]).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["confusion_matrix"]["matrix"][1][1], 1);
}
