use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ndarray::{Array1, Array3};

use super::*;
use crate::logic::config::{ArchitectureConfig, TrainingConfig};
use crate::logic::dataset::ConnectionRecord;
use crate::logic::error::IdsError;
use crate::logic::model::HybridModel;

fn small_config(epochs: usize) -> TrainingConfig {
    TrainingConfig {
        epochs,
        batch_size: 8,
        learning_rate: 1e-2,
        ..Default::default()
    }
}

fn small_model(len: usize) -> HybridModel {
    let arch = ArchitectureConfig {
        d_model: 8,
        conv_filters: 8,
        key_dim: 4,
        head_hidden: 8,
        ..ArchitectureConfig::new(len)
    }
    .with_num_tokens(2);
    HybridModel::new(arch, 3).unwrap()
}

/// Attack rows carry a large value at position 0
fn separable(n: usize, len: usize) -> (Array3<f64>, Vec<u8>) {
    let labels: Vec<u8> = (0..n).map(|i| (i % 3 == 0) as u8).collect();
    let x = Array3::from_shape_fn((n, len, 1), |(i, t, _)| {
        let base = ((i * 7 + t * 3) % 5) as f64 * 0.1;
        if t == 0 && labels[i] == 1 {
            base + 3.0
        } else {
            base
        }
    });
    (x, labels)
}

// ============================================================================
// CLASS WEIGHTS
// ============================================================================

#[test]
fn test_balanced_weight_identity() {
    let labels = [0, 0, 0, 0, 0, 0, 1, 1];
    let table = ClassWeightTable::balanced(&labels).unwrap();

    assert!((table.weights[0] - 8.0 / 12.0).abs() < 1e-12);
    assert!((table.weights[1] - 2.0).abs() < 1e-12);

    // Σ count_c · w_c = n
    let total: f64 = table.sample_weights(&labels).iter().sum();
    assert!((total - labels.len() as f64).abs() < 1e-12);
}

#[test]
fn test_single_class_labels_rejected() {
    assert!(matches!(
        ClassWeightTable::balanced(&[1, 1, 1]),
        Err(IdsError::ClassImbalanceDegenerate { present: 1 })
    ));
    assert!(matches!(
        ClassWeightTable::balanced(&[0, 0]),
        Err(IdsError::ClassImbalanceDegenerate { present: 0 })
    ));
    assert!(matches!(ClassWeightTable::balanced(&[]), Err(IdsError::EmptyDataset(_))));
}

// ============================================================================
// LOSS
// ============================================================================

#[test]
fn test_bce_from_logits() {
    let logits = Array1::from(vec![0.0, 0.0]);
    let (loss, grad) = weighted_bce_with_logits(&logits, &[1, 0], &[1.0, 3.0]).unwrap();

    // mean(1·ln2, 3·ln2)
    assert!((loss - 2.0 * std::f64::consts::LN_2).abs() < 1e-12);
    assert!((grad[0] + 0.25).abs() < 1e-12);
    assert!((grad[1] - 0.75).abs() < 1e-12);
}

#[test]
fn test_bce_is_finite_for_extreme_logits() {
    let logits = Array1::from(vec![800.0, -800.0]);
    let loss = bce_with_logits(&logits, &[0, 1]).unwrap();
    assert!(loss.is_finite());
    assert!((loss - 800.0).abs() < 1e-9);
    assert_eq!(accuracy_from_logits(&logits, &[1, 0]), 1.0);
}

// ============================================================================
// TRAINER
// ============================================================================

#[test]
fn test_training_completes_with_history() {
    let (x, y) = separable(24, 6);
    let (vx, vy) = separable(9, 6);
    let mut model = small_model(6);

    let mut trainer = Trainer::new(small_config(3), &y).unwrap();
    assert_eq!(trainer.status(), TrainingStatus::Initialized);

    let history = trainer.fit(&mut model, &x, &y, &vx, &vy).unwrap().clone();
    assert_eq!(trainer.status(), TrainingStatus::Completed);
    assert_eq!(history.epochs(), 3);
    assert_eq!(history.val_accuracy.len(), 3);
    assert!(history.loss.iter().chain(history.val_loss.iter()).all(|v| v.is_finite()));
    assert!(model.params.is_finite());
    assert_eq!(trainer.state().epoch, 3);
}

#[test]
fn test_non_finite_loss_moves_to_failed() {
    let (mut x, y) = separable(16, 6);
    let (vx, vy) = separable(6, 6);
    x.fill(f64::NAN);

    let mut model = small_model(6);
    let initial = model.params.clone();

    let mut trainer = Trainer::new(small_config(2), &y).unwrap();
    let result = trainer.fit(&mut model, &x, &y, &vx, &vy);

    assert!(matches!(
        result,
        Err(IdsError::NumericalDivergence { epoch: 0, batch: 0, .. })
    ));
    assert_eq!(trainer.status(), TrainingStatus::Failed);
    assert!(trainer.state().last_error.is_some());
    assert_eq!(model.params, initial);
    assert_eq!(trainer.optimizer().steps(), 0);
}

#[test]
fn test_non_finite_update_moves_to_failed() {
    let (x, y) = separable(16, 6);
    let (vx, vy) = separable(6, 6);
    let mut model = small_model(6);
    let initial = model.params.clone();

    // beta1 = 1 makes the first bias correction 0/0
    let config = TrainingConfig {
        beta1: 1.0,
        ..small_config(2)
    };
    let mut trainer = Trainer::new(config, &y).unwrap();
    let result = trainer.fit(&mut model, &x, &y, &vx, &vy);

    match result {
        Err(IdsError::NumericalDivergence { epoch: 0, batch: 0, loss }) => assert!(loss.is_finite()),
        other => panic!("expected divergence, got {:?}", other.map(|h| h.epochs())),
    }
    assert_eq!(trainer.status(), TrainingStatus::Failed);
    assert!(model.params.is_finite());
    assert_eq!(model.params, initial);
    assert_eq!(trainer.optimizer().steps(), 0);
}

#[test]
fn test_cancellation_between_batches() {
    let (x, y) = separable(16, 6);
    let (vx, vy) = separable(6, 6);
    let mut model = small_model(6);

    let flag = Arc::new(AtomicBool::new(true));
    let mut trainer = Trainer::new(small_config(2), &y).unwrap().with_cancel_flag(flag);
    let result = trainer.fit(&mut model, &x, &y, &vx, &vy);

    assert!(matches!(result, Err(IdsError::Cancelled { epoch: 0, batch: 0 })));
    assert_eq!(trainer.status(), TrainingStatus::Cancelled);
}

#[test]
fn test_trainer_rejects_label_shape_mismatch() {
    let (x, y) = separable(16, 6);
    let mut model = small_model(6);
    let mut trainer = Trainer::new(small_config(1), &y).unwrap();
    assert!(matches!(
        trainer.fit(&mut model, &x, &y[..10], &x, &y),
        Err(IdsError::ShapeMismatch(_))
    ));
}

// ============================================================================
// END TO END
// ============================================================================

#[test]
fn test_run_training_end_to_end() {
    let records: Vec<ConnectionRecord> = (0..30)
        .map(|i| {
            if i % 3 == 0 {
                ConnectionRecord::builder()
                    .protocol_type("udp")
                    .service("private")
                    .flag("S0")
                    .numeric("count", 200.0 + i as f64)
                    .outcome("neptune")
                    .build()
            } else {
                ConnectionRecord::builder()
                    .numeric("src_bytes", 100.0 * i as f64)
                    .numeric("count", (i % 4) as f64)
                    .build()
            }
        })
        .collect();

    let config = TrainingConfig {
        num_tokens: 2,
        ..small_config(2)
    };
    let outcome = run_training(&records, &config).unwrap();

    assert_eq!(outcome.report.samples, 6);
    assert_eq!(outcome.report.confusion_matrix.total(), 6);
    assert_eq!(outcome.report.history.as_ref().map(|h| h.epochs()), Some(2));
    assert_eq!(outcome.model.config.sequence_length, outcome.pipeline.width());
    assert!(outcome.artifact().unwrap().verify().is_ok());
}
