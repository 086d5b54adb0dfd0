//! Training loop
//!
//! Lifecycle: `Initialized → Training → {Completed | Failed | Cancelled}`.
//! One batch = forward, weighted loss, backward, Adam step; parameters are
//! only written after the full gradient exists. A non-finite loss rolls the
//! parameters back to the last state that produced a finite loss.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::class_weight::ClassWeightTable;
use super::loss::{accuracy_from_logits, bce_with_logits, weighted_bce_with_logits};
use crate::logic::config::TrainingConfig;
use crate::logic::error::{IdsError, Result};
use crate::logic::model::{Adam, HybridModel, Mode, ModelParameters};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrainingStatus {
    Initialized,
    Training,
    Completed,
    Failed,
    Cancelled,
}

/// Per-epoch metrics, index = epoch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState {
    pub status: TrainingStatus,
    /// Completed epochs
    pub epoch: usize,
    pub history: TrainingHistory,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TrainingState {
    fn new() -> Self {
        Self {
            status: TrainingStatus::Initialized,
            epoch: 0,
            history: TrainingHistory::default(),
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }
}

pub struct Trainer {
    config: TrainingConfig,
    class_weights: ClassWeightTable,
    optimizer: Adam,
    state: TrainingState,
    cancel: Option<Arc<AtomicBool>>,
    rng: StdRng,
}

impl Trainer {
    /// Validates the configuration and computes balanced class weights
    pub fn new(config: TrainingConfig, train_labels: &[u8]) -> Result<Self> {
        config.validate()?;
        let class_weights = ClassWeightTable::balanced(train_labels)?;
        Ok(Self {
            optimizer: Adam::from_config(&config),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            class_weights,
            state: TrainingState::new(),
            cancel: None,
        })
    }

    /// Stop between batches once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn status(&self) -> TrainingStatus {
        self.state.status
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.state.history
    }

    pub fn optimizer(&self) -> &Adam {
        &self.optimizer
    }

    pub fn class_weights(&self) -> &ClassWeightTable {
        &self.class_weights
    }

    /// Run every epoch. On error the state records why and `model` holds the
    /// last consistent parameters.
    pub fn fit(
        &mut self,
        model: &mut HybridModel,
        train_x: &Array3<f64>,
        train_y: &[u8],
        val_x: &Array3<f64>,
        val_y: &[u8],
    ) -> Result<&TrainingHistory> {
        if train_x.len_of(Axis(0)) != train_y.len() || val_x.len_of(Axis(0)) != val_y.len() {
            return Err(IdsError::ShapeMismatch(format!(
                "train {} samples / {} labels, validation {} samples / {} labels",
                train_x.len_of(Axis(0)),
                train_y.len(),
                val_x.len_of(Axis(0)),
                val_y.len()
            )));
        }
        if train_y.is_empty() || val_y.is_empty() {
            return Err(IdsError::EmptyDataset("training and validation partitions must be non-empty".into()));
        }
        if self.state.status != TrainingStatus::Initialized {
            return Err(IdsError::InvalidConfig(format!(
                "trainer already used (status {:?})",
                self.state.status
            )));
        }

        self.state.status = TrainingStatus::Training;
        self.state.started_at = Some(Utc::now());
        log::info!(
            "Training started: {} samples, {} epochs, batch {}",
            train_y.len(),
            self.config.epochs,
            self.config.batch_size
        );

        for epoch in 0..self.config.epochs {
            match self.run_epoch(epoch, model, train_x, train_y, val_x, val_y) {
                Ok(()) => self.state.epoch = epoch + 1,
                Err(e) => {
                    self.state.status = match e {
                        IdsError::Cancelled { .. } => TrainingStatus::Cancelled,
                        _ => TrainingStatus::Failed,
                    };
                    self.state.last_error = Some(e.to_string());
                    self.state.finished_at = Some(Utc::now());
                    log::error!("Training stopped at epoch {}: {}", epoch + 1, e);
                    return Err(e);
                }
            }
        }

        self.state.status = TrainingStatus::Completed;
        self.state.finished_at = Some(Utc::now());
        log::info!("Training completed after {} epochs", self.state.epoch);
        Ok(&self.state.history)
    }

    fn run_epoch(
        &mut self,
        epoch: usize,
        model: &mut HybridModel,
        train_x: &Array3<f64>,
        train_y: &[u8],
        val_x: &Array3<f64>,
        val_y: &[u8],
    ) -> Result<()> {
        let mut order: Vec<usize> = (0..train_y.len()).collect();
        order.shuffle(&mut self.rng);

        let mut loss_sum = 0.0;
        let mut correct = 0.0;
        // parameters and optimizer state that last produced a finite loss
        let mut last_good = (model.params.clone(), self.optimizer.clone());

        for (batch, idx) in order.chunks(self.config.batch_size).enumerate() {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::SeqCst) {
                    return Err(IdsError::Cancelled { epoch, batch });
                }
            }

            let x = train_x.select(Axis(0), idx);
            let y: Vec<u8> = idx.iter().map(|&i| train_y[i]).collect();
            let w = self.class_weights.sample_weights(&y);

            let (logits, cache) = model.forward(&x, Mode::Train, &mut self.rng)?;
            let (loss, dlogits) = weighted_bce_with_logits(&logits, &y, &w)?;
            if !loss.is_finite() {
                return Err(self.roll_back(model, last_good, epoch, batch, loss));
            }
            last_good = (model.params.clone(), self.optimizer.clone());

            let grads = model.backward(&cache, &dlogits)?;
            model.params.update_moving_stats(&cache);
            self.optimizer.step(&mut model.params, &grads);
            if !model.params.is_finite() {
                return Err(self.roll_back(model, last_good, epoch, batch, loss));
            }

            loss_sum += loss * y.len() as f64;
            correct += accuracy_from_logits(&logits, &y) * y.len() as f64;
        }

        let n = train_y.len().max(1) as f64;
        let (val_loss, val_accuracy) = self.validate(model, val_x, val_y)?;
        if !val_loss.is_finite() {
            let batch = order.len().div_ceil(self.config.batch_size);
            return Err(self.roll_back(model, last_good, epoch, batch, val_loss));
        }

        let history = &mut self.state.history;
        history.loss.push(loss_sum / n);
        history.accuracy.push(correct / n);
        history.val_loss.push(val_loss);
        history.val_accuracy.push(val_accuracy);

        log::info!(
            "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
            epoch + 1,
            self.config.epochs,
            loss_sum / n,
            correct / n,
            val_loss,
            val_accuracy
        );
        Ok(())
    }

    /// Restore the last finite snapshot and build the divergence error
    fn roll_back(
        &mut self,
        model: &mut HybridModel,
        snapshot: (ModelParameters, Adam),
        epoch: usize,
        batch: usize,
        loss: f64,
    ) -> IdsError {
        let (params, optimizer) = snapshot;
        model.params = params;
        self.optimizer = optimizer;
        log::error!(
            "Non-finite values at epoch {}, batch {}; parameters rolled back",
            epoch + 1,
            batch
        );
        IdsError::NumericalDivergence { epoch, batch, loss }
    }

    /// Unweighted loss and accuracy on the held-out partition
    fn validate(&self, model: &HybridModel, val_x: &Array3<f64>, val_y: &[u8]) -> Result<(f64, f64)> {
        let mut logits = Vec::with_capacity(val_y.len());
        for start in (0..val_y.len()).step_by(self.config.batch_size) {
            let end = (start + self.config.batch_size).min(val_y.len());
            let chunk = val_x.slice(ndarray::s![start..end, .., ..]).to_owned();
            logits.extend(model.logits(&chunk)?);
        }
        let logits = Array1::from(logits);
        Ok((bce_with_logits(&logits, val_y)?, accuracy_from_logits(&logits, val_y)))
    }
}
