//! Training Module - class-weighted training of the hybrid model
//!
//! ## Components:
//! - `class_weight`: balanced per-class weights
//! - `loss`: weighted binary cross-entropy from logits
//! - `trainer`: epoch loop, lifecycle state, divergence and cancellation

pub mod class_weight;
pub mod loss;
pub mod trainer;

#[cfg(test)]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use uuid::Uuid;

pub use class_weight::ClassWeightTable;
pub use loss::{accuracy_from_logits, bce_with_logits, weighted_bce_with_logits};
pub use trainer::{Trainer, TrainingHistory, TrainingState, TrainingStatus};

use crate::logic::config::{ArchitectureConfig, TrainingConfig};
use crate::logic::dataset::ConnectionRecord;
use crate::logic::error::Result;
use crate::logic::evaluation::{evaluate, EvaluationReport};
use crate::logic::model::{HybridModel, ModelArtifact};
use crate::logic::pipeline::Pipeline;

/// Everything a finished run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run_id: Uuid,
    pub model: HybridModel,
    pub pipeline: Pipeline,
    pub report: EvaluationReport,
}

impl TrainingOutcome {
    pub fn artifact(&self) -> Result<ModelArtifact> {
        ModelArtifact::new(&self.model, &self.pipeline, self.run_id)
    }
}

/// Preprocess, train and evaluate on the held-out partition
pub fn run_training(records: &[ConnectionRecord], config: &TrainingConfig) -> Result<TrainingOutcome> {
    run_training_with_cancel(records, config, None)
}

pub fn run_training_with_cancel(
    records: &[ConnectionRecord],
    config: &TrainingConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<TrainingOutcome> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    log::info!("Run {}: {} records", run_id, records.len());

    let (pipeline, data) = Pipeline::fit(records, config)?;

    let arch = ArchitectureConfig::new(pipeline.width()).with_num_tokens(config.num_tokens);
    let mut model = HybridModel::new(arch, config.seed)?;

    let mut trainer = Trainer::new(config.clone(), &data.train_y)?;
    if let Some(flag) = cancel {
        trainer = trainer.with_cancel_flag(flag);
    }
    trainer.fit(&mut model, &data.train_x, &data.train_y, &data.test_x, &data.test_y)?;

    let probabilities = model.predict_batched(&data.test_x, config.batch_size)?;
    let report = evaluate(&probabilities.to_vec(), &data.test_y)?
        .with_run_id(run_id)
        .with_history(trainer.history().clone());

    Ok(TrainingOutcome {
        run_id,
        model,
        pipeline,
        report,
    })
}
