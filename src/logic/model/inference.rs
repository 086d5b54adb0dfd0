//! Inference over raw connection records

use std::time::Instant;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use super::artifact::ModelArtifact;
use super::network::HybridModel;
use super::threshold::DecisionThreshold;
use crate::logic::dataset::ConnectionRecord;
use crate::logic::error::Result;
use crate::logic::pipeline::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Attack probability in [0, 1]
    pub probability: f64,
    pub is_attack: bool,
    pub threshold: f64,
    pub inference_time_us: u64,
}

/// Anything that can score a connection record
pub trait InferenceEngine {
    fn predict_record(&self, record: &ConnectionRecord) -> Result<PredictionResult>;

    fn predict_records(&self, records: &[ConnectionRecord]) -> Result<Vec<PredictionResult>> {
        records.iter().map(|r| self.predict_record(r)).collect()
    }
}

/// Trained model bound to the pipeline it was trained with
#[derive(Debug, Clone)]
pub struct Predictor {
    model: HybridModel,
    pipeline: Pipeline,
    threshold: DecisionThreshold,
}

impl Predictor {
    pub fn new(model: HybridModel, pipeline: Pipeline) -> Result<Self> {
        pipeline.schema().check_width(model.config.sequence_length)?;
        Ok(Self {
            model,
            pipeline,
            threshold: DecisionThreshold::default(),
        })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let (model, pipeline, threshold) = artifact.into_parts()?;
        let mut predictor = Self::new(model, pipeline)?;
        predictor.threshold = threshold;
        Ok(predictor)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &HybridModel {
        &self.model
    }

    /// Score an already encoded and scaled vector of width W
    pub fn predict_scaled(&self, scaled: &[f64]) -> Result<PredictionResult> {
        let x = self.pipeline.reshaper().reshape_row(scaled)?;
        self.score(&x)
    }

    fn score(&self, x: &Array3<f64>) -> Result<PredictionResult> {
        let start = Instant::now();
        let probability = self.model.predict(x)?[0];
        Ok(PredictionResult {
            probability,
            is_attack: self.threshold.is_attack(probability),
            threshold: self.threshold.value(),
            inference_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

impl InferenceEngine for Predictor {
    fn predict_record(&self, record: &ConnectionRecord) -> Result<PredictionResult> {
        let x = self.pipeline.transform_record(record)?;
        self.score(&x)
    }

    fn predict_records(&self, records: &[ConnectionRecord]) -> Result<Vec<PredictionResult>> {
        let start = Instant::now();
        let x = self.pipeline.transform(records)?;
        let probabilities = self.model.predict_batched(&x, crate::constants::DEFAULT_BATCH_SIZE)?;
        let per_record = (start.elapsed().as_micros() as u64) / records.len().max(1) as u64;

        Ok(probabilities
            .iter()
            .map(|&probability| PredictionResult {
                probability,
                is_attack: self.threshold.is_attack(probability),
                threshold: self.threshold.value(),
                inference_time_us: per_record,
            })
            .collect())
    }
}
