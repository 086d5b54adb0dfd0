//! Preprocessing pipeline
//!
//! Owns the fitted encoder and scaler so training and inference apply the
//! exact same transformation. Persisted inside the model artifact.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::logic::config::TrainingConfig;
use crate::logic::dataset::{labels, train_test_split, ConnectionRecord, SplitIndices};
use crate::logic::error::{IdsError, Result};
use crate::logic::features::{FeatureEncoder, FeatureSchema, RobustScaler, SequenceReshaper, VocabularyScope};

/// Train/test tensors ready for the model
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train_x: Array3<f64>,
    pub train_y: Vec<u8>,
    pub test_x: Array3<f64>,
    pub test_y: Vec<u8>,
    pub split: SplitIndices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    encoder: FeatureEncoder,
    scaler: RobustScaler,
}

impl Pipeline {
    /// Split, fit encoder and scaler, and transform both partitions.
    ///
    /// The scaler only ever sees training rows. The encoder vocabulary comes
    /// from all rows or from the training rows depending on `config.vocabulary`.
    pub fn fit(records: &[ConnectionRecord], config: &TrainingConfig) -> Result<(Self, PreparedData)> {
        if records.is_empty() {
            return Err(IdsError::EmptyDataset("no records to preprocess".into()));
        }

        let split = train_test_split(records.len(), config.test_size, config.seed)?;
        let train: Vec<ConnectionRecord> = split.train.iter().map(|&i| records[i].clone()).collect();
        let test: Vec<ConnectionRecord> = split.test.iter().map(|&i| records[i].clone()).collect();

        let encoder = match config.vocabulary {
            VocabularyScope::FullDataset => FeatureEncoder::fit(records, VocabularyScope::FullDataset)?,
            VocabularyScope::TrainingOnly => FeatureEncoder::fit(&train, VocabularyScope::TrainingOnly)?,
        };

        let train_encoded = encoder.encode(&train)?;
        let test_encoded = encoder.encode(&test)?;

        let mut scaler = RobustScaler::new();
        let train_scaled = scaler.fit_transform(&train_encoded)?;
        let test_scaled = scaler.transform(&test_encoded)?;

        let pipeline = Self { encoder, scaler };
        pipeline.log_degenerate_columns();

        let reshaper = pipeline.reshaper();
        let prepared = PreparedData {
            train_x: reshaper.reshape(&train_scaled)?,
            train_y: labels(&train),
            test_x: reshaper.reshape(&test_scaled)?,
            test_y: labels(&test),
            split,
        };

        log::info!(
            "Preprocessed {} train / {} test samples, width {}",
            prepared.train_y.len(),
            prepared.test_y.len(),
            pipeline.width()
        );
        Ok((pipeline, prepared))
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn width(&self) -> usize {
        self.encoder.width()
    }

    pub fn scaler(&self) -> &RobustScaler {
        &self.scaler
    }

    pub fn reshaper(&self) -> SequenceReshaper {
        SequenceReshaper::new(self.width())
    }

    /// Encode, scale and reshape one record to (1, W, 1)
    pub fn transform_record(&self, record: &ConnectionRecord) -> Result<Array3<f64>> {
        let encoded = self.encoder.encode_record(record)?;
        let scaled = self.scaler.transform_row(&encoded)?;
        self.reshaper().reshape_row(&scaled)
    }

    /// Encode, scale and reshape a batch to (n, W, 1)
    pub fn transform(&self, records: &[ConnectionRecord]) -> Result<Array3<f64>> {
        let encoded = self.encoder.encode(records)?;
        let scaled = self.scaler.transform(&encoded)?;
        self.reshaper().reshape(&scaled)
    }

    /// Scale an already-encoded (n, W) matrix and reshape it
    pub fn transform_encoded(&self, encoded: &Array2<f64>) -> Result<Array3<f64>> {
        self.schema().check_width(encoded.len_of(Axis(1)))?;
        let scaled = self.scaler.transform(encoded)?;
        self.reshaper().reshape(&scaled)
    }

    /// Schema integrity and encoder/scaler agreement, checked after loading
    pub fn validate(&self) -> Result<()> {
        self.schema().validate()?;
        if !self.scaler.is_fitted() {
            return Err(IdsError::ScalerNotFitted);
        }
        self.schema().check_width(self.scaler.width())
    }

    fn log_degenerate_columns(&self) {
        let degenerate = self.scaler.degenerate_columns();
        if degenerate.is_empty() {
            return;
        }
        let names: Vec<&str> = degenerate
            .iter()
            .filter_map(|&j| self.schema().columns.get(j).map(|s| s.as_str()))
            .collect();
        log::warn!("Zero-IQR columns left unscaled: {}", names.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<ConnectionRecord> {
        (0..n)
            .map(|i| {
                let builder = ConnectionRecord::builder()
                    .numeric("src_bytes", (i * 37 % 11) as f64)
                    .numeric("count", i as f64);
                if i % 2 == 0 {
                    builder.build()
                } else {
                    builder.protocol_type("udp").service("private").flag("S0").outcome("neptune").build()
                }
            })
            .collect()
    }

    #[test]
    fn test_fit_produces_consistent_partitions() {
        let config = TrainingConfig::default();
        let (pipeline, data) = Pipeline::fit(&records(20), &config).unwrap();

        assert_eq!(data.test_y.len(), 4);
        assert_eq!(data.train_y.len(), 16);
        assert_eq!(data.train_x.dim(), (16, pipeline.width(), 1));
        assert_eq!(data.test_x.dim(), (4, pipeline.width(), 1));
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_transform_record_matches_batch() {
        let config = TrainingConfig::default();
        let rows = records(10);
        let (pipeline, _) = Pipeline::fit(&rows, &config).unwrap();

        let single = pipeline.transform_record(&rows[3]).unwrap();
        let batch = pipeline.transform(&rows).unwrap();
        for t in 0..pipeline.width() {
            assert_eq!(single[[0, t, 0]], batch[[3, t, 0]]);
        }
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (pipeline, _) = Pipeline::fit(&records(10), &TrainingConfig::default()).unwrap();
        let encoded = Array2::zeros((1, pipeline.width() + 1));
        assert!(matches!(
            pipeline.transform_encoded(&encoded),
            Err(IdsError::SchemaMismatch { .. })
        ));
    }
}
