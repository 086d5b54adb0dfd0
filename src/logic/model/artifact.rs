//! Model artifact - persisted model + preprocessing pipeline
//!
//! A single JSON document holding the architecture, the fitted pipeline
//! (encoder schema + scaler) and every parameter tensor. A SHA-256 checksum
//! over those three parts is verified on load, then the schema hash and the
//! model/pipeline widths are cross-checked.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::network::{HybridModel, ModelParameters};
use super::threshold::DecisionThreshold;
use crate::constants::DATA_DIR_NAME;
use crate::logic::config::ArchitectureConfig;
use crate::logic::error::{IdsError, Result};
use crate::logic::pipeline::Pipeline;

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// Default artifact location under the local data dir
pub fn default_artifact_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join("model_v1.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub artifact_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub threshold: DecisionThreshold,
    pub architecture: ArchitectureConfig,
    pub pipeline: Pipeline,
    pub parameters: ModelParameters,
    /// Hex SHA-256 over architecture + pipeline + parameters
    pub checksum: String,
}

/// Borrowed view hashed for the checksum
#[derive(Serialize)]
struct Payload<'a> {
    architecture: &'a ArchitectureConfig,
    pipeline: &'a Pipeline,
    parameters: &'a ModelParameters,
}

fn compute_checksum(architecture: &ArchitectureConfig, pipeline: &Pipeline, parameters: &ModelParameters) -> Result<String> {
    let payload = serde_json::to_vec(&Payload {
        architecture,
        pipeline,
        parameters,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(hex::encode(hasher.finalize()))
}

impl ModelArtifact {
    pub fn new(model: &HybridModel, pipeline: &Pipeline, run_id: Uuid) -> Result<Self> {
        let checksum = compute_checksum(&model.config, pipeline, &model.params)?;
        Ok(Self {
            artifact_version: ARTIFACT_VERSION,
            run_id,
            created_at: Utc::now(),
            threshold: DecisionThreshold::default(),
            architecture: model.config.clone(),
            pipeline: pipeline.clone(),
            parameters: model.params.clone(),
            checksum,
        })
    }

    /// Checksum, schema hash and width agreement
    pub fn verify(&self) -> Result<()> {
        if self.artifact_version != ARTIFACT_VERSION {
            return Err(IdsError::InvalidConfig(format!(
                "unsupported artifact version {} (expected {})",
                self.artifact_version, ARTIFACT_VERSION
            )));
        }

        let actual = compute_checksum(&self.architecture, &self.pipeline, &self.parameters)?;
        if actual != self.checksum {
            return Err(IdsError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }

        self.pipeline.validate()?;
        self.pipeline.schema().check_width(self.architecture.sequence_length)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Model artifact saved: {} (run {})", path.display(), self.run_id);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let artifact: ModelArtifact = serde_json::from_slice(&data)?;
        artifact.verify()?;
        log::info!(
            "Model artifact loaded: {} (run {}, schema {:08x})",
            path.display(),
            artifact.run_id,
            artifact.pipeline.schema().hash
        );
        Ok(artifact)
    }

    /// Split into a ready model and its pipeline
    pub fn into_parts(self) -> Result<(HybridModel, Pipeline, DecisionThreshold)> {
        let model = HybridModel::from_parts(self.architecture, self.parameters)?;
        Ok((model, self.pipeline, self.threshold))
    }
}
