//! Error handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdsError>;

#[derive(Debug, Error)]
pub enum IdsError {
    // Schema errors
    #[error("Schema mismatch: expected {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Schema mismatch: unseen level '{level}' in categorical column '{column}'")]
    UnknownCategory { column: String, level: String },

    #[error("Schema layout mismatch: expected v{expected_version} ({expected_hash:08x}), got v{actual_version} ({actual_hash:08x})")]
    LayoutMismatch {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },

    // Data errors
    #[error("Invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    // Scaler lifecycle
    #[error("Scaler has already been fitted")]
    ScalerAlreadyFitted,

    #[error("Scaler has not been fitted")]
    ScalerNotFitted,

    // Training errors
    #[error("Class weights undefined: training labels contain only class {present}")]
    ClassImbalanceDegenerate { present: u8 },

    #[error("Numerical divergence at epoch {epoch}, batch {batch}: loss = {loss}")]
    NumericalDivergence { epoch: usize, batch: usize, loss: f64 },

    #[error("Training cancelled at epoch {epoch}, batch {batch}")]
    Cancelled { epoch: usize, batch: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Artifact errors
    #[error("Artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    // Wrapped errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IdsError {
    /// True for the errors that reject a record because it does not fit the
    /// fitted encoder schema.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            IdsError::SchemaMismatch { .. }
                | IdsError::UnknownCategory { .. }
                | IdsError::LayoutMismatch { .. }
        )
    }
}
