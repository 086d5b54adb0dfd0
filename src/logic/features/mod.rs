//! Features Module - record encoding, robust scaling, sequence layout
//!
//! ## Components:
//! - `layout`: encoded schema, version and CRC32 hash
//! - `encoder`: one-hot expansion of categorical columns
//! - `scaler`: median/IQR scaling
//! - `sequence`: (n, W) → (n, W, 1)

pub mod encoder;
pub mod layout;
pub mod scaler;
pub mod sequence;

#[cfg(test)]
mod tests;

pub use encoder::{FeatureEncoder, VocabularyScope, UNKNOWN_LEVEL};
pub use layout::{compute_schema_hash, FeatureSchema, SCHEMA_VERSION};
pub use scaler::RobustScaler;
pub use sequence::SequenceReshaper;
