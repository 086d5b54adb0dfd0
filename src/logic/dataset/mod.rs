//! Dataset Module - connection table boundary
//!
//! Column contract, CSV loading and the seeded train/test split.

pub mod record;
pub mod reader;
pub mod split;

#[cfg(test)]
mod tests;

pub use record::{
    numeric_columns, ConnectionRecord, ConnectionRecordBuilder, CATEGORICAL_COLUMNS,
    COLUMN_COUNT, COLUMN_LAYOUT, NUMERIC_COUNT,
};
pub use split::{train_test_split, SplitIndices};

/// Binarized labels for a slice of records
pub fn labels(records: &[ConnectionRecord]) -> Vec<u8> {
    records.iter().map(|r| r.label()).collect()
}
