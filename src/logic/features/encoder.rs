//! Feature encoder - typed records to a fixed-width numeric vector
//!
//! Numeric columns pass through in record order; every categorical column is
//! expanded into one indicator per level, levels sorted ascending.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::FeatureSchema;
use crate::logic::dataset::{numeric_columns, ConnectionRecord, CATEGORICAL_COLUMNS, NUMERIC_COUNT};
use crate::logic::error::{IdsError, Result};

/// Suffix of the per-column bucket for unseen levels
pub const UNKNOWN_LEVEL: &str = "unknown";

/// Which rows the categorical vocabulary is collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyScope {
    /// Every row, before the split
    #[default]
    FullDataset,
    /// Training rows only, with an `<column>_unknown` indicator for unseen levels
    TrainingOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEncoder {
    scope: VocabularyScope,
    /// Sorted levels per categorical column, in `CATEGORICAL_COLUMNS` order
    vocabularies: Vec<Vec<String>>,
    schema: FeatureSchema,
}

impl FeatureEncoder {
    /// Collect the vocabulary of every categorical column from `records`
    pub fn fit(records: &[ConnectionRecord], scope: VocabularyScope) -> Result<Self> {
        if records.is_empty() {
            return Err(IdsError::EmptyDataset("cannot fit encoder on zero records".into()));
        }

        let mut vocabularies: Vec<Vec<String>> = vec![Vec::new(); CATEGORICAL_COLUMNS.len()];
        for record in records {
            for (vocab, level) in vocabularies.iter_mut().zip(record.categorical.iter()) {
                if !vocab.contains(level) {
                    vocab.push(level.clone());
                }
            }
        }
        for vocab in vocabularies.iter_mut() {
            sort_levels(vocab);
        }

        let mut columns: Vec<String> = numeric_columns().iter().map(|c| c.to_string()).collect();
        for (column, vocab) in CATEGORICAL_COLUMNS.iter().zip(vocabularies.iter()) {
            for level in vocab {
                columns.push(format!("{}_{}", column, level));
            }
            if scope == VocabularyScope::TrainingOnly {
                columns.push(format!("{}_{}", column, UNKNOWN_LEVEL));
            }
        }

        let schema = FeatureSchema::new(columns);
        log::info!(
            "Encoder fitted: {} columns ({} numeric, {} indicators), scope {:?}",
            schema.width(),
            NUMERIC_COUNT,
            schema.width() - NUMERIC_COUNT,
            scope
        );

        Ok(Self {
            scope,
            vocabularies,
            schema,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn width(&self) -> usize {
        self.schema.width()
    }

    pub fn scope(&self) -> VocabularyScope {
        self.scope
    }

    /// Encode one record into a vector of exactly `width()` values
    pub fn encode_record(&self, record: &ConnectionRecord) -> Result<Vec<f64>> {
        if record.numeric.len() != NUMERIC_COUNT {
            return Err(IdsError::SchemaMismatch {
                expected: NUMERIC_COUNT,
                actual: record.numeric.len(),
            });
        }
        if record.categorical.len() != CATEGORICAL_COLUMNS.len() {
            return Err(IdsError::SchemaMismatch {
                expected: CATEGORICAL_COLUMNS.len(),
                actual: record.categorical.len(),
            });
        }

        let mut out = Vec::with_capacity(self.width());
        out.extend_from_slice(&record.numeric);

        for ((column, vocab), level) in CATEGORICAL_COLUMNS
            .iter()
            .zip(self.vocabularies.iter())
            .zip(record.categorical.iter())
        {
            let hit = vocab.iter().position(|v| v == level);
            match (hit, self.scope) {
                (None, VocabularyScope::FullDataset) => {
                    return Err(IdsError::UnknownCategory {
                        column: column.to_string(),
                        level: level.clone(),
                    });
                }
                (hit, scope) => {
                    out.extend(vocab.iter().enumerate().map(|(i, _)| {
                        if Some(i) == hit {
                            1.0
                        } else {
                            0.0
                        }
                    }));
                    if scope == VocabularyScope::TrainingOnly {
                        out.push(if hit.is_none() { 1.0 } else { 0.0 });
                    }
                }
            }
        }

        self.schema.check_width(out.len())?;
        Ok(out)
    }

    /// Encode a batch into an (n, W) matrix
    pub fn encode(&self, records: &[ConnectionRecord]) -> Result<Array2<f64>> {
        let width = self.width();
        let mut data = Vec::with_capacity(records.len() * width);
        for record in records {
            data.extend(self.encode_record(record)?);
        }
        Array2::from_shape_vec((records.len(), width), data)
            .map_err(|e| IdsError::ShapeMismatch(e.to_string()))
    }
}

/// A column whose levels all parse as numbers sorts by value; any other
/// column sorts lexicographically.
fn sort_levels(levels: &mut [String]) {
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    match numeric {
        Some(values) => {
            let mut keyed: Vec<(f64, String)> = values.into_iter().zip(levels.iter().cloned()).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            for (slot, (_, level)) in levels.iter_mut().zip(keyed) {
                *slot = level;
            }
        }
        None => levels.sort(),
    }
}
