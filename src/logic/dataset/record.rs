//! Connection Record - one row of the NSL-KDD style input table
//!
//! **This file controls the input column contract**
//!
//! The 43 columns arrive in a fixed order (header-less CSV is accepted only
//! because the order is enforced here). `level` is parsed but never used as
//! signal; `outcome` is binarized into the training label.

use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

// ============================================================================
// COLUMN LAYOUT (Authoritative source)
// ============================================================================

/// Input columns in the exact order they appear in a row
pub const COLUMN_LAYOUT: [&str; 43] = [
    "duration", "protocol_type", "service", "flag", "src_bytes", "dst_bytes", "land",
    "wrong_fragment", "urgent", "hot", "num_failed_logins", "logged_in", "num_compromised",
    "root_shell", "su_attempted", "num_root", "num_file_creations", "num_shells",
    "num_access_files", "num_outbound_cmds", "is_host_login", "is_guest_login", "count",
    "srv_count", "serror_rate", "srv_serror_rate", "rerror_rate", "srv_rerror_rate",
    "same_srv_rate", "diff_srv_rate", "srv_diff_host_rate", "dst_host_count",
    "dst_host_srv_count", "dst_host_same_srv_rate", "dst_host_diff_srv_rate",
    "dst_host_same_src_port_rate", "dst_host_srv_diff_host_rate", "dst_host_serror_rate",
    "dst_host_srv_serror_rate", "dst_host_rerror_rate", "dst_host_srv_rerror_rate",
    "outcome", "level",
];

/// Total number of input columns
pub const COLUMN_COUNT: usize = 43;

/// Columns expanded into indicator columns, in expansion order
pub const CATEGORICAL_COLUMNS: [&str; 7] = [
    "protocol_type", "service", "flag", "land", "logged_in", "is_guest_login", "is_host_login",
];

/// Binary flags that are categorical although numeric on the wire
const FLAG_COLUMNS: [&str; 4] = ["land", "logged_in", "is_guest_login", "is_host_login"];

pub const OUTCOME_COLUMN: &str = "outcome";
pub const LEVEL_COLUMN: &str = "level";

/// Outcome value mapped to label 0
pub const NORMAL_OUTCOME: &str = "normal";

/// Numeric feature columns in record order (everything except categorical,
/// outcome and level)
pub fn numeric_columns() -> Vec<&'static str> {
    COLUMN_LAYOUT
        .iter()
        .copied()
        .filter(|c| !CATEGORICAL_COLUMNS.contains(c) && *c != OUTCOME_COLUMN && *c != LEVEL_COLUMN)
        .collect()
}

/// Number of numeric feature columns
pub const NUMERIC_COUNT: usize = 34;

// ============================================================================
// RECORD
// ============================================================================

/// One connection observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Values in `numeric_columns()` order
    pub numeric: Vec<f64>,
    /// Levels in `CATEGORICAL_COLUMNS` order
    pub categorical: Vec<String>,
    /// Raw outcome label
    pub outcome: String,
    /// Difficulty level; dropped before modeling
    pub level: Option<i64>,
}

impl ConnectionRecord {
    /// Parse one row of 43 fields. `row` is only used for error reporting.
    pub fn from_fields<S: AsRef<str>>(row: usize, fields: &[S]) -> Result<Self> {
        if fields.len() != COLUMN_COUNT {
            return Err(IdsError::InvalidRecord {
                row,
                reason: format!("expected {} columns, got {}", COLUMN_COUNT, fields.len()),
            });
        }

        let mut numeric = Vec::with_capacity(NUMERIC_COUNT);
        let mut categorical = vec![String::new(); CATEGORICAL_COLUMNS.len()];
        let mut outcome = String::new();
        let mut level = None;

        for (name, raw) in COLUMN_LAYOUT.iter().zip(fields.iter()) {
            let value = raw.as_ref().trim();
            if let Some(idx) = CATEGORICAL_COLUMNS.iter().position(|c| c == name) {
                categorical[idx] = normalize_level(row, name, value)?;
            } else if *name == OUTCOME_COLUMN {
                outcome = value.to_string();
            } else if *name == LEVEL_COLUMN {
                level = if value.is_empty() {
                    None
                } else {
                    Some(value.parse::<i64>().map_err(|_| IdsError::InvalidRecord {
                        row,
                        reason: format!("level '{}' is not an integer", value),
                    })?)
                };
            } else {
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IdsError::InvalidRecord {
                        row,
                        reason: format!("column '{}' value '{}' is not a finite number", name, value),
                    })?;
                numeric.push(parsed);
            }
        }

        if outcome.is_empty() {
            return Err(IdsError::InvalidRecord {
                row,
                reason: "empty outcome".to_string(),
            });
        }

        Ok(Self {
            numeric,
            categorical,
            outcome,
            level,
        })
    }

    /// Binarized label: `normal` → 0, anything else → 1
    pub fn label(&self) -> u8 {
        if self.outcome == NORMAL_OUTCOME {
            0
        } else {
            1
        }
    }

    /// Categorical level by column name
    pub fn category(&self, column: &str) -> Option<&str> {
        CATEGORICAL_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.categorical.get(i))
            .map(|s| s.as_str())
    }

    pub fn builder() -> ConnectionRecordBuilder {
        ConnectionRecordBuilder::new()
    }
}

/// Binary flags are stored as canonical integers so "1" and "1.0" share a level
fn normalize_level(row: usize, column: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(IdsError::InvalidRecord {
            row,
            reason: format!("empty categorical value in '{}'", column),
        });
    }
    if FLAG_COLUMNS.contains(&column) {
        let parsed = value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .ok_or_else(|| IdsError::InvalidRecord {
                row,
                reason: format!("flag column '{}' value '{}' is not an integer", column, value),
            })?;
        return Ok(format!("{}", parsed as i64));
    }
    Ok(value.to_string())
}

// ============================================================================
// BUILDER PATTERN
// ============================================================================

/// Builder for creating records with named setters (zeroed numerics, flags "0")
pub struct ConnectionRecordBuilder {
    record: ConnectionRecord,
}

impl ConnectionRecordBuilder {
    pub fn new() -> Self {
        let mut categorical = vec!["0".to_string(); CATEGORICAL_COLUMNS.len()];
        categorical[0] = "tcp".to_string();
        categorical[1] = "http".to_string();
        categorical[2] = "SF".to_string();
        Self {
            record: ConnectionRecord {
                numeric: vec![0.0; NUMERIC_COUNT],
                categorical,
                outcome: NORMAL_OUTCOME.to_string(),
                level: None,
            },
        }
    }

    pub fn protocol_type(self, value: &str) -> Self {
        self.category("protocol_type", value)
    }

    pub fn service(self, value: &str) -> Self {
        self.category("service", value)
    }

    pub fn flag(self, value: &str) -> Self {
        self.category("flag", value)
    }

    pub fn outcome(mut self, value: &str) -> Self {
        self.record.outcome = value.to_string();
        self
    }

    pub fn level(mut self, value: i64) -> Self {
        self.record.level = Some(value);
        self
    }

    /// Set a categorical column by name (unknown names are ignored)
    pub fn category(mut self, column: &str, value: &str) -> Self {
        if let Some(idx) = CATEGORICAL_COLUMNS.iter().position(|c| *c == column) {
            self.record.categorical[idx] = value.to_string();
        }
        self
    }

    /// Set a numeric column by name (unknown names are ignored)
    pub fn numeric(mut self, column: &str, value: f64) -> Self {
        if let Some(idx) = numeric_columns().iter().position(|c| *c == column) {
            self.record.numeric[idx] = value;
        }
        self
    }

    pub fn build(self) -> ConnectionRecord {
        self.record
    }
}

impl Default for ConnectionRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
