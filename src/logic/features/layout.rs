//! Feature Schema - encoded column layout
//!
//! **This file controls the encoded feature schema**
//!
//! The encoder produces one column per numeric input plus one indicator per
//! categorical level. The ordered names, a version byte and a CRC32 hash of
//! both travel with every persisted pipeline so a mismatched artifact is
//! rejected before any record is scored.
//!
//! ## Rules:
//! 1. Change the naming or ordering of encoded columns → increment SCHEMA_VERSION
//! 2. Never zero-pad or truncate a vector to make it fit

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current encoded schema version
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version + ordered column names
pub fn compute_schema_hash(version: u8, columns: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[version]);
    for name in columns {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Ordered encoded column names with their version and hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u8,
    pub hash: u32,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        let hash = compute_schema_hash(SCHEMA_VERSION, &columns);
        Self {
            version: SCHEMA_VERSION,
            hash,
            columns,
        }
    }

    /// Encoded width W
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check the stored hash against the stored names (detects tampering or
    /// artifacts written by a different schema version)
    pub fn validate(&self) -> Result<()> {
        let actual = compute_schema_hash(SCHEMA_VERSION, &self.columns);
        if self.version != SCHEMA_VERSION || self.hash != actual {
            return Err(IdsError::LayoutMismatch {
                expected_version: SCHEMA_VERSION,
                expected_hash: actual,
                actual_version: self.version,
                actual_hash: self.hash,
            });
        }
        Ok(())
    }

    /// Two schemas are compatible when version and hash agree
    pub fn ensure_compatible(&self, other: &FeatureSchema) -> Result<()> {
        if self.version != other.version || self.hash != other.hash {
            return Err(IdsError::LayoutMismatch {
                expected_version: self.version,
                expected_hash: self.hash,
                actual_version: other.version,
                actual_hash: other.hash,
            });
        }
        Ok(())
    }

    pub fn check_width(&self, actual: usize) -> Result<()> {
        if actual != self.width() {
            return Err(IdsError::SchemaMismatch {
                expected: self.width(),
                actual,
            });
        }
        Ok(())
    }
}
