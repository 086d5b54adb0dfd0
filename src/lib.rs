//! AI Security IDS - hybrid dual-path network intrusion classifier
//!
//! Connection records are one-hot encoded, robust-scaled and reshaped into a
//! `(W, 1)` sequence, then scored by a convolutional / squeeze-excite path
//! and a positional path that are summarized by learned tokens and fused by
//! bidirectional cross-attention.

pub mod constants;
pub mod logic;

pub use logic::error::{IdsError, Result};
