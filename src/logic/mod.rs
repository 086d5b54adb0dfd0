//! Logic Module - preprocessing, model, training and evaluation
//!
//! Data flows `dataset → features → pipeline → model → training → evaluation`.

pub mod config;
pub mod error;

// Input boundary
pub mod dataset;

// Preprocessing
pub mod features;
pub mod pipeline;

// Model, training, metrics
pub mod evaluation;
pub mod model;
pub mod training;
