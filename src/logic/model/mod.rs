//! Model Module - hybrid dual-path classifier
//!
//! ## Architecture:
//! - `stages`: per-path stages (Conv1D, BatchNorm, Squeeze-Excite, Dense,
//!   positional table, LayerNorm)
//! - `token_learner`: fixed-size token summaries of each path
//! - `cross_attention`: bidirectional single-head attention + concat
//! - `head`: pooling, hidden layer, dropout, logit
//! - `network`: parameter container and full forward/backward pass
//!
//! ## Persistence & Inference:
//! - `artifact`: checksummed JSON model + pipeline
//! - `inference`: record → probability

pub mod artifact;
pub mod cross_attention;
pub mod head;
pub mod inference;
pub mod network;
pub mod optimizer;
pub mod params;
pub mod stages;
pub mod tensor;
pub mod threshold;
pub mod token_learner;


pub use artifact::{default_artifact_path, ModelArtifact, ARTIFACT_VERSION};
pub use inference::{InferenceEngine, PredictionResult, Predictor};
pub use network::{ForwardCache, HybridModel, ModelParameters};
pub use optimizer::Adam;
pub use params::{DenseParams, ParamSet};
pub use stages::PathStage;
pub use tensor::{sigmoid, Mode};
pub use threshold::DecisionThreshold;
