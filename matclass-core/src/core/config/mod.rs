//! Configuration types and validation for the classification pipeline.

pub mod classifier;
pub mod errors;
pub mod onnx;
pub mod parallel;

pub use classifier::{ClassifierConfig, FeatureLayout, OutputActivation};
pub use errors::{ConfigError, ConfigValidator};
pub use onnx::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
pub use parallel::ParallelPolicy;
