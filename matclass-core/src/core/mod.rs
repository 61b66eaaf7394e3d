//! Core building blocks of the classification pipeline.
//!
//! This module contains:
//! - Pixel batching
//! - Configuration and validation
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime inference
//! - Traits connecting the pipeline to its collaborators

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;
pub mod validation;

pub use batch::{PixelBatch, PixelBatcher, PixelBatches, Tensor2D, TensorD};
pub use config::{ClassifierConfig, ConfigError, ConfigValidator, ParallelPolicy};
pub use constants::*;
pub use errors::{MapShape, MaterialError, MaterialResult, ProcessingStage};
pub use inference::OrtInfer;
pub use traits::{BatchPrediction, MetadataReader, PixelClassifier, RasterReader, RasterWriter};
