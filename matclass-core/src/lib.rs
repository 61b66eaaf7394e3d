//! # matclass core
//!
//! Batched per-pixel material classification and multi-image probability
//! fusion.
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration, pixel batching, ONNX Runtime
//!   inference and the traits connecting the pipeline stages
//! * [`domain`] - Rasters, calibration metadata, georeferencing, probability
//!   maps and the material catalogue
//! * [`processors`] - Feature extraction and output activations
//! * [`predictors`] - The ONNX-backed material classifier
//! * [`fusion`] - Fusion strategies and the result combiner

pub mod core;
pub mod domain;
pub mod fusion;
pub mod predictors;
pub mod processors;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error Handling
    pub use crate::core::{MaterialError, MaterialResult};

    // Batching and inference
    pub use crate::core::{
        BatchPrediction, MetadataReader, PixelBatch, PixelBatcher, PixelClassifier, RasterReader,
        RasterWriter,
    };

    // Configuration
    pub use crate::core::config::{ClassifierConfig, ConfigValidator, ParallelPolicy};

    // Domain types
    pub use crate::domain::{
        GeoReference, ImageMetadata, LabelMap, MaterialClasses, ProbabilityMap, RasterImage,
    };

    // Fusion
    pub use crate::fusion::{FusedMap, FusionStrategy, ResultCombiner};

    // Predictors
    pub use crate::predictors::*;
}
