//! Error type definitions.

use std::fmt;
use thiserror::Error;

/// Stage of the pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Radiometric calibration and feature extraction.
    FeatureExtraction,
    /// Probability fusion across images.
    Fusion,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::FeatureExtraction => write!(f, "feature extraction"),
            ProcessingStage::Fusion => write!(f, "fusion"),
        }
    }
}

/// Shape of a probability surface: `height x width x num_classes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapShape {
    pub height: usize,
    pub width: usize,
    pub num_classes: usize,
}

impl MapShape {
    pub const fn new(height: usize, width: usize, num_classes: usize) -> Self {
        Self {
            height,
            width,
            num_classes,
        }
    }

    /// Number of pixels covered by the surface.
    pub const fn pixels(&self) -> usize {
        self.height * self.width
    }
}

impl fmt::Display for MapShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.num_classes)
    }
}

/// Errors raised anywhere in the classification and fusion pipeline.
#[derive(Error, Debug)]
pub enum MaterialError {
    /// Caller supplied inputs that can never be processed (path list length
    /// mismatch, zero batch size, empty image). Detected before inference.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A configuration value is unusable.
    #[error("configuration: {message}")]
    ConfigError { message: String },

    /// Model weights could not be loaded for the requested device.
    #[error("failed to load model '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        model_path: String,
        reason: String,
        suggestion: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The raster collaborator could not resolve an image.
    #[error("failed to load image '{path}': {reason}")]
    ImageLoad {
        path: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The metadata collaborator could not resolve calibration data.
    #[error("failed to load metadata '{path}': {reason}")]
    MetadataLoad {
        path: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A probability map does not match the accumulator's established shape.
    #[error("probability map shape mismatch: accumulator is {expected}, got {actual}")]
    ShapeMismatch { expected: MapShape, actual: MapShape },

    /// `finalize` was called on a combiner that never received an update.
    #[error("cannot finalize '{strategy}' fusion: no probability maps were accumulated")]
    EmptyAccumulation { strategy: String },

    /// A classifier returned a probability vector that is not a distribution.
    #[error(
        "probabilities at pixel (row {row}, col {col}) sum to {sum}, expected 1 within {tolerance}"
    )]
    InvalidProbabilities {
        row: usize,
        col: usize,
        sum: f32,
        tolerance: f32,
    },

    /// Error occurred during a processing stage.
    #[error("{kind} failed: {context}")]
    Processing {
        kind: ProcessingStage,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inference failed with model context.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        model_name: String,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Detailed forward-pass failure for a specific batch.
    #[error(
        "model '{model_name}' {operation} failed on batch {batch_index} with input shape {input_shape:?}: {context}"
    )]
    ModelInference {
        model_name: String,
        operation: String,
        batch_index: usize,
        input_shape: Vec<usize>,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The output boundary failed to persist a raster.
    #[error("failed to write output '{path}': {reason}")]
    Output {
        path: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error.
    #[error(transparent)]
    Config(#[from] crate::core::config::ConfigError),

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor reshaping.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Minimal error carrying only a message, used as a `source` where no
/// underlying error exists.
#[derive(Debug, Clone)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SimpleError {}
