//! Error constructor utilities.
//!
//! Helper functions for building [`MaterialError`] values with consistent
//! context, so that every stage reports failures the same way.

use super::types::{MapShape, MaterialError, ProcessingStage};
use std::path::Path;

fn boxed_source(
    source: Option<impl std::error::Error + Send + Sync + 'static>,
) -> Option<Box<dyn std::error::Error + Send + Sync>> {
    source.map(|e| Box::new(e) as _)
}

impl MaterialError {
    #[inline]
    fn processing_with_context(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an error for feature extraction failures.
    pub fn feature_extraction(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::FeatureExtraction, context, error)
    }

    /// Creates an error for fusion failures that are not shape related.
    pub fn fusion_error(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::Fusion, context, error)
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError`.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error that names the offending field.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!("Configuration error in field '{field}' with value '{value}': {reason}"),
        }
    }

    /// Creates an error for model load failures with a contextual suggestion.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {s}"))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: boxed_source(source),
        }
    }

    /// Creates an error for a raster that could not be read or decoded.
    pub fn image_load_error(
        path: impl AsRef<Path>,
        reason: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ImageLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
            source: boxed_source(source),
        }
    }

    /// Creates an error for calibration metadata that could not be read or parsed.
    pub fn metadata_load_error(
        path: impl AsRef<Path>,
        reason: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::MetadataLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
            source: boxed_source(source),
        }
    }

    /// Creates an error for a raster that could not be written.
    pub fn output_error(
        path: impl AsRef<Path>,
        reason: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::Output {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
            source: boxed_source(source),
        }
    }

    /// Creates a `ShapeMismatch` error.
    pub fn shape_mismatch(expected: MapShape, actual: MapShape) -> Self {
        Self::ShapeMismatch { expected, actual }
    }

    /// Creates an `EmptyAccumulation` error for the named strategy.
    pub fn empty_accumulation(strategy: impl Into<String>) -> Self {
        Self::EmptyAccumulation {
            strategy: strategy.into(),
        }
    }

    /// Creates an inference error with model context.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a detailed forward-pass error.
    pub fn model_inference_error(
        model_name: &str,
        operation: &str,
        batch_index: usize,
        input_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelInference {
            model_name: model_name.to_string(),
            operation: operation.to_string(),
            batch_index,
            input_shape: input_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SimpleError;

    #[test]
    fn test_model_load_error_suggestion() {
        let error = MaterialError::model_load_error(
            "models/materials.onnx",
            "file not found",
            Some("check the model path"),
            None::<SimpleError>,
        );
        assert_eq!(
            error.to_string(),
            "failed to load model 'models/materials.onnx': file not found; suggested fix: check the model path"
        );
    }

    #[test]
    fn test_shape_mismatch_message() {
        let error = MaterialError::shape_mismatch(MapShape::new(4, 4, 3), MapShape::new(4, 4, 2));
        assert_eq!(
            error.to_string(),
            "probability map shape mismatch: accumulator is 4x4x3, got 4x4x2"
        );
    }

    #[test]
    fn test_model_inference_error_fields() {
        let error = MaterialError::model_inference_error(
            "materials",
            "forward_pass",
            3,
            &[1024, 8],
            "session failed",
            SimpleError::new("boom"),
        );
        match error {
            MaterialError::ModelInference {
                batch_index,
                input_shape,
                ..
            } => {
                assert_eq!(batch_index, 3);
                assert_eq!(input_shape, vec![1024, 8]);
            }
            _ => panic!("Expected ModelInference error"),
        }
    }
}
