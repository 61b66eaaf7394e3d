//! ONNX-backed pixel-wise material classifier.

use crate::core::batch::{PixelBatch, Tensor2D, TensorD};
use crate::core::config::{
    ClassifierConfig, ConfigError, ConfigValidator, FeatureLayout, OutputActivation,
};
use crate::core::errors::{MaterialError, MaterialResult, SimpleError};
use crate::core::inference::OrtInfer;
use crate::core::traits::{BatchPrediction, PixelClassifier};
use crate::core::validation::validate_distribution;
use crate::domain::{ImageMetadata, MaterialClasses, RasterImage};
use crate::processors::{FeatureExtractor, softmax_rows};
use ndarray::Axis;
use std::path::Path;
use tracing::{debug, info};

/// Classifies pixels with an ONNX model.
///
/// Each batch goes through calibration and feature normalisation, one
/// forward pass on a pooled session, and the configured output activation.
#[derive(Debug)]
pub struct MaterialClassifier {
    engine: OrtInfer,
    extractor: FeatureExtractor,
    layout: FeatureLayout,
    activation: OutputActivation,
    classes: MaterialClasses,
    tolerance: f32,
}

impl MaterialClassifier {
    /// Loads the model at `model_path` on the CPU, or on the accelerator
    /// when `use_accelerator` is set.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoad` if the file is missing, unreadable, or cannot be
    /// placed on the requested device.
    pub fn load(model_path: impl AsRef<Path>, use_accelerator: bool) -> MaterialResult<Self> {
        Self::from_config(
            &ClassifierConfig::new(model_path.as_ref()).with_accelerator(use_accelerator),
        )
    }

    pub fn from_config(config: &ClassifierConfig) -> MaterialResult<Self> {
        if !config.model_path.is_file() {
            return Err(MaterialError::model_load_error(
                &config.model_path,
                "model file does not exist or is not a file",
                Some("pass the path of an ONNX model with --model-path"),
                None::<ConfigError>,
            ));
        }
        config.validate()?;

        let engine = OrtInfer::from_config(config)?;
        let extractor =
            FeatureExtractor::from_parts(config.feature_mean.clone(), config.feature_std.clone())?;
        let classes = resolve_classes(config, engine.declared_classes())?;

        info!(
            model = %engine.model_name(),
            path = %engine.model_path().display(),
            accelerator = config.use_accelerator,
            sessions = engine.pool_size(),
            classes = classes.len(),
            "material classifier loaded"
        );

        Ok(Self {
            engine,
            extractor,
            layout: config.feature_layout,
            activation: config.activation,
            classes,
            tolerance: config.probability_tolerance,
        })
    }

    pub fn engine(&self) -> &OrtInfer {
        &self.engine
    }

    pub fn classes(&self) -> &MaterialClasses {
        &self.classes
    }

    fn to_input(&self, features: Tensor2D) -> TensorD {
        match self.layout {
            FeatureLayout::Flat => features.into_dyn(),
            FeatureLayout::Channel => features.insert_axis(Axis(1)).into_dyn(),
        }
    }
}

impl PixelClassifier for MaterialClassifier {
    fn num_classes(&self) -> usize {
        self.classes.len()
    }

    fn classify_batch(
        &self,
        batch: &PixelBatch,
        image: &RasterImage,
        metadata: &ImageMetadata,
    ) -> MaterialResult<BatchPrediction> {
        let features = self
            .extractor
            .extract(batch, image, metadata)
            .map_err(|e| {
                MaterialError::feature_extraction(&format!("batch {}", batch.index()), e)
            })?;
        let input = self.to_input(features);
        let output = self.engine.infer(&input, batch.index())?;
        if output.ncols() != self.num_classes() {
            return Err(MaterialError::model_inference_error(
                self.engine.model_name(),
                "output_validation",
                batch.index(),
                input.shape(),
                &format!(
                    "model emitted {} classes, classifier expects {}",
                    output.ncols(),
                    self.num_classes()
                ),
                SimpleError::new("class count mismatch"),
            ));
        }
        debug!(batch = batch.index(), pixels = batch.len(), "batch inferred");
        finish_batch(output, self.activation, batch, image, self.tolerance)
    }

    fn class_names(&self) -> Option<&[String]> {
        Some(self.classes.names())
    }
}

/// Class catalogue: configured names, else the model's declared class count
/// over the default catalogue.
fn resolve_classes(
    config: &ClassifierConfig,
    declared: Option<usize>,
) -> MaterialResult<MaterialClasses> {
    let defaults = MaterialClasses::default();
    match (&config.class_names, declared) {
        (Some(names), Some(k)) if names.len() != k => Err(MaterialError::config_error(format!(
            "{} class names configured but model '{}' emits {k} classes",
            names.len(),
            config.resolved_model_name()
        ))),
        (Some(names), _) => MaterialClasses::from_names(names.clone()),
        (None, Some(k)) if k == defaults.len() => Ok(defaults),
        (None, Some(k)) => {
            MaterialClasses::from_names((0..k).map(|i| format!("class_{i}")).collect())
        }
        (None, None) => Ok(defaults),
    }
}

/// Applies the activation and checks the distributions of covered pixels.
fn finish_batch(
    mut output: Tensor2D,
    activation: OutputActivation,
    batch: &PixelBatch,
    image: &RasterImage,
    tolerance: f32,
) -> MaterialResult<BatchPrediction> {
    if activation == OutputActivation::Softmax {
        softmax_rows(&mut output);
    }
    for ((row, col), probs) in batch.coords().zip(output.rows()) {
        if !image.is_valid(row, col) {
            continue;
        }
        let probs = probs.to_vec();
        if let Err(sum) = validate_distribution(&probs, tolerance) {
            return Err(MaterialError::InvalidProbabilities {
                row,
                col,
                sum,
                tolerance,
            });
        }
    }
    Ok(BatchPrediction::from_probabilities(output))
}
