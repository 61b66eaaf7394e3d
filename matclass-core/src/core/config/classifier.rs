//! Configuration for the ONNX-backed material classifier.

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::{OrtExecutionProvider, OrtSessionConfig};
use crate::core::constants::{
    DEFAULT_INPUT_NAME, DEFAULT_SESSION_POOL_SIZE, MAX_CLASSES, PROBABILITY_TOLERANCE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Layout of the feature tensor handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureLayout {
    /// `[batch, bands]`, for fully connected models.
    #[default]
    Flat,
    /// `[batch, 1, bands]`, for models that convolve along the spectrum.
    Channel,
}

/// Activation applied to the model output before it is used as probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputActivation {
    /// The model emits logits; apply a softmax over classes.
    #[default]
    Softmax,
    /// The model already emits normalized probabilities.
    Identity,
}

/// Configuration of a [`MaterialClassifier`](crate::predictors::MaterialClassifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the ONNX model weights.
    pub model_path: PathBuf,
    /// Name used in logs and errors; defaults to the model file stem.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Run the model on an accelerator (CUDA) instead of the CPU.
    #[serde(default)]
    pub use_accelerator: bool,
    /// Accelerator device ordinal.
    #[serde(default)]
    pub device_id: i32,
    /// Explicit ONNX Runtime session settings.
    #[serde(default)]
    pub ort_session: Option<OrtSessionConfig>,
    /// Number of sessions kept for concurrent batches.
    #[serde(default = "ClassifierConfig::default_pool_size")]
    pub session_pool_size: usize,
    /// Name of the model's input tensor.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Name of the model's output tensor; the first output when unset.
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub feature_layout: FeatureLayout,
    #[serde(default)]
    pub activation: OutputActivation,
    /// Per-band mean subtracted from calibrated values.
    #[serde(default)]
    pub feature_mean: Option<Vec<f32>>,
    /// Per-band standard deviation dividing calibrated values.
    #[serde(default)]
    pub feature_std: Option<Vec<f32>>,
    /// Class names in model output order; the default catalogue when unset.
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
    /// Allowed deviation of a probability vector's sum from one.
    #[serde(default = "ClassifierConfig::default_tolerance")]
    pub probability_tolerance: f32,
}

impl ClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::get_defaults()
        }
    }

    pub fn with_accelerator(mut self, use_accelerator: bool) -> Self {
        self.use_accelerator = use_accelerator;
        self
    }

    pub fn with_device_id(mut self, device_id: i32) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = Some(config);
        self
    }

    pub fn with_session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = size;
        self
    }

    pub fn with_feature_layout(mut self, layout: FeatureLayout) -> Self {
        self.feature_layout = layout;
        self
    }

    pub fn with_activation(mut self, activation: OutputActivation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_feature_normalization(mut self, mean: Vec<f32>, std: Vec<f32>) -> Self {
        self.feature_mean = Some(mean);
        self.feature_std = Some(std);
        self
    }

    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = Some(names);
        self
    }

    pub fn input_name(&self) -> &str {
        self.input_name.as_deref().unwrap_or(DEFAULT_INPUT_NAME)
    }

    /// Resolved model name: explicit name, else the file stem.
    pub fn resolved_model_name(&self) -> String {
        self.model_name
            .clone()
            .or_else(|| {
                self.model_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "unknown_model".to_string())
    }

    /// Session settings with the accelerator flag applied.
    ///
    /// When the accelerator is requested and the explicit session config
    /// names no accelerator, a CUDA provider for `device_id` is put first.
    pub fn effective_session_config(&self) -> OrtSessionConfig {
        match &self.ort_session {
            Some(cfg) if self.use_accelerator && !cfg.requests_accelerator() => {
                let mut providers = vec![OrtExecutionProvider::cuda(self.device_id)];
                providers.extend(cfg.get_execution_providers());
                cfg.clone().with_execution_providers(providers)
            }
            Some(cfg) => cfg.clone(),
            None => OrtSessionConfig::for_device(self.use_accelerator, self.device_id),
        }
    }

    fn default_pool_size() -> usize {
        DEFAULT_SESSION_POOL_SIZE
    }

    fn default_tolerance() -> f32 {
        PROBABILITY_TOLERANCE
    }
}

impl ConfigValidator for ClassifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_model_path(&self.model_path)?;
        self.validate_positive_usize(self.session_pool_size, "session_pool_size")?;
        self.validate_positive_f32(self.probability_tolerance, "probability_tolerance")?;

        match (&self.feature_mean, &self.feature_std) {
            (Some(mean), Some(std)) => {
                if mean.len() != std.len() {
                    return Err(ConfigError::InvalidConfig {
                        message: format!(
                            "feature_mean has {} entries but feature_std has {}",
                            mean.len(),
                            std.len()
                        ),
                    });
                }
                for (i, &s) in std.iter().enumerate() {
                    self.validate_positive_f32(s, &format!("feature_std[{i}]"))?;
                }
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::InvalidConfig {
                    message: "feature_mean and feature_std must be given together".to_string(),
                });
            }
        }

        if let Some(names) = &self.class_names {
            if names.is_empty() || names.len() > MAX_CLASSES {
                return Err(ConfigError::InvalidConfig {
                    message: format!(
                        "class_names must contain between 1 and {MAX_CLASSES} entries, got {}",
                        names.len()
                    ),
                });
            }
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self {
            model_path: PathBuf::new(),
            model_name: None,
            use_accelerator: false,
            device_id: 0,
            ort_session: None,
            session_pool_size: DEFAULT_SESSION_POOL_SIZE,
            input_name: None,
            output_name: None,
            feature_layout: FeatureLayout::Flat,
            activation: OutputActivation::Softmax,
            feature_mean: None,
            feature_std: None,
            class_names: None,
            probability_tolerance: PROBABILITY_TOLERANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn model_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"onnx").unwrap();
        file
    }

    #[test]
    fn test_effective_session_config_accelerator() {
        let config = ClassifierConfig::new("model.onnx")
            .with_accelerator(true)
            .with_device_id(2);
        assert_eq!(
            config.effective_session_config().get_execution_providers(),
            vec![OrtExecutionProvider::cuda(2)]
        );

        let config = ClassifierConfig::new("model.onnx")
            .with_accelerator(true)
            .with_ort_session(OrtSessionConfig::new().with_intra_threads(2));
        let session = config.effective_session_config();
        assert_eq!(session.intra_threads, Some(2));
        assert_eq!(
            session.get_execution_providers(),
            vec![OrtExecutionProvider::cuda(0), OrtExecutionProvider::CPU]
        );
    }

    #[test]
    fn test_resolved_model_name() {
        let config = ClassifierConfig::new("/models/wv3_materials.onnx");
        assert_eq!(config.resolved_model_name(), "wv3_materials");
    }

    #[test]
    fn test_validate_normalization_lengths() {
        let file = model_file();
        let config = ClassifierConfig::new(file.path())
            .with_feature_normalization(vec![0.0; 8], vec![1.0; 4]);
        assert!(config.validate().is_err());

        let config = ClassifierConfig::new(file.path())
            .with_feature_normalization(vec![0.0; 8], vec![1.0; 8]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_classes() {
        let file = model_file();
        let config = ClassifierConfig::new(file.path()).with_class_names(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"model_path": "m.onnx", "use_accelerator": true}"#).unwrap();
        assert!(config.use_accelerator);
        assert_eq!(config.session_pool_size, DEFAULT_SESSION_POOL_SIZE);
        assert_eq!(config.activation, OutputActivation::Softmax);
        assert_eq!(config.input_name(), DEFAULT_INPUT_NAME);
    }
}
