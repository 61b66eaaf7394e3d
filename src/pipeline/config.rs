//! Pipeline configuration and file loading.

use matclass_core::core::config::{
    ClassifierConfig, ConfigError, ConfigValidator, ParallelPolicy,
};
use matclass_core::core::constants::{DEFAULT_BATCH_SIZE, MAX_TENSOR_SIZE};
use matclass_core::core::{MaterialError, MaterialResult};
use matclass_core::fusion::FusionStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a classification run needs besides the input paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub classifier: ClassifierConfig,
    /// Pixels per inference call.
    #[serde(default = "PipelineConfig::default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub strategy: FusionStrategy,
    pub output_dir: PathBuf,
    /// Prefix of the output file names.
    #[serde(default)]
    pub output_base: String,
    /// Also write one probability page per class.
    #[serde(default)]
    pub write_probabilities: bool,
    /// Also write a colour PNG of the label map.
    #[serde(default)]
    pub preview: bool,
    /// Band value marking pixels outside an image's coverage; overrides the
    /// value stored in the rasters.
    #[serde(default)]
    pub nodata: Option<f32>,
    #[serde(default)]
    pub parallel: ParallelPolicy,
}

impl PipelineConfig {
    pub fn new(model_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            classifier: ClassifierConfig::new(model_path),
            batch_size: DEFAULT_BATCH_SIZE,
            strategy: FusionStrategy::default(),
            output_dir: output_dir.into(),
            output_base: String::new(),
            write_probabilities: false,
            preview: false,
            nodata: None,
            parallel: ParallelPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_strategy(mut self, strategy: FusionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_accelerator(mut self, use_accelerator: bool) -> Self {
        self.classifier.use_accelerator = use_accelerator;
        self
    }

    pub fn with_output_base(mut self, base: impl Into<String>) -> Self {
        self.output_base = base.into();
        self
    }

    pub fn with_parallel(mut self, policy: ParallelPolicy) -> Self {
        self.parallel = policy;
        self
    }

    fn default_batch_size() -> usize {
        DEFAULT_BATCH_SIZE
    }
}

impl ConfigValidator for PipelineConfig {
    /// Checks the run settings. The model path is checked when the model is
    /// loaded, so that a missing file is reported as a load failure.
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size_with_limits(self.batch_size, MAX_TENSOR_SIZE)?;
        if let Some(threads) = self.parallel.max_threads {
            self.validate_positive_usize(threads, "parallel.max_threads")?;
        }
        if let Some(nodata) = self.nodata {
            if !nodata.is_finite() {
                return Err(ConfigError::InvalidConfig {
                    message: format!("nodata must be finite, got {nodata}"),
                });
            }
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::new(PathBuf::new(), PathBuf::from("."))
    }
}

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Loads [`PipelineConfig`] from TOML or JSON files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, auto-detecting the format from the extension.
    pub fn load_from_file(path: &Path) -> MaterialResult<PipelineConfig> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| {
            MaterialError::config_error(format!(
                "Unsupported config file extension: {:?}",
                path.extension()
            ))
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            MaterialError::config_error(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::load_from_string(&content, format)
    }

    pub fn load_from_string(content: &str, format: ConfigFormat) -> MaterialResult<PipelineConfig> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
                MaterialError::config_error(format!("Failed to parse TOML config: {e}"))
            }),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                MaterialError::config_error(format!("Failed to parse JSON config: {e}"))
            }),
        }
    }

    pub fn save_to_string(config: &PipelineConfig, format: ConfigFormat) -> MaterialResult<String> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
                MaterialError::config_error(format!("Failed to serialize config to TOML: {e}"))
            }),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                MaterialError::config_error(format!("Failed to serialize config to JSON: {e}"))
            }),
        }
    }
}
