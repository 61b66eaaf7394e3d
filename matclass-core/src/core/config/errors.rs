//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Batch size must be greater than 0.
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    /// A model path does not exist.
    #[error("model path does not exist: {path}")]
    ModelPathNotFound { path: std::path::PathBuf },

    /// A configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Validation failed.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// A resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implementors provide [`ConfigValidator::validate`] and
/// [`ConfigValidator::get_defaults`]; the remaining methods are reusable
/// checks for common parameter kinds.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Checks that the batch size is greater than 0.
    fn validate_batch_size(&self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            Err(ConfigError::InvalidBatchSize)
        } else {
            Ok(())
        }
    }

    /// Checks that the batch size is greater than 0 and within `max_batch_size`.
    fn validate_batch_size_with_limits(
        &self,
        batch_size: usize,
        max_batch_size: usize,
    ) -> Result<(), ConfigError> {
        self.validate_batch_size(batch_size)?;
        if batch_size > max_batch_size {
            return Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Batch size {batch_size} exceeds maximum allowed batch size {max_batch_size}"
                ),
            });
        }
        Ok(())
    }

    /// Checks that the model path exists and is a file.
    fn validate_model_path(&self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            Err(ConfigError::ModelPathNotFound {
                path: path.to_path_buf(),
            })
        } else if !path.is_file() {
            Err(ConfigError::InvalidConfig {
                message: format!("Model path is not a file: {}", path.display()),
            })
        } else {
            Ok(())
        }
    }

    /// Checks that a usize value is positive.
    fn validate_positive_usize(&self, value: usize, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{field_name} must be greater than 0"),
            })
        } else {
            Ok(())
        }
    }

    /// Checks that a float value is finite and strictly positive.
    fn validate_positive_f32(&self, value: f32, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{field_name} must be a positive finite number, got {value}"),
            })
        } else {
            Ok(())
        }
    }
}
