//! Error types for the material classification pipeline.
//!
//! This module provides the error taxonomy shared by every stage of the
//! pipeline (input validation, model loading, raster and metadata loading,
//! inference and probability fusion) together with helper constructors that
//! attach context to the underlying cause.
//!
//! # Usage
//!
//! ```rust
//! use matclass_core::core::errors::{MaterialError, MapShape};
//!
//! let error = MaterialError::shape_mismatch(
//!     MapShape::new(4, 4, 2),
//!     MapShape::new(4, 5, 2),
//! );
//! assert!(error.to_string().contains("4x5x2"));
//!
//! let config_error = MaterialError::config_error("batch size must be positive");
//! assert!(config_error.to_string().contains("batch size"));
//! ```

pub mod constructors;
pub mod types;

pub use types::{MapShape, MaterialError, ProcessingStage, SimpleError};

/// Convenient result alias for material classification operations.
pub type MaterialResult<T> = Result<T, MaterialError>;
