//! Input validation utilities.
//!
//! Checks run eagerly, before any inference starts, so that bad inputs are
//! reported as `InvalidInput` instead of surfacing halfway through a run.

use crate::core::errors::{MaterialError, MaterialResult};

/// Validates that a float value is finite (not NaN or infinite).
#[inline]
pub fn validate_finite(value: f32, param_name: &str) -> MaterialResult<()> {
    if !value.is_finite() {
        return Err(MaterialError::invalid_input(format!(
            "Parameter '{param_name}' must be finite, got: {value}"
        )));
    }
    Ok(())
}

/// Validates that a value is positive (> 0).
#[inline]
pub fn validate_positive<T: PartialOrd + std::fmt::Display + Default>(
    value: T,
    param_name: &str,
) -> MaterialResult<()> {
    if value <= T::default() {
        return Err(MaterialError::invalid_input(format!(
            "Parameter '{param_name}' must be positive, got: {value}"
        )));
    }
    Ok(())
}

/// Validates that a collection is not empty.
#[inline]
pub fn validate_non_empty<T>(items: &[T], param_name: &str) -> MaterialResult<()> {
    if items.is_empty() {
        return Err(MaterialError::invalid_input(format!(
            "Parameter '{param_name}' cannot be empty"
        )));
    }
    Ok(())
}

/// Validates that two collections have the same length.
#[inline]
pub fn validate_same_length<T, U>(
    items1: &[T],
    items2: &[U],
    name1: &str,
    name2: &str,
) -> MaterialResult<()> {
    if items1.len() != items2.len() {
        return Err(MaterialError::invalid_input(format!(
            "Length mismatch: {} has {} elements, but {} has {} elements",
            name1,
            items1.len(),
            name2,
            items2.len()
        )));
    }
    Ok(())
}

/// Validates that a probability vector is a distribution within `tolerance`.
///
/// Returns the vector's sum on success.
pub fn validate_distribution(probabilities: &[f32], tolerance: f32) -> Result<f32, f32> {
    let mut sum = 0.0f32;
    for &p in probabilities {
        if !p.is_finite() || p < 0.0 {
            return Err(f32::NAN);
        }
        sum += p;
    }
    if (sum - 1.0).abs() <= tolerance {
        Ok(sum)
    } else {
        Err(sum)
    }
}
