//! Shared numeric validation helpers.
//!
//! Range checks used by the segmentation, similarity, and query
//! configuration types.

use crate::error::CoreError;

/// Validate that a value falls within `[0.0, 1.0]`.
///
/// Returns a `CoreError::Validation` naming the field if out of range.
pub fn validate_unit_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a count is at least one.
pub fn validate_non_zero(value: usize, name: &str) -> Result<(), CoreError> {
    if value == 0 {
        return Err(CoreError::Validation(format!("{name} must be at least 1")));
    }
    Ok(())
}
