//! Input validation run before any storage call

use crate::error::{FinanceError, Result};

/// Require a finite, strictly positive amount
pub fn require_positive_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FinanceError::Validation(format!(
            "{field} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

/// Require a finite amount that is zero or positive
pub fn require_non_negative_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FinanceError::Validation(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

/// Require a finite amount of any sign
pub fn require_finite_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(FinanceError::Validation(format!("{field} must be a finite number")));
    }
    Ok(())
}

/// Require a non-blank text value
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FinanceError::Validation(format!("{field} is required")));
    }
    Ok(())
}
