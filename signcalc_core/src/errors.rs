//! # Error Types
//!
//! Structured error types for signcalc_core. Errors carry enough context for
//! a caller (human, service or LLM) to tell bad input apart from a setup
//! defect and react programmatically.
//!
//! Infeasible designs are *not* errors: filters and optimizers return empty
//! result sets and say so in their assumptions.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::errors::{CalcError, CalcResult};
//!
//! fn validate_diameter(diameter_ft: f64) -> CalcResult<()> {
//!     if diameter_ft <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "diameter_ft",
//!             diameter_ft.to_string(),
//!             "Diameter must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! assert!(validate_diameter(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for signcalc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Floor applied to denominators that may legitimately reach zero
/// (radius of gyration, lever arms, resistances).
pub const EPSILON: f64 = 1e-9;

/// Structured error type for solver operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is malformed or out of range
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A calibration constant was requested that has not been published
    #[error("Calibration constant not found: {name} (version {version})")]
    CalibrationNotFound { name: String, version: String },

    /// Setup defect (duplicate constant, invalid settings, ...)
    #[error("Configuration error: {what} - {reason}")]
    Configuration { what: String, reason: String },

    /// The section catalog could not be provided
    #[error("Section catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    /// A numerical procedure could not produce a result
    #[error("Calculation failed: {calculation_type} - {reason}")]
    CalculationFailed {
        calculation_type: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a CalibrationNotFound error
    pub fn calibration_not_found(name: impl Into<String>, version: impl Into<String>) -> Self {
        CalcError::CalibrationNotFound {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Create a Configuration error
    pub fn configuration(what: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::Configuration {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a CatalogUnavailable error
    pub fn catalog_unavailable(reason: impl Into<String>) -> Self {
        CalcError::CatalogUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a CalculationFailed error
    pub fn calculation_failed(calculation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::CalculationFailed {
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// True for input problems the caller can fix by changing the request
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidInput { .. } | CalcError::MissingField { .. }
        )
    }

    /// True for setup defects. These are fatal and never worth retrying.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CalcError::CalibrationNotFound { .. }
                | CalcError::Configuration { .. }
                | CalcError::CatalogUnavailable { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::CalibrationNotFound { .. } => "CALIBRATION_NOT_FOUND",
            CalcError::Configuration { .. } => "CONFIGURATION_ERROR",
            CalcError::CatalogUnavailable { .. } => "CATALOG_UNAVAILABLE",
            CalcError::CalculationFailed { .. } => "CALCULATION_FAILED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: e.to_string(),
        }
    }
}

/// Reject non-positive or non-finite values.
pub(crate) fn require_positive(field: &str, value: f64, reason: &str) -> CalcResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CalcError::invalid_input(field, value.to_string(), reason));
    }
    Ok(())
}

/// Reject negative or non-finite values.
pub(crate) fn require_non_negative(field: &str, value: f64, reason: &str) -> CalcResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CalcError::invalid_input(field, value.to_string(), reason));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::invalid_input("wind_speed_mph", "-5", "Wind speed must be positive");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
        assert!(json.contains("\"type\":\"InvalidInput\""));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::missing_field("cabinets").error_code(), "MISSING_FIELD");
        assert_eq!(
            CalcError::calibration_not_found("K_FACTOR", "footing_v9").error_code(),
            "CALIBRATION_NOT_FOUND"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(CalcError::calibration_not_found("K", "v1").is_configuration_error());
        assert!(CalcError::catalog_unavailable("empty source").is_configuration_error());
        assert!(CalcError::invalid_input("x", "0", "bad").is_validation_error());
        assert!(!CalcError::invalid_input("x", "0", "bad").is_configuration_error());
    }

    #[test]
    fn test_require_helpers() {
        assert!(require_positive("d", 1.0, "").is_ok());
        assert!(require_positive("d", 0.0, "").is_err());
        assert!(require_positive("d", f64::NAN, "").is_err());
        assert!(require_non_negative("v", 0.0, "").is_ok());
        assert!(require_non_negative("v", -0.1, "").is_err());
    }
}
