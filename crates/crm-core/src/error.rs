//! # Error Types
//!
//! Domain-specific error types for crm-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  crm-core errors (this file)                                           │
//! │  ├── CoreError        - Domain rule failures                           │
//! │  └── ValidationError  - Field validation failures                      │
//! │                                                                         │
//! │  crm-db errors (separate crate)                                        │
//! │  └── DbError          - Repository failures (localized message)        │
//! │                                                                         │
//! │  Flow: ValidationError → DbError::Validation → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule failures that are not tied to a single field.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A classifier value read from storage or input has no matching variant.
    #[error("Unknown {classifier} value: '{value}'")]
    UnknownClassifier { classifier: String, value: String },

    /// A proposal cannot move from its current status to the requested one.
    ///
    /// ## When This Occurs
    /// - Approving a proposal that is still a draft
    /// - Rejecting a proposal that was already approved
    #[error("Proposal cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Sort expression could not be parsed (`"name,desc"` style).
    #[error("Invalid sort expression: '{0}'")]
    InvalidSort(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the validators in [`crate::validation`] before a repository
/// writes a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad CPF check digit, malformed plate).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two related values are in the wrong order (e.g., validity window).
    #[error("{first} must not be after {second}")]
    InvalidRange { first: String, second: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidTransition {
            from: "draft".to_string(),
            to: "approved".to_string(),
        };
        assert_eq!(err.to_string(), "Proposal cannot move from draft to approved");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::invalid("document", "check digit mismatch");
        assert_eq!(
            err.to_string(),
            "document has invalid format: check digit mismatch"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("email").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
