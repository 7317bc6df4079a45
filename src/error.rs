//! Error types for expects.
//!
//! All errors are strongly typed using thiserror so callers (and the host
//! framework adapter) can tell an unexpected value apart from a missing
//! recording or a broken expectation file.

use std::path::PathBuf;

use thiserror::Error;

use crate::validator::ValidationReport;

/// Reasons a constraint could not be generalized to accept a new value.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("No common substring between {old:?} and {new:?}")]
    NoCommonSubstring {
        old: String,
        new: String,
    },

    #[error("Cannot reconcile a {constraint} constraint with a {observed} value")]
    ShapeMismatch {
        constraint: &'static str,
        observed: &'static str,
    },

    #[error("Composite value exposes no serializable fields")]
    NoFields,

    #[error("Tracked field '{field}' is missing from the observed value")]
    MissingField {
        field: String,
    },

    #[error("Pattern /{regex}/ has no recorded examples to generalize from")]
    NoExamples {
        regex: String,
    },

    #[error("No generalization between {old} and {new}")]
    Incompatible {
        old: String,
        new: String,
    },
}

/// Errors raised while loading or saving an expectation document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed expectation file {path}: {message}")]
    Malformed {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to serialize expectations: {message}")]
    Serialize {
        message: String,
    },
}

/// Top-level error type for expects.
///
/// Every variant is a hard failure of the current test.
#[derive(Debug, Error)]
pub enum ExpectError {
    #[error("Unexpected value at '{id}': {report}")]
    UnexpectedValue {
        id: String,
        report: ValidationReport,
    },

    #[error("Field '{field}' missing at '{id}': {report}")]
    MissingField {
        id: String,
        field: String,
        report: ValidationReport,
    },

    #[error("No expectation recorded for '{id}' in scope '{scope}'")]
    NoExpectationRecorded {
        scope: String,
        id: String,
    },

    #[error("Unresolvable synthesis: {0}")]
    UnresolvableSynthesis(#[from] SynthesisError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid constraint: {reason}")]
    InvalidConstraint {
        reason: String,
    },

    #[error("No suite is active; start_suite must be called first")]
    NoActiveSuite,

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ExpectError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid-constraint error.
    #[must_use]
    pub fn invalid_constraint(reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            reason: reason.into(),
        }
    }

    /// Returns true if the value did not satisfy its expectation.
    #[must_use]
    pub const fn is_unexpected_value(&self) -> bool {
        matches!(self, Self::UnexpectedValue { .. } | Self::MissingField { .. })
    }

    /// Returns true if nothing was recorded for the assertion position.
    #[must_use]
    pub const fn is_no_expectation(&self) -> bool {
        matches!(self, Self::NoExpectationRecorded { .. })
    }

    /// Returns true if training could not generalize the constraint.
    #[must_use]
    pub const fn is_synthesis(&self) -> bool {
        matches!(self, Self::UnresolvableSynthesis(_))
    }

    /// Returns true if the expectation document could not be read or written.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// The validation report attached to a failed check, if any.
    #[must_use]
    pub const fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::UnexpectedValue { report, .. } | Self::MissingField { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// Result type alias for expects operations.
pub type ExpectResult<T> = Result<T, ExpectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_error_no_common_substring() {
        let err = SynthesisError::NoCommonSubstring {
            old: "abc".to_string(),
            new: "xyz".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("\"xyz\""));
    }

    #[test]
    fn test_synthesis_error_shape_mismatch() {
        let err = SynthesisError::ShapeMismatch {
            constraint: "exact",
            observed: "composite",
        };
        assert_eq!(
            format!("{err}"),
            "Cannot reconcile a exact constraint with a composite value"
        );
    }

    #[test]
    fn test_store_error_malformed() {
        let err = StoreError::Malformed {
            path: PathBuf::from("suite.json"),
            message: "expected value at line 1".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("suite.json"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn test_expect_error_from_synthesis() {
        let err: ExpectError = SynthesisError::NoFields.into();
        assert!(err.is_synthesis());
        assert!(!err.is_unexpected_value());
        assert!(err.report().is_none());
    }

    #[test]
    fn test_expect_error_from_store() {
        let err: ExpectError = StoreError::Serialize {
            message: "boom".to_string(),
        }
        .into();
        assert!(err.is_store());
        assert!(format!("{err}").contains("boom"));
    }

    #[test]
    fn test_expect_error_no_expectation() {
        let err = ExpectError::NoExpectationRecorded {
            scope: "Login".to_string(),
            id: "3".to_string(),
        };
        assert!(err.is_no_expectation());
        let msg = format!("{err}");
        assert!(msg.contains("'3'"));
        assert!(msg.contains("'Login'"));
    }

    #[test]
    fn test_expect_error_internal() {
        let err = ExpectError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
    }
}
