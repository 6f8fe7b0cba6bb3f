//! Error types for the analytics engine.

use thiserror::Error;

/// Errors raised by engine entry points.
///
/// Every variant is raised before any aggregation work starts. Empty input is
/// never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("invalid range: {field}: {reason}")]
    InvalidRange { field: String, reason: String },
}

impl AnalyticsError {
    pub fn invalid_range(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
