//! Core data types and aggregation for Tempest station observations
//!
//! This crate provides the observation data model and the pure
//! aggregation paths (day bucketing, window building, monthly extremes).
//! It performs no I/O; the fetch and live-update crates feed it.

pub mod bucket;
pub mod monthly;
pub mod types;
pub mod window;

pub use bucket::*;
pub use monthly::*;
pub use types::*;
pub use window::*;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// No valid observations remained after fetching or bucketing.
    /// Surfaced distinctly so callers can render "no data" instead of
    /// "fetch failed".
    #[error("no observations in dataset")]
    EmptyDataset,

    #[error("invalid observation tuple: {0}")]
    InvalidTuple(String),
}

pub type AggregateResult<T> = Result<T, AggregateError>;

/// Wire shape for error responses handed back to callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Build a body from any error, keeping its immediate source as details.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            error: err.to_string(),
            details: err.source().map(|s| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_skips_missing_details() {
        let body = ErrorBody::new("no data");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"no data"}"#);
    }

    #[test]
    fn test_error_body_from_error() {
        let body = ErrorBody::from_error(&AggregateError::EmptyDataset);
        assert_eq!(body.error, "no observations in dataset");
        assert_eq!(body.details, None);
    }
}
