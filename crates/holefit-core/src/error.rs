//! Error types for holefit

use thiserror::Error;

/// Main error type for problem and pose handling.
///
/// Validity violations of a pose are not errors; they are reported as
/// [`Violation`](crate::validator::Violation) values by the validator.
#[derive(Debug, Error)]
pub enum HoleFitError {
    /// Problem data violates a shape invariant (too few hole vertices,
    /// edge index out of range, duplicate bonus anchors, ...).
    #[error("Malformed problem: {0}")]
    MalformedProblem(String),

    /// Pose cannot be interpreted against its problem.
    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HoleFitError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        HoleFitError::MalformedProblem(msg.into())
    }
}

/// Result type alias for holefit operations
pub type Result<T> = std::result::Result<T, HoleFitError>;
