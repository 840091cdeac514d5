//! Error types for the orchestrator.

use std::path::PathBuf;

use holefit_config::ConfigError;
use holefit_core::{HoleFitError, ProblemId};
use thiserror::Error;

use crate::puzzle::PuzzleState;

/// Orchestrator errors.
///
/// Only `State` and `Config` abort a run; every other variant is contained
/// to the puzzle it concerns.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Problem(#[from] HoleFitError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Persisted state could not be read or written.
    #[error("State file {path}: {message}")]
    State { path: PathBuf, message: String },

    #[error("Puzzle {puzzle} cannot move from {from} to {to}")]
    InvalidTransition {
        puzzle: ProblemId,
        from: PuzzleState,
        to: PuzzleState,
    },

    /// Retryable submission failure (network, 5xx, rate limit).
    #[error("Transient submission failure: {0}")]
    SubmissionTransient(String),

    /// The service rejected the pose; retrying will not help.
    #[error("Submission rejected: {0}")]
    SubmissionPermanent(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Cancelled")]
    Cancelled,
}

impl OrchestratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, OrchestratorError::SubmissionTransient(_))
    }

    pub(crate) fn state(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        OrchestratorError::State {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
