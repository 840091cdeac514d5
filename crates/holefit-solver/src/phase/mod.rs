//! Solver phases.
//!
//! An attempt runs a single [`AnnealingPhase`]; the polish pass reuses the
//! same phase with a greedy acceptor.

mod annealing;

use std::fmt;

pub use annealing::AnnealingPhase;

/// Lifecycle of one solving attempt.
///
/// `Initializing` and `Searching` are transient; an attempt always ends in
/// one of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    Initializing,
    Searching,
    /// The operating mode's goal was met.
    Converged,
    /// A budget ran out or the attempt was cancelled.
    TimedOut,
    /// The temperature fell below its floor with no reheats left.
    Exhausted,
}

impl SolveStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SolveStatus::Converged | SolveStatus::TimedOut | SolveStatus::Exhausted
        )
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Initializing => "INITIALIZING",
            SolveStatus::Searching => "SEARCHING",
            SolveStatus::Converged => "CONVERGED",
            SolveStatus::TimedOut => "TIMED_OUT",
            SolveStatus::Exhausted => "EXHAUSTED",
        })
    }
}
