//! Absolute deadline termination.

use std::time::Instant;

use super::Termination;
use crate::scope::SolverScope;

/// Terminates at a wall-clock instant shared by several attempts, such as
/// the end of a puzzle's time slice.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineTermination {
    deadline: Instant,
}

impl DeadlineTermination {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }
}

impl Termination for DeadlineTermination {
    fn is_terminated(&self, _solver_scope: &SolverScope) -> bool {
        Instant::now() >= self.deadline
    }
}
