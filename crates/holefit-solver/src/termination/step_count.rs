//! Iteration count termination.

use super::Termination;
use crate::scope::SolverScope;

/// Terminates after an iteration count.
///
/// # Example
///
/// ```
/// use holefit_solver::termination::StepCountTermination;
///
/// // Terminate after 1000 iterations
/// let term = StepCountTermination::new(1000);
/// ```
#[derive(Debug, Clone)]
pub struct StepCountTermination {
    limit: u64,
}

impl StepCountTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for StepCountTermination {
    fn is_terminated(&self, solver_scope: &SolverScope) -> bool {
        solver_scope.iteration() >= self.limit
    }
}
