//! Termination conditions for an annealing attempt.
//!
//! Schedule-driven endings (temperature floor, ZeroHunter convergence) are
//! decided by the phase itself; these conditions cover budgets and
//! cancellation, and all of them end the attempt as `TimedOut`.

mod composite;
mod deadline;
mod external;
mod step_count;
mod time;

use std::fmt::Debug;

use crate::scope::SolverScope;

pub use composite::OrTermination;
pub use deadline::DeadlineTermination;
pub use external::ExternalTermination;
pub use step_count::StepCountTermination;
pub use time::TimeTermination;

/// Trait for determining when to stop solving.
pub trait Termination: Send + Debug {
    /// Returns true if solving should terminate.
    fn is_terminated(&self, solver_scope: &SolverScope) -> bool;
}

/// An absent condition never terminates.
impl<T: Termination> Termination for Option<T> {
    fn is_terminated(&self, solver_scope: &SolverScope) -> bool {
        self.as_ref()
            .is_some_and(|t| t.is_terminated(solver_scope))
    }
}
