//! Acceptors for annealing move acceptance.
//!
//! Acceptors decide whether a candidate pose replaces the working pose,
//! comparing scalar costs (lower is better). The phase draws the random roll
//! so that acceptors stay deterministic functions of their inputs.

mod hill_climbing;
mod simulated_annealing;

use std::fmt::Debug;

pub use hill_climbing::HillClimbingAcceptor;
pub use simulated_annealing::SimulatedAnnealingAcceptor;

/// Trait for accepting or rejecting candidate poses.
pub trait Acceptor: Send + Debug {
    /// Returns true if a candidate of cost `candidate_cost` should replace a
    /// working pose of cost `current_cost`. `roll` is uniform in `[0, 1)`.
    fn is_accepted(&self, current_cost: f64, candidate_cost: f64, roll: f64) -> bool;

    /// Called when a phase starts.
    fn phase_started(&mut self) {}

    /// Called after every iteration, accepted or not.
    fn step_ended(&mut self) {}

    /// Current temperature; zero for greedy acceptors.
    fn temperature(&self) -> f64 {
        0.0
    }

    /// Temperature over starting temperature, in `[0, 1]`.
    fn temperature_ratio(&self) -> f64 {
        0.0
    }

    /// True once the schedule has cooled past its floor.
    fn is_frozen(&self) -> bool {
        false
    }

    /// Restarts the schedule at a fraction of the starting temperature.
    fn reheat(&mut self, _factor: f64) {}
}
