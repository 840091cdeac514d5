//! holefit Solver Engine
//!
//! This crate provides the randomized local search that places a figure
//! inside its hole:
//! - Pose moves and the move generator
//! - Acceptors (simulated annealing, hill climbing)
//! - Termination conditions
//! - Bonus-aware operating modes
//! - The annealing phase and the `PoseSolver` facade

pub mod acceptor;
pub mod heuristic;
pub mod initial;
pub mod mode;
pub mod phase;
pub mod scope;
pub mod solver;
pub mod stats;
pub mod termination;

#[cfg(test)]
pub(crate) mod test_utils;

pub use acceptor::{Acceptor, HillClimbingAcceptor, SimulatedAnnealingAcceptor};
pub use heuristic::{MoveContext, MoveGenerator, MoveUndo, NeighborhoodMoveGenerator, PoseMove};
pub use initial::random_in_hole;
pub use mode::{BonusModeController, HuntPhase, ModeSignal};
pub use phase::{AnnealingPhase, SolveStatus};
pub use scope::{BestPose, SolverScope};
pub use solver::{AttemptResult, InitialPose, PoseSolver};
pub use stats::SolverStats;
pub use termination::{
    DeadlineTermination, ExternalTermination, OrTermination, StepCountTermination, Termination,
    TimeTermination,
};
