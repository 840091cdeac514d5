//! Move system for perturbing poses.
//!
//! A [`MoveGenerator`] proposes a [`PoseMove`]; the phase applies it to the
//! working pose, scores the result, and reverts it through the returned
//! [`MoveUndo`] when the acceptor rejects the candidate. Candidates need not
//! be feasible.

mod moves;
mod neighborhood;

use std::fmt::Debug;

use holefit_core::{HoleMask, Pose, Problem};
use rand::RngCore;

pub use moves::{MoveUndo, PoseMove};
pub use neighborhood::NeighborhoodMoveGenerator;

/// Read-only view of the search state handed to a generator.
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    pub problem: &'a Problem,
    pub mask: &'a HoleMask,
    pub pose: &'a Pose,
    /// Current temperature over starting temperature, in `[0, 1]`.
    pub temperature_ratio: f64,
    /// Indices into `problem.bonuses()` the operating mode is steering toward.
    pub snap_targets: &'a [usize],
}

/// Proposes candidate moves.
pub trait MoveGenerator: Send + Debug {
    /// Returns `None` when no move applies to the current pose.
    fn propose(&mut self, ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> Option<PoseMove>;
}
