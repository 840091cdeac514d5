//! Starting placements.

use holefit_core::{HoleMask, Pose, Problem};
use rand::{Rng, RngCore};

/// Places every figure vertex on a uniformly drawn lattice point inside the
/// hole.
///
/// Edge lengths are ignored; the annealing penalty pulls the figure back into
/// shape. Falls back to the figure's own embedding when the hole contains no
/// lattice point.
pub fn random_in_hole(problem: &Problem, mask: &HoleMask, rng: &mut dyn RngCore) -> Pose {
    let inside = mask.inside_points();
    if inside.is_empty() {
        return Pose::identity(problem);
    }
    let vertices = (0..problem.figure().vertex_count())
        .map(|_| inside[rng.random_range(0..inside.len())])
        .collect();
    Pose::new(vertices)
}
