//! Test utilities for holefit-solver

use std::sync::Arc;

use holefit_core::{BonusSpec, Figure, HoleMask, Point, Pose, Problem};

use crate::scope::SolverScope;

pub fn pt(x: i64, y: i64) -> Point {
    Point::new(x, y)
}

/// Right triangle with legs of length 10, placed in the square hole
/// `[0, size]^2` with a 1% tolerance.
pub fn square_problem(size: i64) -> Problem {
    let hole = vec![pt(0, 0), pt(size, 0), pt(size, size), pt(0, size)];
    let figure = Figure::new(
        vec![pt(0, 0), pt(10, 0), pt(0, 10)],
        &[(0, 1), (1, 2), (2, 0)],
    )
    .unwrap();
    Problem::new(hole, figure, 10_000, Vec::new()).unwrap()
}

/// A triangle figure identical to its hole; the identity pose scores zero.
pub fn triangle_problem(bonuses: Vec<BonusSpec>) -> Problem {
    let corners = vec![pt(0, 0), pt(10, 0), pt(0, 10)];
    let figure = Figure::new(corners.clone(), &[(0, 1), (1, 2), (2, 0)]).unwrap();
    Problem::new(corners, figure, 0, bonuses).unwrap()
}

/// Seeded scope over `problem`, starting from `pose`.
pub fn scope_for(problem: Problem, pose: Pose, seed: u64) -> SolverScope {
    let mask = Arc::new(HoleMask::new(problem.hole()));
    SolverScope::with_seed(Arc::new(problem), mask, pose, seed)
}
