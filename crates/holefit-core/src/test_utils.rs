//! Test utilities for holefit-core
//!
//! Small hand-checkable problems shared by the crate's test modules.

use crate::geometry::Point;
use crate::problem::{BonusSpec, Figure, Problem};

pub fn pt(x: i64, y: i64) -> Point {
    Point::new(x, y)
}

pub fn points(coords: &[(i64, i64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| pt(x, y)).collect()
}

/// Axis-aligned square hole `[0, size]^2`, counter-clockwise.
pub fn square_hole(size: i64) -> Vec<Point> {
    points(&[(0, 0), (size, 0), (size, size), (0, size)])
}

/// L-shaped hole with a reflex vertex at (5, 5).
pub fn l_hole() -> Vec<Point> {
    points(&[(0, 0), (10, 0), (10, 5), (5, 5), (5, 10), (0, 10)])
}

/// One edge of squared length 100 inside a 20x20 square.
pub fn segment_problem(epsilon: u64) -> Problem {
    let figure = Figure::new(points(&[(0, 0), (10, 0)]), &[(0, 1)]).unwrap();
    Problem::new(square_hole(20), figure, epsilon, Vec::new()).unwrap()
}

/// Two collinear edges of squared length 100 inside a 20x20 square.
pub fn path_problem(epsilon: u64) -> Problem {
    let figure = Figure::new(points(&[(0, 0), (10, 0), (20, 0)]), &[(0, 1), (1, 2)]).unwrap();
    Problem::new(square_hole(20), figure, epsilon, Vec::new()).unwrap()
}

/// A triangle figure identical to its hole; the identity pose scores zero.
pub fn triangle_problem(bonuses: Vec<BonusSpec>) -> Problem {
    let corners = points(&[(0, 0), (10, 0), (0, 10)]);
    let figure = Figure::new(corners.clone(), &[(0, 1), (1, 2), (2, 0)]).unwrap();
    Problem::new(corners, figure, 0, bonuses).unwrap()
}
