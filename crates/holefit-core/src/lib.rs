//! holefit Core - geometry, problem model and pose validation
//!
//! This crate provides the fundamental pieces every other holefit crate
//! builds on:
//! - Exact lattice geometry (points, segments, closed polygons)
//! - The immutable problem model (hole, figure, epsilon, bonuses)
//! - Poses and their bonus annotations
//! - Pure validity and dislike computation
//! - JSON problem and pose file formats

pub mod error;
pub mod geometry;
pub mod io;
pub mod pose;
pub mod problem;
pub mod score;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{HoleFitError, Result};
pub use geometry::{HoleMask, Point, Polygon};
pub use pose::{BonusUsage, Pose};
pub use problem::{BonusKind, BonusSpec, Edge, Figure, Problem, ProblemId};
pub use score::{PoseScore, ScoreParseError};
pub use validator::{
    compute_score, edge_length_valid, evaluate, granted_bonuses, segment_inside_hole, validate,
    Evaluation, Rules, Validation, Violation,
};
