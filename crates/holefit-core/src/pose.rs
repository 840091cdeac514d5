//! Candidate placements of a figure.

use serde::{Deserialize, Serialize};

use crate::error::{HoleFitError, Result};
use crate::geometry::Point;
use crate::problem::{BonusKind, Problem, ProblemId};

/// Record that a pose spends a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BonusUsage {
    #[serde(rename = "bonus")]
    pub kind: BonusKind,
    /// Puzzle that granted the bonus.
    #[serde(rename = "problem")]
    pub source: ProblemId,
    /// Designated edge for SUPERFLEX or BREAK_A_LEG.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "edge_pair")]
    pub edge: Option<(usize, usize)>,
}

impl BonusUsage {
    pub fn new(kind: BonusKind, source: ProblemId) -> Self {
        Self {
            kind,
            source,
            edge: None,
        }
    }

    pub fn on_edge(mut self, a: usize, b: usize) -> Self {
        self.edge = Some((a, b));
        self
    }
}

mod edge_pair {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(edge: &Option<(usize, usize)>, s: S) -> Result<S::Ok, S::Error> {
        edge.map(|(a, b)| [a, b]).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<(usize, usize)>, D::Error> {
        Ok(Option::<[usize; 2]>::deserialize(d)?.map(|[a, b]| (a, b)))
    }
}

/// Placement of every figure vertex, same indexing as the figure.
///
/// A pose spending BREAK_A_LEG carries one extra vertex at the end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub vertices: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bonuses: Vec<BonusUsage>,
}

impl Pose {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self {
            vertices,
            bonuses: Vec::new(),
        }
    }

    /// The figure in its original embedding.
    pub fn identity(problem: &Problem) -> Self {
        Self::new(problem.figure().vertices().to_vec())
    }

    pub fn with_bonus(mut self, usage: BonusUsage) -> Self {
        self.bonuses.push(usage);
        self
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn uses(&self, kind: BonusKind) -> Option<&BonusUsage> {
        self.bonuses.iter().find(|u| u.kind == kind)
    }

    /// Splits figure edge `(a, b)` by appending a vertex at its (rounded)
    /// midpoint and recording the BREAK_A_LEG usage.
    pub fn break_leg(mut self, problem: &Problem, a: usize, b: usize, source: ProblemId) -> Result<Self> {
        if self.uses(BonusKind::BreakALeg).is_some() {
            return Err(HoleFitError::InvalidPose("pose already breaks a leg".to_string()));
        }
        if problem.figure().find_edge(a, b).is_none() {
            return Err(HoleFitError::InvalidPose(format!(
                "({}, {}) is not a figure edge",
                a, b
            )));
        }
        if self.vertices.len() != problem.figure().vertex_count() {
            return Err(HoleFitError::InvalidPose(format!(
                "pose has {} vertices, figure has {}",
                self.vertices.len(),
                problem.figure().vertex_count()
            )));
        }
        let (pa, pb) = (self.vertices[a], self.vertices[b]);
        let mid = Point::new((pa.x + pb.x).div_euclid(2), (pa.y + pb.y).div_euclid(2));
        self.vertices.push(mid);
        self.bonuses
            .push(BonusUsage::new(BonusKind::BreakALeg, source).on_edge(a, b));
        Ok(self)
    }

    /// Checks the vertex count against the problem and the recorded usages.
    pub fn check_shape(&self, problem: &Problem) -> Result<()> {
        let expected = problem.expected_vertex_count(&self.bonuses);
        if self.vertices.len() != expected {
            return Err(HoleFitError::InvalidPose(format!(
                "pose has {} vertices, expected {}",
                self.vertices.len(),
                expected
            )));
        }
        Ok(())
    }
}
