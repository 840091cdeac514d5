//! Immutable puzzle description.
//!
//! A [`Problem`] is validated once at construction and never mutated
//! afterwards; solvers share it behind an `Arc`.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HoleFitError, Result};
use crate::geometry::{Point, Polygon};
use crate::pose::BonusUsage;

/// Puzzle identifier as used by the submission service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(pub u32);

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rule relaxations that can be collected in one puzzle and spent in another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusKind {
    /// Edge tolerance is pooled across all edges.
    Globalist,
    /// Segments may leave the hole.
    Wallhack,
    /// One edge may have any length.
    Superflex,
    /// One edge is split in two at a new vertex.
    BreakALeg,
}

impl BonusKind {
    pub const ALL: [BonusKind; 4] = [
        BonusKind::Globalist,
        BonusKind::Wallhack,
        BonusKind::Superflex,
        BonusKind::BreakALeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BonusKind::Globalist => "GLOBALIST",
            BonusKind::Wallhack => "WALLHACK",
            BonusKind::Superflex => "SUPERFLEX",
            BonusKind::BreakALeg => "BREAK_A_LEG",
        }
    }
}

impl fmt::Display for BonusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bonus declared by a problem.
///
/// The bonus is *granted* by a pose when its anchor condition holds; it then
/// becomes usable by `target` (or by the declaring puzzle itself when no
/// target is given).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusSpec {
    pub kind: BonusKind,
    /// Points that must be covered by pose vertices.
    pub anchors: Vec<Point>,
    /// When set, `anchor_vertices[i]` must sit exactly on `anchors[i]`.
    /// Otherwise any pose vertex may cover an anchor.
    pub anchor_vertices: Option<Vec<usize>>,
    /// Puzzle that declares (and can grant) the bonus.
    pub donor: Option<ProblemId>,
    /// Puzzle that may spend the bonus.
    pub target: Option<ProblemId>,
}

impl BonusSpec {
    pub fn new(kind: BonusKind, anchors: Vec<Point>) -> Self {
        Self {
            kind,
            anchors,
            anchor_vertices: None,
            donor: None,
            target: None,
        }
    }

    pub fn with_anchor_vertices(mut self, vertices: Vec<usize>) -> Self {
        self.anchor_vertices = Some(vertices);
        self
    }

    pub fn with_target(mut self, target: ProblemId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_donor(mut self, donor: ProblemId) -> Self {
        self.donor = Some(donor);
        self
    }

    /// Exact, coordinate-for-coordinate anchor check.
    pub fn is_granted_by(&self, vertices: &[Point]) -> bool {
        match &self.anchor_vertices {
            Some(indices) => indices
                .iter()
                .zip(&self.anchors)
                .all(|(&i, &anchor)| vertices.get(i) == Some(&anchor)),
            None => self.anchors.iter().all(|a| vertices.contains(a)),
        }
    }

    /// Sum of squared distances still separating the pose from the anchors.
    ///
    /// Zero exactly when [`is_granted_by`](Self::is_granted_by) holds.
    pub fn anchor_distance(&self, vertices: &[Point]) -> i64 {
        match &self.anchor_vertices {
            Some(indices) => indices
                .iter()
                .zip(&self.anchors)
                .map(|(&i, &anchor)| {
                    vertices
                        .get(i)
                        .map_or(i64::MAX / 4, |v| v.distance_sq(anchor))
                })
                .sum(),
            None => self
                .anchors
                .iter()
                .map(|&anchor| {
                    vertices
                        .iter()
                        .map(|v| v.distance_sq(anchor))
                        .min()
                        .unwrap_or(i64::MAX / 4)
                })
                .sum(),
        }
    }
}

/// A length-constrained figure edge.
///
/// `original_sq` is the squared length in the figure's original embedding.
/// The reference squared length the edge must keep is `original_sq / scale`;
/// `scale` is 1 for ordinary edges and 4 for the two halves of a broken leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub original_sq: i64,
    pub scale: i64,
}

impl Edge {
    pub fn connects(&self, a: usize, b: usize) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// Original vertex embedding plus edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    vertices: Vec<Point>,
    edges: Vec<Edge>,
}

impl Figure {
    /// Builds a figure, deriving each edge's original squared length.
    pub fn new(vertices: Vec<Point>, pairs: &[(usize, usize)]) -> Result<Self> {
        let n = vertices.len();
        let mut edges = Vec::with_capacity(pairs.len());
        for &(a, b) in pairs {
            if a >= n || b >= n {
                return Err(HoleFitError::malformed(format!(
                    "edge ({}, {}) references a vertex outside 0..{}",
                    a, b, n
                )));
            }
            let original_sq = vertices[a].distance_sq(vertices[b]);
            if original_sq == 0 {
                return Err(HoleFitError::malformed(format!(
                    "edge ({}, {}) has zero length",
                    a, b
                )));
            }
            edges.push(Edge {
                a,
                b,
                original_sq,
                scale: 1,
            });
        }
        Ok(Self { vertices, edges })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<&Edge> {
        self.edges.iter().find(|e| e.connects(a, b))
    }
}

/// One puzzle: hole, figure, tolerance and bonus declarations.
#[derive(Debug, Clone)]
pub struct Problem {
    id: Option<ProblemId>,
    hole: Polygon,
    figure: Figure,
    epsilon: u64,
    bonuses: Vec<BonusSpec>,
}

impl Problem {
    /// Validates and assembles a problem.
    ///
    /// # Errors
    ///
    /// Returns `MalformedProblem` when the hole has fewer than three
    /// vertices, the figure is empty, or two bonuses share an anchor.
    pub fn new(
        hole: Vec<Point>,
        figure: Figure,
        epsilon: u64,
        bonuses: Vec<BonusSpec>,
    ) -> Result<Self> {
        if hole.len() < 3 {
            return Err(HoleFitError::malformed(format!(
                "hole needs at least 3 vertices, got {}",
                hole.len()
            )));
        }
        if figure.vertex_count() == 0 {
            return Err(HoleFitError::malformed("figure has no vertices"));
        }

        let mut seen: HashSet<&[Point]> = HashSet::new();
        for bonus in &bonuses {
            if bonus.anchors.is_empty() {
                return Err(HoleFitError::malformed(format!(
                    "{} bonus has no anchor points",
                    bonus.kind
                )));
            }
            if !seen.insert(bonus.anchors.as_slice()) {
                return Err(HoleFitError::malformed(format!(
                    "duplicate bonus declaration at anchor {:?}",
                    bonus.anchors
                )));
            }
            if let Some(indices) = &bonus.anchor_vertices {
                if indices.len() != bonus.anchors.len() {
                    return Err(HoleFitError::malformed(format!(
                        "{} bonus pairs {} anchor vertices with {} anchor points",
                        bonus.kind,
                        indices.len(),
                        bonus.anchors.len()
                    )));
                }
                if let Some(bad) = indices.iter().find(|&&i| i >= figure.vertex_count()) {
                    return Err(HoleFitError::malformed(format!(
                        "{} bonus anchors vertex {} outside the figure",
                        bonus.kind, bad
                    )));
                }
            }
        }

        Ok(Self {
            id: None,
            hole: Polygon::new(hole),
            figure,
            epsilon,
            bonuses,
        })
    }

    /// Tags the problem with its puzzle id; bonuses without a donor inherit it.
    pub fn with_id(mut self, id: ProblemId) -> Self {
        self.id = Some(id);
        for bonus in &mut self.bonuses {
            bonus.donor.get_or_insert(id);
        }
        self
    }

    pub fn id(&self) -> Option<ProblemId> {
        self.id
    }

    pub fn hole(&self) -> &Polygon {
        &self.hole
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    pub fn epsilon(&self) -> u64 {
        self.epsilon
    }

    pub fn bonuses(&self) -> &[BonusSpec] {
        &self.bonuses
    }

    /// Pose vertex count required under the given bonus usages.
    pub fn expected_vertex_count(&self, usages: &[BonusUsage]) -> usize {
        let extra = usages
            .iter()
            .filter(|u| u.kind == BonusKind::BreakALeg)
            .count()
            .min(1);
        self.figure.vertex_count() + extra
    }

    /// Edge set in effect under the given bonus usages.
    ///
    /// A BREAK_A_LEG usage replaces edge `(a, b)` by `(a, m)` and `(m, b)`,
    /// where `m` is the vertex appended after the figure's own vertices.
    pub fn effective_edges(&self, usages: &[BonusUsage]) -> Result<Cow<'_, [Edge]>> {
        let Some(leg) = usages.iter().find(|u| u.kind == BonusKind::BreakALeg) else {
            return Ok(Cow::Borrowed(self.figure.edges()));
        };
        let (a, b) = leg.edge.ok_or_else(|| {
            HoleFitError::InvalidPose("BREAK_A_LEG usage without an edge".to_string())
        })?;
        let broken = *self.figure.find_edge(a, b).ok_or_else(|| {
            HoleFitError::InvalidPose(format!("BREAK_A_LEG edge ({}, {}) is not a figure edge", a, b))
        })?;
        let m = self.figure.vertex_count();
        let mut edges: Vec<Edge> = self
            .figure
            .edges()
            .iter()
            .copied()
            .filter(|e| !e.connects(a, b))
            .collect();
        for (from, to) in [(broken.a, m), (m, broken.b)] {
            edges.push(Edge {
                a: from,
                b: to,
                original_sq: broken.original_sq,
                scale: 4,
            });
        }
        Ok(Cow::Owned(edges))
    }
}

#[cfg(test)]
mod tests;
