//! Pose validity and dislike computation.
//!
//! Everything here is a pure function of `(Problem, Pose)`. Length checks use
//! exact integer arithmetic: an edge with original squared length `L` placed
//! with squared length `L'` is valid iff `|L'/L - 1| * 10^6 <= epsilon`,
//! evaluated as `|L' - L| * 10^6 <= epsilon * L` in 128-bit integers.

use smallvec::SmallVec;

use crate::geometry::{Point, Polygon};
use crate::pose::{BonusUsage, Pose};
use crate::problem::{BonusKind, BonusSpec, Edge, Problem};
use crate::score::PoseScore;

const PPM: u128 = 1_000_000;

/// Fixed-point unit for pooled GLOBALIST deviations (10^-12 per unit).
const POOLED_UNIT: u128 = 1_000_000_000_000;

/// Magnitude assigned to structural violations that no move can repair
/// gradually (wrong vertex count, unusable bonus record).
const STRUCTURAL_VIOLATION: u64 = 1 << 40;

/// Rule relaxations in effect for one pose, derived from its bonus usages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    pub globalist: bool,
    pub wallhack: bool,
    pub superflex: bool,
    /// Edge exempted by SUPERFLEX; `None` exempts the worst edge.
    pub superflex_edge: Option<(usize, usize)>,
}

impl Rules {
    pub fn from_usages(usages: &[BonusUsage]) -> Self {
        let mut rules = Rules::default();
        for usage in usages {
            match usage.kind {
                BonusKind::Globalist => rules.globalist = true,
                BonusKind::Wallhack => rules.wallhack = true,
                BonusKind::Superflex => {
                    rules.superflex = true;
                    rules.superflex_edge = usage.edge;
                }
                BonusKind::BreakALeg => {}
            }
        }
        rules
    }

    fn exempts(&self, edge: &Edge) -> bool {
        self.superflex
            && self
                .superflex_edge
                .is_some_and(|(a, b)| edge.connects(a, b))
    }
}

/// One reason a pose is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Pose vertex count does not match the figure.
    VertexCount { expected: usize, actual: usize },
    /// A bonus usage cannot be applied to this problem.
    InvalidBonus { kind: BonusKind },
    /// Edge length outside tolerance; `excess_ppm` is the deviation beyond epsilon.
    InfeasibleEdge { a: usize, b: usize, excess_ppm: u64 },
    /// Edge segment leaves the hole.
    OutOfBounds { a: usize, b: usize, magnitude: u64 },
    /// Pooled GLOBALIST deviation exceeds `epsilon * edge_count`.
    GlobalistBudget { excess_ppm: u64 },
}

impl Violation {
    /// Penalty contribution of this violation.
    pub fn magnitude(&self) -> u64 {
        match *self {
            Violation::VertexCount { .. } | Violation::InvalidBonus { .. } => STRUCTURAL_VIOLATION,
            Violation::InfeasibleEdge { excess_ppm, .. } => excess_ppm,
            Violation::OutOfBounds { magnitude, .. } => magnitude,
            Violation::GlobalistBudget { excess_ppm } => excess_ppm,
        }
    }
}

/// Full assessment of a pose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub score: PoseScore,
    pub violations: Vec<Violation>,
}

impl Evaluation {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(u64),
    Invalid(Vec<Violation>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

fn endpoints(edge: &Edge, pose: &Pose) -> Option<(Point, Point)> {
    Some((*pose.vertices.get(edge.a)?, *pose.vertices.get(edge.b)?))
}

// |scale * current - original| and original, both exact.
fn deviation(edge: &Edge, pose: &Pose) -> Option<(u128, u128)> {
    let (pa, pb) = endpoints(edge, pose)?;
    let current = pa.distance_sq(pb) as i128 * edge.scale as i128;
    let original = edge.original_sq as i128;
    Some(((current - original).unsigned_abs(), original.unsigned_abs()))
}

/// Deviation beyond `epsilon`, in parts per million (rounded up).
///
/// Zero exactly when the edge passes the default length rule.
pub fn edge_excess_ppm(edge: &Edge, pose: &Pose, epsilon: u64) -> u64 {
    let Some((diff, original)) = deviation(edge, pose) else {
        return u64::MAX;
    };
    let ppm = (diff * PPM).div_ceil(original);
    u64::try_from(ppm.saturating_sub(epsilon as u128)).unwrap_or(u64::MAX)
}

/// Per-edge length rule.
///
/// The SUPERFLEX-designated edge is always valid. GLOBALIST pooling is a
/// whole-figure property and is applied by [`evaluate`], not here.
pub fn edge_length_valid(edge: &Edge, pose: &Pose, epsilon: u64, rules: &Rules) -> bool {
    if rules.exempts(edge) {
        return true;
    }
    match deviation(edge, pose) {
        Some((diff, original)) => diff * PPM <= epsilon as u128 * original,
        None => false,
    }
}

/// True if the edge's segment lies in the closed hole, or WALLHACK is active.
pub fn segment_inside_hole(edge: &Edge, pose: &Pose, hole: &Polygon, rules: &Rules) -> bool {
    if rules.wallhack {
        return true;
    }
    match endpoints(edge, pose) {
        Some((a, b)) => hole.contains_segment(a, b),
        None => false,
    }
}

/// Dislikes: for each hole vertex, the squared distance to the nearest pose
/// vertex, summed.
pub fn compute_score(pose: &Pose, hole: &Polygon) -> u64 {
    hole.vertices()
        .iter()
        .map(|h| {
            pose.vertices
                .iter()
                .map(|v| v.distance_sq(*h) as u64)
                .min()
                .unwrap_or(0)
        })
        .sum()
}

fn length_violations(edges: &[Edge], pose: &Pose, epsilon: u64, rules: &Rules, out: &mut Vec<Violation>) {
    let mut failing: SmallVec<[Violation; 8]> = edges
        .iter()
        .filter(|e| !rules.exempts(e))
        .filter_map(|e| {
            let excess_ppm = edge_excess_ppm(e, pose, epsilon);
            (excess_ppm > 0).then_some(Violation::InfeasibleEdge {
                a: e.a,
                b: e.b,
                excess_ppm,
            })
        })
        .collect();

    // SUPERFLEX without a designated edge forgives the worst offender.
    let mut forgiven = None;
    if rules.superflex && rules.superflex_edge.is_none() {
        if let Some(worst) = (0..failing.len()).max_by_key(|&i| failing[i].magnitude()) {
            if let Violation::InfeasibleEdge { a, b, .. } = failing.remove(worst) {
                forgiven = Some((a, b));
            }
        }
    }

    if !rules.globalist {
        out.extend(failing);
        return;
    }

    let counted: Vec<&Edge> = edges
        .iter()
        .filter(|e| !rules.exempts(e))
        .filter(|e| forgiven.map_or(true, |(a, b)| !e.connects(a, b)))
        .collect();
    let pooled: u128 = counted
        .iter()
        .map(|e| match deviation(e, pose) {
            Some((diff, original)) => (diff * POOLED_UNIT).div_ceil(original),
            None => u128::MAX / 4,
        })
        .sum();
    let budget = epsilon as u128 * edges.len() as u128 * PPM;
    if pooled > budget {
        let excess = (pooled - budget).div_ceil(PPM);
        out.push(Violation::GlobalistBudget {
            excess_ppm: u64::try_from(excess).unwrap_or(u64::MAX),
        });
    }
}

/// Scores a pose and lists every violation.
pub fn evaluate(problem: &Problem, pose: &Pose) -> Evaluation {
    let dislikes = compute_score(pose, problem.hole());
    let mut violations = Vec::new();

    let expected = problem.expected_vertex_count(&pose.bonuses);
    if pose.vertices.len() != expected {
        violations.push(Violation::VertexCount {
            expected,
            actual: pose.vertices.len(),
        });
        return finish(dislikes, violations);
    }

    let edges = match problem.effective_edges(&pose.bonuses) {
        Ok(edges) => edges,
        Err(_) => {
            violations.push(Violation::InvalidBonus {
                kind: BonusKind::BreakALeg,
            });
            return finish(dislikes, violations);
        }
    };
    let rules = Rules::from_usages(&pose.bonuses);

    length_violations(&edges, pose, problem.epsilon(), &rules, &mut violations);

    if !rules.wallhack {
        let hole = problem.hole();
        for edge in edges.iter() {
            if !segment_inside_hole(edge, pose, hole, &rules) {
                let outside: u64 = [edge.a, edge.b]
                    .iter()
                    .map(|&i| pose.vertices[i])
                    .filter(|&p| !hole.contains_point(p))
                    .map(|p| hole.nearest_vertex_distance_sq(p) as u64)
                    .sum();
                violations.push(Violation::OutOfBounds {
                    a: edge.a,
                    b: edge.b,
                    magnitude: 1 + outside,
                });
            }
        }
    }

    finish(dislikes, violations)
}

fn finish(dislikes: u64, violations: Vec<Violation>) -> Evaluation {
    let violation = violations
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(v.magnitude()));
    Evaluation {
        score: PoseScore::of(violation, dislikes),
        violations,
    }
}

/// `Valid(dislikes)` or `Invalid(violations)`.
pub fn validate(problem: &Problem, pose: &Pose) -> Validation {
    let evaluation = evaluate(problem, pose);
    if evaluation.is_feasible() {
        Validation::Valid(evaluation.score.dislikes())
    } else {
        Validation::Invalid(evaluation.violations)
    }
}

/// Bonus declarations of `problem` whose anchor condition `pose` satisfies.
pub fn granted_bonuses<'a>(problem: &'a Problem, pose: &'a Pose) -> impl Iterator<Item = &'a BonusSpec> {
    problem
        .bonuses()
        .iter()
        .filter(move |b| b.is_granted_by(&pose.vertices))
}
