//! Temperature-scaled neighborhood moves.

use holefit_config::AnnealingConfig;
use holefit_core::{Point, Problem};
use rand::{Rng, RngCore};
use smallvec::SmallVec;

use super::{MoveContext, MoveGenerator, PoseMove};

/// Attempts at landing a shifted vertex inside the hole before keeping
/// whatever was drawn last.
const SHIFT_RETRIES: usize = 3;

/// Single-vertex shifts, rigid translations and bonus-anchor snaps.
///
/// The shift and translation radius is `max_radius * temperature_ratio`,
/// never below one lattice step.
///
/// # Example
///
/// ```
/// use holefit_solver::NeighborhoodMoveGenerator;
///
/// let generator = NeighborhoodMoveGenerator::new(8, 0.05, 0.0);
/// assert_eq!(generator.radius(1.0), 8);
/// assert_eq!(generator.radius(0.0), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborhoodMoveGenerator {
    max_radius: i64,
    translate_probability: f64,
    snap_probability: f64,
}

impl NeighborhoodMoveGenerator {
    pub fn new(max_radius: i64, translate_probability: f64, snap_probability: f64) -> Self {
        Self {
            max_radius: max_radius.max(1),
            translate_probability,
            snap_probability,
        }
    }

    /// Radius from a quarter of the hole's larger side.
    pub fn for_problem(problem: &Problem, config: &AnnealingConfig) -> Self {
        let span = problem
            .hole()
            .bounding_box()
            .map(|(lo, hi)| (hi.x - lo.x).max(hi.y - lo.y))
            .unwrap_or(4);
        Self::new(
            span / 4,
            config.translate_probability,
            config.bonus_snap_probability,
        )
    }

    pub fn radius(&self, temperature_ratio: f64) -> i64 {
        let scaled = (self.max_radius as f64 * temperature_ratio.clamp(0.0, 1.0)).ceil() as i64;
        scaled.clamp(1, self.max_radius)
    }

    fn offset(radius: i64, rng: &mut dyn RngCore) -> Point {
        loop {
            let d = Point::new(
                rng.random_range(-radius..=radius),
                rng.random_range(-radius..=radius),
            );
            if d != Point::default() {
                return d;
            }
        }
    }

    fn shift(&self, ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> Option<PoseMove> {
        if ctx.pose.is_empty() {
            return None;
        }
        let vertex = rng.random_range(0..ctx.pose.len());
        let radius = self.radius(ctx.temperature_ratio);
        let from = ctx.pose.vertices[vertex];
        let mut to = from + Self::offset(radius, rng);
        for _ in 1..SHIFT_RETRIES {
            if ctx.mask.contains(to) {
                break;
            }
            to = from + Self::offset(radius, rng);
        }
        Some(PoseMove::Shift { vertex, to })
    }

    fn translate(&self, ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> PoseMove {
        PoseMove::Translate {
            delta: Self::offset(self.radius(ctx.temperature_ratio), rng),
        }
    }

    fn snap(&self, ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> Option<PoseMove> {
        let &target = ctx
            .snap_targets
            .get(rng.random_range(0..ctx.snap_targets.len()))?;
        let spec = ctx.problem.bonuses().get(target)?;

        let placements: SmallVec<[(usize, Point); 4]> = match &spec.anchor_vertices {
            Some(indices) => indices
                .iter()
                .copied()
                .zip(spec.anchors.iter().copied())
                .filter(|&(i, _)| i < ctx.pose.len())
                .collect(),
            None => {
                // Greedy: each anchor takes the nearest vertex not yet placed.
                let mut placed: SmallVec<[(usize, Point); 4]> = SmallVec::new();
                for &anchor in &spec.anchors {
                    let nearest = ctx
                        .pose
                        .vertices
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| placed.iter().all(|&(j, _)| j != *i))
                        .min_by_key(|(_, v)| v.distance_sq(anchor))
                        .map(|(i, _)| i);
                    if let Some(i) = nearest {
                        placed.push((i, anchor));
                    }
                }
                placed
            }
        };

        let changes = placements
            .iter()
            .any(|&(i, p)| ctx.pose.vertices[i] != p);
        changes.then_some(PoseMove::Snap { placements })
    }
}

impl MoveGenerator for NeighborhoodMoveGenerator {
    fn propose(&mut self, ctx: &MoveContext<'_>, rng: &mut dyn RngCore) -> Option<PoseMove> {
        let roll: f64 = rng.random();
        let snap_share = if ctx.snap_targets.is_empty() {
            0.0
        } else {
            self.snap_probability
        };
        if roll < snap_share {
            if let Some(snap) = self.snap(ctx, rng) {
                return Some(snap);
            }
        }
        if roll < snap_share + self.translate_probability {
            return Some(self.translate(ctx, rng));
        }
        self.shift(ctx, rng)
    }
}
