//! Solver-level scope.
//!
//! Owns all mutable state of one solving attempt: the working pose and its
//! evaluation, the best feasible pose, the seeded random source, and the
//! counters terminations read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use holefit_core::{evaluate, Evaluation, HoleMask, Pose, PoseScore, Problem};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::heuristic::{MoveContext, MoveGenerator, MoveUndo, PoseMove};
use crate::stats::SolverStats;

/// Best feasible pose seen during an attempt.
///
/// `rank` counts operating-mode target bonuses the pose does not grant;
/// poses are ordered by `(rank, dislikes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPose {
    pub pose: Pose,
    pub score: PoseScore,
    pub rank: u32,
}

impl BestPose {
    fn key(&self) -> (u32, u64) {
        (self.rank, self.score.dislikes())
    }
}

/// Top-level scope for one solving attempt.
pub struct SolverScope {
    problem: Arc<Problem>,
    mask: Arc<HoleMask>,
    working: Pose,
    current: Evaluation,
    best: Option<BestPose>,
    rng: ChaCha8Rng,
    start_time: Option<Instant>,
    iteration: u64,
    stats: SolverStats,
}

impl SolverScope {
    /// Creates a scope seeded from the operating system.
    pub fn new(problem: Arc<Problem>, mask: Arc<HoleMask>, pose: Pose) -> Self {
        Self::with_rng(problem, mask, pose, ChaCha8Rng::from_os_rng())
    }

    /// Creates a scope whose search trajectory is reproducible from `seed`.
    pub fn with_seed(problem: Arc<Problem>, mask: Arc<HoleMask>, pose: Pose, seed: u64) -> Self {
        Self::with_rng(problem, mask, pose, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(problem: Arc<Problem>, mask: Arc<HoleMask>, pose: Pose, rng: ChaCha8Rng) -> Self {
        let current = evaluate(&problem, &pose);
        Self {
            problem,
            mask,
            working: pose,
            current,
            best: None,
            rng,
            start_time: None,
            iteration: 0,
            stats: SolverStats::default(),
        }
    }

    pub fn start_solving(&mut self) {
        self.start_time = Some(Instant::now());
        self.iteration = 0;
        self.stats.start();
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|t| t.elapsed())
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn mask(&self) -> &HoleMask {
        &self.mask
    }

    pub fn working_pose(&self) -> &Pose {
        &self.working
    }

    pub fn working_pose_mut(&mut self) -> &mut Pose {
        &mut self.working
    }

    /// Replaces the working pose and re-evaluates it.
    pub fn reset_working(&mut self, pose: Pose) {
        self.current = evaluate(&self.problem, &pose);
        self.working = pose;
    }

    /// Evaluation of the working pose as last accepted.
    pub fn current_evaluation(&self) -> &Evaluation {
        &self.current
    }

    pub fn set_current_evaluation(&mut self, evaluation: Evaluation) {
        self.current = evaluation;
    }

    /// Scores the working pose from scratch.
    pub fn evaluate_working(&self) -> Evaluation {
        evaluate(&self.problem, &self.working)
    }

    pub fn best(&self) -> Option<&BestPose> {
        self.best.as_ref()
    }

    pub fn best_score(&self) -> Option<PoseScore> {
        self.best.as_ref().map(|b| b.score)
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn increment_iteration(&mut self) -> u64 {
        self.iteration += 1;
        self.stats.record_iteration();
        self.iteration
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut SolverStats {
        &mut self.stats
    }

    /// Asks `generator` for a move from the working pose.
    pub fn propose<G: MoveGenerator + ?Sized>(
        &mut self,
        generator: &mut G,
        temperature_ratio: f64,
        snap_targets: &[usize],
    ) -> Option<PoseMove> {
        let ctx = MoveContext {
            problem: self.problem.as_ref(),
            mask: self.mask.as_ref(),
            pose: &self.working,
            temperature_ratio,
            snap_targets,
        };
        generator.propose(&ctx, &mut self.rng)
    }

    pub fn apply_move(&mut self, mv: &PoseMove) -> MoveUndo {
        mv.apply(&mut self.working)
    }

    /// Records the working pose as best if `score` is feasible and
    /// `(rank, dislikes)` beats the current best. Returns true on improvement.
    pub fn consider_best(&mut self, score: PoseScore, rank: u32) -> bool {
        if !score.is_feasible() {
            return false;
        }
        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| (rank, score.dislikes()) < best.key());
        if improves {
            self.best = Some(BestPose {
                pose: self.working.clone(),
                score,
                rank,
            });
            self.stats.record_improvement(self.iteration, score);
        }
        improves
    }

    /// Ends the attempt, returning the best pose, the final working pose
    /// with its evaluation, and the statistics.
    pub fn finish(mut self) -> (Option<BestPose>, Pose, Evaluation, SolverStats) {
        self.stats.finish();
        (self.best, self.working, self.current, self.stats)
    }
}

impl std::fmt::Debug for SolverScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverScope")
            .field("iteration", &self.iteration)
            .field("current", &self.current.score)
            .field("best", &self.best_score())
            .finish()
    }
}
