//! PoseSolver - runs one solving attempt from configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use holefit_config::SolverConfig;
use holefit_core::{
    granted_bonuses, BonusKind, BonusSpec, BonusUsage, Evaluation, HoleFitError, HoleMask, Pose,
    PoseScore, Problem, Result,
};
use tracing::info;

use crate::acceptor::{Acceptor, HillClimbingAcceptor, SimulatedAnnealingAcceptor};
use crate::heuristic::NeighborhoodMoveGenerator;
use crate::initial::random_in_hole;
use crate::mode::BonusModeController;
use crate::phase::{AnnealingPhase, SolveStatus};
use crate::scope::{BestPose, SolverScope};
use crate::stats::SolverStats;
use crate::termination::{
    DeadlineTermination, ExternalTermination, OrTermination, StepCountTermination, TimeTermination,
};

/// Where an attempt starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InitialPose {
    /// The figure's original embedding.
    Identity,
    /// Every vertex on a random lattice point inside the hole.
    #[default]
    RandomInHole,
    Given(Pose),
}

/// Outcome of one attempt.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub status: SolveStatus,
    /// Best feasible pose, if any was found.
    pub best: Option<BestPose>,
    /// Working pose when the attempt stopped.
    pub final_pose: Pose,
    pub final_evaluation: Evaluation,
    /// Bonuses the best pose grants.
    pub granted: Vec<BonusSpec>,
    /// Whether the best pose meets the operating mode's bonus goal.
    pub bonus_acquired: bool,
    pub stats: SolverStats,
}

impl AttemptResult {
    pub fn best_score(&self) -> Option<PoseScore> {
        self.best.as_ref().map(|b| b.score)
    }

    /// The pose worth writing out: the best feasible one, otherwise the
    /// final working pose.
    pub fn output_pose(&self) -> &Pose {
        self.best
            .as_ref()
            .map(|b| &b.pose)
            .unwrap_or(&self.final_pose)
    }

    pub fn is_feasible(&self) -> bool {
        self.best.is_some()
    }
}

/// Builder-style facade over scope, phase and terminations.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use holefit_config::{OperatingModeConfig, SolverConfig};
/// use holefit_core::{Figure, Point, Problem};
/// use holefit_solver::{InitialPose, PoseSolver, SolveStatus};
///
/// let corners = vec![Point::new(0, 0), Point::new(6, 0), Point::new(0, 6)];
/// let figure = Figure::new(corners.clone(), &[(0, 1), (1, 2), (2, 0)]).unwrap();
/// let problem = Arc::new(Problem::new(corners, figure, 0, Vec::new()).unwrap());
///
/// let config = SolverConfig::new()
///     .with_random_seed(1)
///     .with_iteration_limit(1_000)
///     .with_operating_mode(OperatingModeConfig::ZeroHunter);
/// let result = PoseSolver::new(problem, config)
///     .with_initial_pose(InitialPose::Identity)
///     .solve()
///     .unwrap();
///
/// assert_eq!(result.status, SolveStatus::Converged);
/// assert_eq!(result.best_score().map(|s| s.dislikes()), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct PoseSolver {
    problem: Arc<Problem>,
    config: SolverConfig,
    mask: Option<Arc<HoleMask>>,
    initial: InitialPose,
    usages: Vec<BonusUsage>,
    terminate_flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl PoseSolver {
    pub fn new(problem: Arc<Problem>, config: SolverConfig) -> Self {
        Self {
            problem,
            config,
            mask: None,
            initial: InitialPose::default(),
            usages: Vec::new(),
            terminate_flag: None,
            deadline: None,
        }
    }

    pub fn with_initial_pose(mut self, initial: InitialPose) -> Self {
        self.initial = initial;
        self
    }

    /// Bonuses the pose is allowed to spend. Callers are responsible for
    /// only passing bonuses that have been unlocked for this puzzle.
    pub fn with_bonus_usages(mut self, usages: Vec<BonusUsage>) -> Self {
        self.usages = usages;
        self
    }

    /// Shared cancellation flag polled every iteration.
    pub fn with_terminate_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.terminate_flag = Some(flag);
        self
    }

    /// Wall-clock instant after which the attempt stops, in addition to the
    /// configured time limit.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Reuses a precomputed hole mask across attempts on the same problem.
    pub fn with_hole_mask(mut self, mask: Arc<HoleMask>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    /// Runs simulated annealing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPose` when the given initial pose or a bonus usage
    /// does not fit the problem.
    pub fn solve(&self) -> Result<AttemptResult> {
        let acceptor = SimulatedAnnealingAcceptor::from_config(&self.config.annealing);
        self.run(acceptor, None)
    }

    /// Runs greedy descent, accepting only non-worsening moves.
    ///
    /// Without a configured iteration limit the pass is capped at one
    /// cooling step's worth of iterations.
    pub fn polish(&self) -> Result<AttemptResult> {
        let cap = self.config.annealing.iterations_per_cooling_step;
        self.run(HillClimbingAcceptor::new(), Some(cap))
    }

    fn starting_pose(&self, scope: &mut SolverScope, mask: &HoleMask) -> Result<Pose> {
        let mut pose = match &self.initial {
            InitialPose::Identity => Pose::identity(&self.problem),
            InitialPose::RandomInHole => random_in_hole(&self.problem, mask, scope.rng()),
            InitialPose::Given(pose) => pose.clone(),
        };
        for usage in &self.usages {
            if pose.uses(usage.kind).is_some() {
                continue;
            }
            pose = match (usage.kind, usage.edge) {
                (BonusKind::BreakALeg, Some((a, b))) => {
                    pose.break_leg(&self.problem, a, b, usage.source)?
                }
                (BonusKind::BreakALeg, None) => {
                    return Err(HoleFitError::InvalidPose(
                        "BREAK_A_LEG usage without an edge".to_string(),
                    ))
                }
                _ => pose.with_bonus(*usage),
            };
        }
        pose.check_shape(&self.problem)?;
        Ok(pose)
    }

    fn run<A: Acceptor>(&self, acceptor: A, fallback_limit: Option<u64>) -> Result<AttemptResult> {
        let problem = Arc::clone(&self.problem);
        let mask = self
            .mask
            .clone()
            .unwrap_or_else(|| Arc::new(HoleMask::new(problem.hole())));
        let identity = Pose::identity(&problem);
        let mut scope = match self.config.random_seed {
            Some(seed) => SolverScope::with_seed(Arc::clone(&problem), Arc::clone(&mask), identity, seed),
            None => SolverScope::new(Arc::clone(&problem), Arc::clone(&mask), identity),
        };
        let start = self.starting_pose(&mut scope, &mask)?;
        scope.reset_working(start);

        info!(
            event = "solve_start",
            puzzle = ?problem.id(),
            vertices = scope.working_pose().len(),
            edges = problem.figure().edges().len(),
            mode = ?self.config.operating_mode,
            seed = ?self.config.random_seed,
        );
        scope.start_solving();

        let mode = BonusModeController::new(self.config.operating_mode, &problem);
        let generator = NeighborhoodMoveGenerator::for_problem(&problem, &self.config.annealing);
        let mut phase =
            AnnealingPhase::new(generator, acceptor, mode).with_annealing_config(&self.config.annealing);

        let termination = OrTermination::new((
            self.config.time_limit().map(TimeTermination::new),
            self.config
                .iteration_limit()
                .or(fallback_limit)
                .map(StepCountTermination::new),
            self.terminate_flag.clone().map(ExternalTermination::new),
            self.deadline.map(DeadlineTermination::new),
        ));

        let status = phase.solve(&mut scope, &termination);
        let (best, final_pose, final_evaluation, stats) = scope.finish();

        let granted: Vec<BonusSpec> = best
            .as_ref()
            .map(|b| granted_bonuses(&problem, &b.pose).cloned().collect())
            .unwrap_or_default();
        let bonus_acquired = best
            .as_ref()
            .is_some_and(|b| phase.mode().bonus_acquired(&problem, &b.pose));

        info!(
            event = "solve_end",
            status = %status,
            score = %best.as_ref().map_or(final_evaluation.score, |b| b.score),
            feasible = best.is_some(),
            granted = granted.len(),
            bonus_acquired = bonus_acquired,
            steps = stats.iterations,
            moves_evaluated = stats.moves_evaluated,
        );

        Ok(AttemptResult {
            status,
            best,
            final_pose,
            final_evaluation,
            granted,
            bonus_acquired,
            stats,
        })
    }
}
