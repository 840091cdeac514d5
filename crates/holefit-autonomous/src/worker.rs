//! Solving one puzzle: a sequence of attempts inside the puzzle's time slice.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use holefit_config::{OperatingModeConfig, SolverConfig};
use holefit_core::{BonusKind, BonusUsage, HoleMask, Pose, Problem, ProblemId};
use holefit_solver::{InitialPose, PoseSolver, SolveStatus};
use tracing::{info, warn};

use crate::graph::BonusGrant;

/// How one attempt is run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Strategy {
    pub mode: OperatingModeConfig,
    pub initial: InitialPose,
    pub usages: Vec<BonusUsage>,
}

/// Work handed to a blocking worker.
#[derive(Debug, Clone)]
pub(crate) struct PuzzleJob {
    pub id: ProblemId,
    pub problem: Arc<Problem>,
    pub mask: Arc<HoleMask>,
    pub config: SolverConfig,
    /// Unlocked grants the puzzle may spend.
    pub usable: Vec<BonusGrant>,
    /// Other puzzles this one can grant a bonus to.
    pub consumers: Vec<ProblemId>,
    pub cancel: Arc<AtomicBool>,
}

/// Best valid pose of a puzzle's attempts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PuzzleBest {
    pub pose: Pose,
    pub dislikes: u64,
    pub grants: Vec<BonusGrant>,
}

#[derive(Debug, Clone)]
pub(crate) struct PuzzleOutcome {
    pub id: ProblemId,
    pub best: Option<PuzzleBest>,
    pub attempts: u32,
    pub statuses: Vec<SolveStatus>,
    /// Last attempt error, if any attempt could not run.
    pub error: Option<String>,
}

/// Spends `grant` on `problem`. BREAK_A_LEG splits the longest edge;
/// SUPERFLEX leaves the exempt edge to the validator.
pub(crate) fn usage_for(grant: &BonusGrant, problem: &Problem) -> Option<BonusUsage> {
    let usage = BonusUsage::new(grant.kind, grant.donor);
    match grant.kind {
        BonusKind::BreakALeg => problem
            .figure()
            .edges()
            .iter()
            .max_by_key(|e| (e.original_sq, Reverse((e.a, e.b))))
            .map(|e| usage.on_edge(e.a, e.b)),
        _ => Some(usage),
    }
}

/// Attempt plan: the figure's own embedding first, then one attempt per
/// usable bonus, then bonus collection for each consumer, then the
/// configured mode from a random start. The plan repeats to fill `count`.
pub(crate) fn strategies(job: &PuzzleJob, count: u32) -> Vec<Strategy> {
    let mut plan = vec![Strategy {
        mode: OperatingModeConfig::ZeroHunter,
        initial: InitialPose::Identity,
        usages: Vec::new(),
    }];
    plan.extend(job.usable.iter().filter_map(|grant| {
        usage_for(grant, &job.problem).map(|usage| Strategy {
            mode: OperatingModeConfig::ZeroHunter,
            initial: InitialPose::RandomInHole,
            usages: vec![usage],
        })
    }));
    plan.extend(job.consumers.iter().map(|&target| Strategy {
        mode: OperatingModeConfig::BonusCollector { target },
        initial: InitialPose::RandomInHole,
        usages: Vec::new(),
    }));
    plan.push(Strategy {
        mode: job.config.operating_mode,
        initial: InitialPose::RandomInHole,
        usages: Vec::new(),
    });

    (0..count as usize)
        .map(|i| plan[i % plan.len()].clone())
        .collect()
}

/// Runs the attempt plan, keeping the lowest-dislikes valid pose (more
/// grants break ties).
pub(crate) fn solve_puzzle(job: PuzzleJob) -> PuzzleOutcome {
    let orchestrator = &job.config.orchestrator;
    let puzzle_deadline = Instant::now() + orchestrator.puzzle_time_limit();
    let plan = strategies(&job, orchestrator.attempts_per_puzzle);

    let mut outcome = PuzzleOutcome {
        id: job.id,
        best: None,
        attempts: 0,
        statuses: Vec::new(),
        error: None,
    };

    for (index, strategy) in plan.into_iter().enumerate() {
        if job.cancel.load(Ordering::Relaxed) || Instant::now() >= puzzle_deadline {
            break;
        }
        let deadline = (Instant::now() + orchestrator.attempt_time_limit()).min(puzzle_deadline);
        let mut config = job.config.clone().with_operating_mode(strategy.mode);
        config.random_seed = job
            .config
            .random_seed
            .map(|seed| seed ^ (u64::from(job.id.0) << 16) ^ index as u64);

        let solver = PoseSolver::new(Arc::clone(&job.problem), config)
            .with_hole_mask(Arc::clone(&job.mask))
            .with_initial_pose(strategy.initial)
            .with_bonus_usages(strategy.usages)
            .with_terminate_flag(Arc::clone(&job.cancel))
            .with_deadline(deadline);

        outcome.attempts += 1;
        let result = match solver.solve() {
            Ok(result) => result,
            Err(e) => {
                warn!(event = "attempt_error", puzzle = %job.id, attempt = index, error = %e);
                outcome.error = Some(e.to_string());
                continue;
            }
        };

        info!(
            event = "attempt_end",
            puzzle = %job.id,
            attempt = index,
            mode = ?strategy.mode,
            status = %result.status,
            dislikes = ?result.best_score().map(|s| s.dislikes()),
            bonus_acquired = result.bonus_acquired,
        );
        outcome.statuses.push(result.status);

        let Some(best) = result.best else { continue };
        let grants: Vec<BonusGrant> = result
            .granted
            .iter()
            .map(|spec| BonusGrant {
                donor: spec.donor.unwrap_or(job.id),
                target: spec.target.unwrap_or(job.id),
                kind: spec.kind,
            })
            .collect();
        let candidate = PuzzleBest {
            pose: best.pose,
            dislikes: best.score.dislikes(),
            grants,
        };
        let better = outcome.best.as_ref().map_or(true, |current| {
            (candidate.dislikes, Reverse(candidate.grants.len()))
                < (current.dislikes, Reverse(current.grants.len()))
        });
        if better {
            outcome.best = Some(candidate);
        }
    }
    outcome
}
