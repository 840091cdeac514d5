//! Annealing phase implementation.

use std::sync::Arc;
use std::time::Instant;

use holefit_config::AnnealingConfig;
use holefit_core::Problem;
use rand::Rng;
use tracing::{debug, info, trace};

use super::SolveStatus;
use crate::acceptor::Acceptor;
use crate::heuristic::MoveGenerator;
use crate::mode::{BonusModeController, ModeSignal};
use crate::scope::SolverScope;
use crate::termination::Termination;

/// Randomized local search over poses.
///
/// Each iteration:
/// 1. Proposes a move and applies it to the working pose
/// 2. Evaluates the candidate and prices it through the operating mode
/// 3. Offers feasible candidates to best-pose tracking, accepted or not
/// 4. Keeps or reverts the move as the acceptor decides
///
/// When the acceptor freezes, the schedule is reheated up to `max_reheats`
/// times before the phase ends as `Exhausted`. A BonusHunter still
/// collecting at the first freeze moves on to optimizing with a fresh
/// schedule that does not count as a reheat.
#[derive(Debug)]
pub struct AnnealingPhase<G, A> {
    generator: G,
    acceptor: A,
    mode: BonusModeController,
    max_reheats: u32,
    reheat_factor: f64,
    violation_weight: f64,
    status: SolveStatus,
}

impl<G: MoveGenerator, A: Acceptor> AnnealingPhase<G, A> {
    pub fn new(generator: G, acceptor: A, mode: BonusModeController) -> Self {
        Self {
            generator,
            acceptor,
            mode,
            max_reheats: 0,
            reheat_factor: 1.0,
            violation_weight: 1.0,
            status: SolveStatus::Initializing,
        }
    }

    /// Takes reheating and penalty settings from `config`.
    pub fn with_annealing_config(mut self, config: &AnnealingConfig) -> Self {
        self.max_reheats = config.max_reheats;
        self.reheat_factor = config.reheat_factor;
        self.violation_weight = config.violation_weight;
        self
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn mode(&self) -> &BonusModeController {
        &self.mode
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    fn working_cost(&self, problem: &Problem, scope: &SolverScope) -> f64 {
        self.mode.cost(
            problem,
            scope.working_pose(),
            scope.current_evaluation(),
            self.violation_weight,
        )
    }

    /// Runs until `termination` fires, the schedule is exhausted, or the
    /// operating mode converges.
    pub fn solve<T: Termination + ?Sized>(
        &mut self,
        scope: &mut SolverScope,
        termination: &T,
    ) -> SolveStatus {
        self.status = SolveStatus::Initializing;
        let problem: Arc<Problem> = Arc::clone(scope.problem());
        self.acceptor.phase_started();

        info!(
            event = "phase_start",
            phase = "Annealing",
            mode = ?self.mode.mode(),
            temperature = self.acceptor.temperature(),
            score = %scope.current_evaluation().score,
        );

        let mut current_cost = self.working_cost(&problem, scope);
        let mut reheats = 0u32;
        let mut last_progress = Instant::now();

        // The starting pose may already be the answer.
        let initial = scope.current_evaluation().score;
        if initial.is_feasible() {
            let rank = self.mode.rank(&problem, scope.working_pose());
            scope.consider_best(initial, rank);
            match self
                .mode
                .observe_feasible(&problem, scope.working_pose(), initial)
            {
                ModeSignal::Converged => {
                    self.status = SolveStatus::Converged;
                }
                ModeSignal::PhaseChanged => {
                    current_cost = self.working_cost(&problem, scope);
                }
                ModeSignal::Continue => {}
            }
        }

        if self.status != SolveStatus::Converged {
            self.status = SolveStatus::Searching;
        }

        while self.status == SolveStatus::Searching {
            if termination.is_terminated(scope) {
                self.status = SolveStatus::TimedOut;
                break;
            }

            if self.acceptor.is_frozen() {
                if self.mode.stop_collecting() == ModeSignal::PhaseChanged {
                    debug!(
                        event = "hunt_phase",
                        phase = ?self.mode.phase(),
                        steps = scope.iteration(),
                        frozen = true,
                    );
                    // Optimizing gets a full schedule of its own.
                    self.acceptor.reheat(1.0);
                    current_cost = self.working_cost(&problem, scope);
                } else if reheats >= self.max_reheats {
                    self.status = SolveStatus::Exhausted;
                    break;
                } else {
                    reheats += 1;
                    self.acceptor.reheat(self.reheat_factor);
                    scope.stats_mut().record_reheat();
                    debug!(
                        event = "reheat",
                        reheat = reheats,
                        temperature = self.acceptor.temperature(),
                        steps = scope.iteration(),
                    );
                }
            }

            let step = scope.increment_iteration();

            if last_progress.elapsed().as_secs() >= 1 {
                debug!(
                    event = "progress",
                    steps = step,
                    speed = scope.stats().moves_per_second() as u64,
                    temperature = self.acceptor.temperature(),
                    score = %scope.best_score().unwrap_or(scope.current_evaluation().score),
                );
                last_progress = Instant::now();
            }

            let ratio = self.acceptor.temperature_ratio();
            let Some(mv) = scope.propose(&mut self.generator, ratio, self.mode.snap_targets()) else {
                self.acceptor.step_ended();
                continue;
            };

            let undo = scope.apply_move(&mv);
            let candidate = scope.evaluate_working();
            let candidate_cost =
                self.mode
                    .cost(&problem, scope.working_pose(), &candidate, self.violation_weight);
            let roll: f64 = scope.rng().random();
            let accepted = self.acceptor.is_accepted(current_cost, candidate_cost, roll);
            let feasible = candidate.is_feasible();
            scope.stats_mut().record_move(accepted, feasible);

            let mut signal = ModeSignal::Continue;
            if feasible {
                let rank = self.mode.rank(&problem, scope.working_pose());
                if scope.consider_best(candidate.score, rank) {
                    debug!(
                        event = "new_best",
                        steps = step,
                        rank = rank,
                        score = %candidate.score,
                    );
                }
                signal = self
                    .mode
                    .observe_feasible(&problem, scope.working_pose(), candidate.score);
            }

            trace!(
                event = "step",
                step = step,
                score = %candidate.score,
                cost = candidate_cost,
                accepted = accepted,
            );

            if accepted {
                scope.set_current_evaluation(candidate);
                current_cost = candidate_cost;
            } else {
                undo.revert(scope.working_pose_mut());
            }

            match signal {
                ModeSignal::Converged => self.status = SolveStatus::Converged,
                ModeSignal::PhaseChanged => {
                    debug!(event = "hunt_phase", phase = ?self.mode.phase(), steps = step);
                    current_cost = self.working_cost(&problem, scope);
                }
                ModeSignal::Continue => {}
            }

            self.acceptor.step_ended();
        }

        let duration = scope.elapsed().unwrap_or_default();
        info!(
            event = "phase_end",
            phase = "Annealing",
            status = %self.status,
            duration_ms = duration.as_millis() as u64,
            steps = scope.iteration(),
            reheats = reheats,
            speed = scope.stats().moves_per_second() as u64,
            score = %scope.best_score().unwrap_or(scope.current_evaluation().score),
        );
        self.status
    }
}
