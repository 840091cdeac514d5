//! Orchestrator - drives a puzzle set to completion.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use holefit_config::SolverConfig;
use holefit_core::{io, HoleFitError, HoleMask, Problem, ProblemId};
use rayon::prelude::*;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, Result};
use crate::graph::{BonusGraph, SharedBonusGraph};
use crate::puzzle::{PuzzleState, SubmissionOutcome, SubmissionRecord};
use crate::schedule::{plan, Schedule};
use crate::state::OrchestratorState;
use crate::submission::{RetryPolicy, SubmissionJob, SubmissionQueue, Submitter};
use crate::worker::{solve_puzzle, PuzzleJob, PuzzleOutcome};

/// Problems keyed by puzzle id, plus the files that failed to load.
#[derive(Debug, Default)]
pub struct PuzzleSet {
    pub problems: BTreeMap<ProblemId, Arc<Problem>>,
    pub failures: Vec<(PathBuf, HoleFitError)>,
}

impl PuzzleSet {
    /// Builds a set from problems already tagged with their ids. Untagged
    /// problems are skipped.
    pub fn from_problems(problems: impl IntoIterator<Item = Problem>) -> Self {
        let problems = problems
            .into_iter()
            .filter_map(|p| p.id().map(|id| (id, Arc::new(p))))
            .collect();
        Self {
            problems,
            failures: Vec::new(),
        }
    }

    pub fn ids(&self) -> Vec<ProblemId> {
        self.problems.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Loads every problem file in `dir` in parallel.
///
/// A malformed file only excludes that puzzle; it is reported in
/// [`PuzzleSet::failures`].
pub fn load_puzzle_set(dir: impl AsRef<Path>) -> Result<PuzzleSet> {
    let files = io::problem_files(dir)?;
    let loaded: Vec<(PathBuf, holefit_core::Result<Problem>)> = files
        .into_par_iter()
        .map(|path| {
            let problem = io::load_problem(&path);
            (path, problem)
        })
        .collect();

    let mut set = PuzzleSet::default();
    for (path, problem) in loaded {
        match problem {
            Ok(problem) => {
                if let Some(id) = problem.id() {
                    set.problems.insert(id, Arc::new(problem));
                }
            }
            Err(e) => {
                warn!(event = "problem_load_failed", path = %path.display(), error = %e);
                set.failures.push((path, e));
            }
        }
    }
    info!(
        event = "puzzles_loaded",
        loaded = set.problems.len(),
        failed = set.failures.len(),
    );
    Ok(set)
}

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u32,
    /// Solving attempts launched.
    pub attempts: u64,
    /// Puzzles that ended a solve with a valid pose.
    pub solved: usize,
    /// Puzzles with no valid pose after all attempts.
    pub failed: usize,
    pub submitted: usize,
    pub rejected: usize,
    /// Puzzles the reconciled state left alone.
    pub skipped: usize,
    pub cycle_breaks: usize,
    /// Cycles given up on and solved without bonuses.
    pub fallbacks: usize,
    pub cancelled: bool,
}

/// Background solver over a whole puzzle set.
///
/// Rounds repeat until no puzzle is pending: each round plans waves from
/// the current bonus graph, runs every wave on the worker pool, absorbs the
/// results, and reopens finished puzzles that a newly unlocked bonus could
/// improve.
pub struct Orchestrator<S: Submitter> {
    config: SolverConfig,
    problems: BTreeMap<ProblemId, Arc<Problem>>,
    masks: BTreeMap<ProblemId, Arc<HoleMask>>,
    graph: SharedBonusGraph,
    state: OrchestratorState,
    submitter: Arc<S>,
    cancel: Arc<AtomicBool>,
    /// Puzzles solved without bonuses after their cycle stopped paying off.
    independent: BTreeSet<ProblemId>,
    cycle_strikes: BTreeMap<Vec<ProblemId>, u32>,
    /// Queued or running submissions per puzzle.
    in_flight: BTreeMap<ProblemId, usize>,
}

impl<S: Submitter> Orchestrator<S> {
    pub fn new(config: SolverConfig, puzzles: PuzzleSet, submitter: S) -> Self {
        let graph = BonusGraph::from_problems(puzzles.problems.values().map(|p| p.as_ref()));
        let masks = puzzles
            .problems
            .par_iter()
            .map(|(&id, p)| (id, Arc::new(HoleMask::new(p.hole()))))
            .collect();
        Self {
            config,
            problems: puzzles.problems,
            masks,
            graph: SharedBonusGraph::new(graph),
            state: OrchestratorState::default(),
            submitter: Arc::new(submitter),
            cancel: Arc::new(AtomicBool::new(false)),
            independent: BTreeSet::new(),
            cycle_strikes: BTreeMap::new(),
            in_flight: BTreeMap::new(),
        }
    }

    /// Resumes from previously persisted state.
    pub fn with_state(mut self, state: OrchestratorState) -> Self {
        self.graph.unlock(&state.unlocked);
        self.state = state;
        self
    }

    /// Loads state from the configured state file, if any.
    pub fn resume(self) -> Result<Self> {
        match self.config.orchestrator.state_file.clone() {
            Some(path) => {
                let state = OrchestratorState::load(path)?;
                Ok(self.with_state(state))
            }
            None => Ok(self),
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn graph(&self) -> Arc<BonusGraph> {
        self.graph.snapshot()
    }

    /// Flag that stops every attempt and the run loop when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn persist(&mut self) -> Result<()> {
        self.state.unlocked = self.graph.snapshot().unlocked();
        match self.config.orchestrator.state_file.clone() {
            Some(path) => self.state.save(path),
            None => Ok(()),
        }
    }

    /// Runs until every puzzle is finished or the run is cancelled.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let ids: Vec<ProblemId> = self.problems.keys().copied().collect();
        let mut summary = RunSummary::default();
        let (queue, mut records) = SubmissionQueue::spawn(
            Arc::clone(&self.submitter),
            RetryPolicy::from_config(&self.config.submission),
            Arc::clone(&self.cancel),
        );

        for id in self.state.awaiting_submission() {
            self.enqueue(&queue, id)?;
        }
        let mut pending: BTreeSet<ProblemId> = self.state.reconcile(&ids)?.into_iter().collect();
        summary.skipped = ids.len() - pending.len();
        self.persist()?;

        while !pending.is_empty() && !self.cancelled() {
            let snapshot = self.graph.snapshot();
            let before = self.state.known_scores();
            let schedule = plan(&snapshot, &pending, &before);
            if schedule.is_empty() {
                break;
            }
            summary.rounds += 1;
            summary.cycle_breaks += schedule.cycle_breaks.len();
            info!(
                event = "round_start",
                round = summary.rounds,
                pending = schedule.len(),
                waves = schedule.waves.len(),
                cycles = schedule.cycles.len(),
            );

            for wave in &schedule.waves {
                if self.cancelled() {
                    break;
                }
                for outcome in self.run_wave(wave).await? {
                    self.absorb(outcome, &queue, &mut summary)?;
                }
                while let Ok(record) = records.try_recv() {
                    self.absorb_submission(record, &mut summary)?;
                }
                self.persist()?;
            }

            self.review_cycles(&schedule, &before, &mut summary);
            self.await_blocked(&mut records, &mut summary).await?;
            pending = self.reopen(&ids)?;
        }

        queue.close().await?;
        while let Some(record) = records.recv().await {
            self.absorb_submission(record, &mut summary)?;
        }
        summary.cancelled = self.cancelled();
        self.persist()?;
        info!(
            event = "run_end",
            rounds = summary.rounds,
            attempts = summary.attempts,
            solved = summary.solved,
            failed = summary.failed,
            submitted = summary.submitted,
            rejected = summary.rejected,
            skipped = summary.skipped,
        );
        Ok(summary)
    }

    async fn run_wave(&mut self, wave: &[ProblemId]) -> Result<Vec<PuzzleOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.orchestrator.worker_count.max(1)));
        let snapshot = self.graph.snapshot();
        let mut handles = Vec::with_capacity(wave.len());

        for &id in wave {
            let (Some(problem), Some(mask)) = (self.problems.get(&id), self.masks.get(&id)) else {
                continue;
            };
            let record = self.state.record_mut(id);
            record.transition(PuzzleState::Solving)?;
            record.considered = snapshot.unlocked_for(id);

            let usable = if self.independent.contains(&id) {
                Vec::new()
            } else {
                record.considered.clone()
            };
            let consumers = snapshot
                .grants_from(id)
                .filter(|g| g.target != id && !snapshot.is_unlocked(g))
                .map(|g| g.target)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let job = PuzzleJob {
                id,
                problem: Arc::clone(problem),
                mask: Arc::clone(mask),
                config: self.config.clone(),
                usable,
                consumers,
                cancel: Arc::clone(&self.cancel),
            };

            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| OrchestratorError::Worker(e.to_string()))?;
                if job.cancel.load(Ordering::Relaxed) {
                    return Err(OrchestratorError::Cancelled);
                }
                tokio::task::spawn_blocking(move || solve_puzzle(job))
                    .await
                    .map_err(|e| OrchestratorError::Worker(e.to_string()))
            });
            handles.push((id, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(OrchestratorError::Cancelled)) => {
                    // Never started; solved again on the next run.
                    self.state.record_mut(id).state = PuzzleState::Pending;
                    continue;
                }
                Ok(Err(e)) => failed_outcome(id, e.to_string()),
                Err(e) => failed_outcome(id, e.to_string()),
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn enqueue(&mut self, queue: &SubmissionQueue, id: ProblemId) -> Result<()> {
        let Some(pose) = self.state.record(id).and_then(|r| r.best_pose.clone()) else {
            return Ok(());
        };
        queue.enqueue(SubmissionJob { puzzle: id, pose })?;
        *self.in_flight.entry(id).or_default() += 1;
        Ok(())
    }

    fn absorb(
        &mut self,
        outcome: PuzzleOutcome,
        queue: &SubmissionQueue,
        summary: &mut RunSummary,
    ) -> Result<()> {
        summary.attempts += u64::from(outcome.attempts);
        let id = outcome.id;
        debug!(
            event = "puzzle_attempts",
            puzzle = %id,
            attempts = outcome.attempts,
            statuses = ?outcome.statuses,
        );
        let interrupted = outcome.attempts == 0 && self.cancelled();
        let record = self.state.record_mut(id);
        if interrupted {
            record.state = PuzzleState::Pending;
            return Ok(());
        }
        record.solve_rounds += 1;

        let improved = match outcome.best {
            Some(best) => {
                let improved = record.offer_pose(best.pose, best.dislikes);
                if improved {
                    record.grants = best.grants;
                }
                improved
            }
            // A reopened puzzle keeps the pose it already had.
            None if record.best_pose.is_some() => {
                debug!(event = "puzzle_kept_best", puzzle = %id, error = ?outcome.error);
                false
            }
            None => {
                let reason = outcome
                    .error
                    .unwrap_or_else(|| "no valid pose found".to_string());
                record.fail(reason)?;
                summary.failed += 1;
                return Ok(());
            }
        };
        record.transition(PuzzleState::Solved)?;
        summary.solved += 1;

        if improved {
            let grants = record.grants.clone();
            for grant in &self.graph.unlock(&grants) {
                info!(
                    event = "bonus_unlocked",
                    donor = %grant.donor,
                    target = %grant.target,
                    kind = grant.kind.as_str(),
                );
            }
            self.enqueue(queue, id)?;
        } else {
            let already_accepted = record.last_submission.as_ref().is_some_and(|s| {
                s.is_accepted() && record.best_pose.as_ref() == Some(&s.pose)
            });
            if already_accepted {
                record.transition(PuzzleState::Submitted)?;
            } else {
                self.enqueue(queue, id)?;
            }
        }
        Ok(())
    }

    fn absorb_submission(&mut self, report: SubmissionRecord, summary: &mut RunSummary) -> Result<()> {
        if let Some(count) = self.in_flight.get_mut(&report.puzzle) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&report.puzzle);
            }
        }
        let record = self.state.record_mut(report.puzzle);
        let current = record.state == PuzzleState::Solved
            && record.best_pose.as_ref() == Some(&report.pose);
        match &report.outcome {
            SubmissionOutcome::Accepted { .. } if current => {
                record.transition(PuzzleState::Submitted)?;
                summary.submitted += 1;
            }
            SubmissionOutcome::Rejected { reason } if current => {
                record.fail(reason.clone())?;
                summary.rejected += 1;
            }
            _ => {}
        }
        record.last_submission = Some(report);
        Ok(())
    }

    /// Counts rounds in which a broken cycle improved nothing; past the
    /// retry limit its members are solved without bonuses.
    fn review_cycles(
        &mut self,
        schedule: &Schedule,
        before: &BTreeMap<ProblemId, u64>,
        summary: &mut RunSummary,
    ) {
        if schedule.cycle_breaks.is_empty() {
            return;
        }
        let after = self.state.known_scores();
        for cycle in &schedule.cycles {
            let improved = cycle.iter().any(|id| match (before.get(id), after.get(id)) {
                (Some(old), Some(new)) => new < old,
                (None, Some(_)) => true,
                _ => false,
            });
            let strikes = self.cycle_strikes.entry(cycle.clone()).or_default();
            if improved {
                *strikes = 0;
                continue;
            }
            *strikes += 1;
            if *strikes >= self.config.orchestrator.cycle_retry_limit {
                warn!(event = "bonus_cycle_fallback", cycle = ?cycle, rounds = *strikes);
                self.independent.extend(cycle.iter().copied());
                summary.fallbacks += 1;
            }
        }
    }

    /// Waits for the submissions of SOLVED puzzles that a fresh grant could
    /// improve, so they can be reopened this round. Submissions of other
    /// puzzles keep running in the background.
    async fn await_blocked(
        &mut self,
        records: &mut mpsc::UnboundedReceiver<SubmissionRecord>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        while self.has_blocked_opportunity() {
            let Some(record) = records.recv().await else {
                break;
            };
            self.absorb_submission(record, summary)?;
        }
        Ok(())
    }

    fn has_blocked_opportunity(&self) -> bool {
        let unlocked = self.graph.snapshot().unlocked();
        self.state.puzzles.values().any(|r| {
            r.state == PuzzleState::Solved
                && self.in_flight.contains_key(&r.id)
                && r.can_improve_with(&unlocked)
        })
    }

    /// Finished puzzles that a grant unlocked since their last solve could
    /// improve.
    fn reopen(&mut self, ids: &[ProblemId]) -> Result<BTreeSet<ProblemId>> {
        let unlocked = self.graph.snapshot().unlocked();
        let mut reopened = BTreeSet::new();
        for &id in ids {
            if self.independent.contains(&id) {
                continue;
            }
            let record = self.state.record_mut(id);
            if matches!(record.state, PuzzleState::Submitted | PuzzleState::Failed)
                && record.can_improve_with(&unlocked)
            {
                record.transition(PuzzleState::Pending)?;
                reopened.insert(id);
            }
        }
        Ok(reopened)
    }
}

fn failed_outcome(id: ProblemId, error: String) -> PuzzleOutcome {
    PuzzleOutcome {
        id,
        best: None,
        attempts: 0,
        statuses: Vec::new(),
        error: Some(error),
    }
}

#[cfg(test)]
mod tests;
