//! Attempt statistics.
//!
//! Stack-allocated counters for one solving attempt.

use std::time::{Duration, Instant};

use holefit_core::PoseScore;

/// Attempt-level statistics.
///
/// # Example
///
/// ```
/// use holefit_solver::stats::SolverStats;
///
/// let mut stats = SolverStats::default();
/// stats.start();
/// stats.record_iteration();
/// stats.record_move(true, false);
/// stats.record_move(false, true);
///
/// assert_eq!(stats.iterations, 1);
/// assert_eq!(stats.moves_evaluated, 2);
/// assert_eq!(stats.moves_accepted, 1);
/// assert_eq!(stats.feasible_candidates, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    start_time: Option<Instant>,
    finished: Option<Duration>,
    /// Annealing iterations run.
    pub iterations: u64,
    /// Candidate poses scored.
    pub moves_evaluated: u64,
    /// Candidates that became the working pose.
    pub moves_accepted: u64,
    /// Candidates with no violations.
    pub feasible_candidates: u64,
    /// Times the best pose improved.
    pub improvements: u64,
    pub reheats: u32,
    /// `(iteration, score)` at every best-pose improvement.
    pub best_trace: Vec<(u64, PoseScore)>,
}

impl SolverStats {
    /// Marks the start of solving.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.finished = None;
    }

    /// Freezes the elapsed time.
    pub fn finish(&mut self) {
        self.finished = Some(self.elapsed());
    }

    /// Returns the elapsed time since solving started.
    pub fn elapsed(&self) -> Duration {
        if let Some(done) = self.finished {
            return done;
        }
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Records a candidate evaluation, whether it was accepted and feasible.
    pub fn record_move(&mut self, accepted: bool, feasible: bool) {
        self.moves_evaluated += 1;
        if accepted {
            self.moves_accepted += 1;
        }
        if feasible {
            self.feasible_candidates += 1;
        }
    }

    pub fn record_improvement(&mut self, iteration: u64, score: PoseScore) {
        self.improvements += 1;
        self.best_trace.push((iteration, score));
    }

    pub fn record_reheat(&mut self) {
        self.reheats += 1;
    }

    /// Returns the candidate evaluation rate.
    pub fn moves_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.moves_evaluated as f64 / secs
        } else {
            0.0
        }
    }

    /// Returns the acceptance rate (accepted / evaluated).
    pub fn acceptance_rate(&self) -> f64 {
        if self.moves_evaluated == 0 {
            0.0
        } else {
            self.moves_accepted as f64 / self.moves_evaluated as f64
        }
    }
}
