//! Per-puzzle lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use holefit_core::{Pose, ProblemId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{OrchestratorError, Result};
use crate::graph::BonusGrant;

/// Lifecycle state of one puzzle.
///
/// ```text
/// PENDING -> SOLVING -> SOLVED -> SUBMITTED
///                  \        \
///                   +-> FAILED <-+
/// ```
///
/// `SUBMITTED` and `FAILED` reopen to `PENDING` when a newly unlocked bonus
/// makes another attempt worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PuzzleState {
    #[default]
    Pending,
    Solving,
    Solved,
    Failed,
    Submitted,
}

impl PuzzleState {
    pub fn can_transition_to(self, next: PuzzleState) -> bool {
        use PuzzleState::*;
        matches!(
            (self, next),
            (Pending, Solving)
                | (Solving, Solved)
                | (Solving, Failed)
                | (Solved, Submitted)
                | (Solved, Failed)
                | (Submitted, Pending)
                | (Failed, Pending)
        )
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PuzzleState::Pending => "PENDING",
            PuzzleState::Solving => "SOLVING",
            PuzzleState::Solved => "SOLVED",
            PuzzleState::Failed => "FAILED",
            PuzzleState::Submitted => "SUBMITTED",
        })
    }
}

/// Last known result of submitting a pose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted { dislikes: Option<u64> },
    Rejected { reason: String },
    PendingRetry { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub puzzle: ProblemId,
    pub pose: Pose,
    pub attempts: u32,
    pub outcome: SubmissionOutcome,
    pub at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::Accepted { .. })
    }
}

/// Everything the orchestrator remembers about one puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub id: ProblemId,
    pub state: PuzzleState,
    /// Dislikes of the best valid pose found so far.
    pub best_dislikes: Option<u64>,
    pub best_pose: Option<Pose>,
    /// Bonus grants the puzzle's poses have unlocked for other puzzles.
    #[serde(default)]
    pub grants: Vec<BonusGrant>,
    /// Unlocked grants available to this puzzle when it was last solved.
    #[serde(default)]
    pub considered: Vec<BonusGrant>,
    #[serde(default)]
    pub solve_rounds: u32,
    pub last_submission: Option<SubmissionRecord>,
    pub failure: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PuzzleRecord {
    pub fn new(id: ProblemId) -> Self {
        Self {
            id,
            state: PuzzleState::Pending,
            best_dislikes: None,
            best_pose: None,
            grants: Vec::new(),
            considered: Vec::new(),
            solve_rounds: 0,
            last_submission: None,
            failure: None,
            updated_at: Utc::now(),
        }
    }

    /// Moves to `next`, rejecting transitions the state machine forbids.
    pub fn transition(&mut self, next: PuzzleState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition {
                puzzle: self.id,
                from: self.state,
                to: next,
            });
        }
        info!(
            event = "puzzle_state",
            puzzle = %self.id,
            from = %self.state,
            to = %next,
        );
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records `pose` as best if it strictly improves on the stored one.
    pub fn offer_pose(&mut self, pose: Pose, dislikes: u64) -> bool {
        if self.best_dislikes.is_some_and(|best| best <= dislikes) {
            return false;
        }
        self.best_dislikes = Some(dislikes);
        self.best_pose = Some(pose);
        self.updated_at = Utc::now();
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(PuzzleState::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Unlocked grants for this puzzle it has not been solved with yet.
    pub fn new_opportunities<'a>(&self, unlocked: &'a [BonusGrant]) -> Vec<&'a BonusGrant> {
        unlocked
            .iter()
            .filter(|g| g.target == self.id && !self.considered.contains(g))
            .collect()
    }

    /// True when a fresh grant targets this puzzle and its best pose is not
    /// already optimal.
    pub fn can_improve_with(&self, unlocked: &[BonusGrant]) -> bool {
        self.best_dislikes != Some(0) && !self.new_opportunities(unlocked).is_empty()
    }
}
