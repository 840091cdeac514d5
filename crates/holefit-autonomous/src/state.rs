//! Restart-safe persisted state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use holefit_core::ProblemId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::graph::BonusGrant;
use crate::puzzle::{PuzzleRecord, PuzzleState};

const STATE_VERSION: u32 = 1;

/// Everything needed to resume a run: per-puzzle records and the set of
/// unlocked bonus grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub puzzles: BTreeMap<ProblemId, PuzzleRecord>,
    #[serde(default)]
    pub unlocked: Vec<BonusGrant>,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            saved_at: None,
            puzzles: BTreeMap::new(),
            unlocked: Vec::new(),
        }
    }
}

impl OrchestratorState {
    /// Loads state from `path`; a missing file is an empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(event = "state_missing", path = %path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(OrchestratorError::state(path, e)),
        };
        let state: Self =
            serde_json::from_str(&text).map_err(|e| OrchestratorError::state(path, e))?;
        if state.version != STATE_VERSION {
            return Err(OrchestratorError::state(
                path,
                format!("unsupported state version {}", state.version),
            ));
        }
        Ok(state)
    }

    /// Writes state atomically: a sibling temporary file renamed over `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.saved_at = Some(Utc::now());
        let json =
            serde_json::to_string_pretty(self).map_err(|e| OrchestratorError::state(path, e))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| OrchestratorError::state(path, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| OrchestratorError::state(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| OrchestratorError::state(path, e))?;
        Ok(())
    }

    pub fn record(&self, id: ProblemId) -> Option<&PuzzleRecord> {
        self.puzzles.get(&id)
    }

    pub fn record_mut(&mut self, id: ProblemId) -> &mut PuzzleRecord {
        self.puzzles
            .entry(id)
            .or_insert_with(|| PuzzleRecord::new(id))
    }

    /// Known best dislikes per puzzle.
    pub fn known_scores(&self) -> BTreeMap<ProblemId, u64> {
        self.puzzles
            .iter()
            .filter_map(|(&id, r)| r.best_dislikes.map(|d| (id, d)))
            .collect()
    }

    /// Brings records in line with the puzzle set after a restart and
    /// returns the puzzles that need solving.
    ///
    /// New puzzles start `PENDING`. A puzzle interrupted mid-solve goes back
    /// to `PENDING`. `SUBMITTED` and `FAILED` puzzles are reopened only when
    /// an unlocked grant targets them that they were not solved with, unless
    /// they already score zero.
    pub fn reconcile(&mut self, ids: &[ProblemId]) -> Result<Vec<ProblemId>> {
        let unlocked = self.unlocked.clone();
        let mut to_solve = Vec::new();
        for &id in ids {
            let record = self.record_mut(id);
            match record.state {
                PuzzleState::Pending => {}
                PuzzleState::Solving => {
                    // No transition edge exists for an interrupted solve.
                    record.state = PuzzleState::Pending;
                }
                PuzzleState::Submitted | PuzzleState::Failed => {
                    if !record.can_improve_with(&unlocked) {
                        continue;
                    }
                    record.transition(PuzzleState::Pending)?;
                }
                PuzzleState::Solved => continue,
            }
            to_solve.push(id);
        }
        info!(
            event = "state_reconciled",
            puzzles = ids.len(),
            to_solve = to_solve.len(),
            unlocked = unlocked.len(),
        );
        Ok(to_solve)
    }

    /// Puzzles solved but not yet submitted, with their best pose.
    pub fn awaiting_submission(&self) -> Vec<ProblemId> {
        self.puzzles
            .values()
            .filter(|r| r.state == PuzzleState::Solved && r.best_pose.is_some())
            .map(|r| r.id)
            .collect()
    }
}

#[cfg(test)]
mod tests;
