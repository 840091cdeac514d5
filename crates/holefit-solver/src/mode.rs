//! Bonus-aware operating modes.
//!
//! The controller turns an [`OperatingModeConfig`] into the three knobs the
//! annealing phase needs: the scalar cost of a pose, the ranking of feasible
//! poses for best-pose tracking, and the mode-specific stop signal.

use holefit_config::OperatingModeConfig;
use holefit_core::{Evaluation, Pose, PoseScore, Problem};

/// BonusHunter progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntPhase {
    /// Steering toward poses that grant every obtainable bonus.
    Collect,
    /// Minimizing dislikes.
    Optimize,
}

/// What the phase should do after a feasible candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSignal {
    Continue,
    /// The mode's goal is met; stop immediately.
    Converged,
    /// The objective changed; the working cost must be recomputed.
    PhaseChanged,
}

/// Objective and stop policy for one attempt.
///
/// # Example
///
/// ```
/// use holefit_config::OperatingModeConfig;
/// use holefit_core::{Figure, Point, Pose, PoseScore, Problem};
/// use holefit_solver::{BonusModeController, ModeSignal};
///
/// let corners = vec![Point::new(0, 0), Point::new(4, 0), Point::new(0, 4)];
/// let figure = Figure::new(corners.clone(), &[(0, 1), (1, 2), (2, 0)]).unwrap();
/// let problem = Problem::new(corners, figure, 0, Vec::new()).unwrap();
///
/// let mut mode = BonusModeController::new(OperatingModeConfig::ZeroHunter, &problem);
/// let pose = Pose::identity(&problem);
/// assert_eq!(
///     mode.observe_feasible(&problem, &pose, PoseScore::ZERO),
///     ModeSignal::Converged
/// );
/// ```
#[derive(Debug, Clone)]
pub struct BonusModeController {
    mode: OperatingModeConfig,
    /// Indices into `problem.bonuses()` the mode steers toward.
    targets: Vec<usize>,
    phase: HuntPhase,
}

impl BonusModeController {
    pub fn new(mode: OperatingModeConfig, problem: &Problem) -> Self {
        let targets: Vec<usize> = match mode {
            OperatingModeConfig::BonusCollector { target } => problem
                .bonuses()
                .iter()
                .enumerate()
                .filter(|(_, b)| b.target == Some(target))
                .map(|(i, _)| i)
                .collect(),
            OperatingModeConfig::BonusHunter => (0..problem.bonuses().len()).collect(),
            OperatingModeConfig::ScoreMaximizer | OperatingModeConfig::ZeroHunter => Vec::new(),
        };
        let phase = if matches!(mode, OperatingModeConfig::BonusHunter) && !targets.is_empty() {
            HuntPhase::Collect
        } else {
            HuntPhase::Optimize
        };
        Self {
            mode,
            targets,
            phase,
        }
    }

    pub fn mode(&self) -> OperatingModeConfig {
        self.mode
    }

    pub fn phase(&self) -> HuntPhase {
        self.phase
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Bonuses the move generator may snap onto right now.
    pub fn snap_targets(&self) -> &[usize] {
        match (self.mode, self.phase) {
            (OperatingModeConfig::BonusHunter, HuntPhase::Optimize) => &[],
            _ => &self.targets,
        }
    }

    fn anchor_bias(&self, problem: &Problem, pose: &Pose) -> f64 {
        self.targets
            .iter()
            .filter_map(|&i| problem.bonuses().get(i))
            .map(|spec| spec.anchor_distance(&pose.vertices) as f64)
            .sum()
    }

    /// Scalar cost the acceptor compares; lower is better.
    ///
    /// Always includes `violation_weight * violation` so infeasible poses stay
    /// reachable. Bonus modes add the squared distance still separating the
    /// pose from the target anchors; the BonusHunter collect phase drops
    /// dislikes entirely.
    pub fn cost(
        &self,
        problem: &Problem,
        pose: &Pose,
        evaluation: &Evaluation,
        violation_weight: f64,
    ) -> f64 {
        let penalty = evaluation.score.violation() as f64 * violation_weight;
        let dislikes = evaluation.score.dislikes() as f64;
        match (self.mode, self.phase) {
            (OperatingModeConfig::BonusHunter, HuntPhase::Collect) => {
                penalty + self.anchor_bias(problem, pose)
            }
            (OperatingModeConfig::BonusHunter, HuntPhase::Optimize) => dislikes + penalty,
            (OperatingModeConfig::BonusCollector { .. }, _) => {
                dislikes + penalty + self.anchor_bias(problem, pose)
            }
            _ => dislikes + penalty,
        }
    }

    /// Number of target bonuses `pose` does not grant.
    pub fn rank(&self, problem: &Problem, pose: &Pose) -> u32 {
        self.targets
            .iter()
            .filter_map(|&i| problem.bonuses().get(i))
            .filter(|spec| !spec.is_granted_by(&pose.vertices))
            .count() as u32
    }

    /// Reacts to a feasible candidate.
    pub fn observe_feasible(&mut self, problem: &Problem, pose: &Pose, score: PoseScore) -> ModeSignal {
        match self.mode {
            OperatingModeConfig::ZeroHunter if score.is_feasible() && score.dislikes() == 0 => {
                ModeSignal::Converged
            }
            OperatingModeConfig::BonusHunter
                if self.phase == HuntPhase::Collect && self.rank(problem, pose) == 0 =>
            {
                self.phase = HuntPhase::Optimize;
                ModeSignal::PhaseChanged
            }
            _ => ModeSignal::Continue,
        }
    }

    /// Ends a BonusHunter collect phase that stopped making progress.
    ///
    /// Called when the schedule freezes: the anchors still missing are
    /// treated as unobtainable together, and the best pose keeps whatever
    /// grants it already holds.
    pub fn stop_collecting(&mut self) -> ModeSignal {
        if self.phase == HuntPhase::Collect {
            self.phase = HuntPhase::Optimize;
            ModeSignal::PhaseChanged
        } else {
            ModeSignal::Continue
        }
    }

    /// Whether `pose` meets the mode's bonus goal.
    ///
    /// BonusCollector needs at least one bonus for its target granted
    /// exactly; BonusHunter needs every bonus the problem declares. Other
    /// modes have no bonus goal.
    pub fn bonus_acquired(&self, problem: &Problem, pose: &Pose) -> bool {
        let granted = |i: &usize| {
            problem
                .bonuses()
                .get(*i)
                .is_some_and(|spec| spec.is_granted_by(&pose.vertices))
        };
        match self.mode {
            OperatingModeConfig::BonusCollector { .. } => self.targets.iter().any(granted),
            OperatingModeConfig::BonusHunter => {
                !self.targets.is_empty() && self.targets.iter().all(granted)
            }
            OperatingModeConfig::ScoreMaximizer | OperatingModeConfig::ZeroHunter => false,
        }
    }
}

#[cfg(test)]
mod tests;
