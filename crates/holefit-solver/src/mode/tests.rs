//! Tests for operating modes.

use holefit_config::OperatingModeConfig;
use holefit_core::{evaluate, BonusKind, BonusSpec, Pose, PoseScore, ProblemId};

use super::*;
use crate::test_utils::{pt, triangle_problem};

fn collector_problem() -> Problem {
    triangle_problem(vec![
        BonusSpec::new(BonusKind::Globalist, vec![pt(10, 0)]).with_target(ProblemId(2)),
        BonusSpec::new(BonusKind::Wallhack, vec![pt(0, 10)]).with_target(ProblemId(3)),
    ])
}

fn collector(target: u32, problem: &Problem) -> BonusModeController {
    BonusModeController::new(
        OperatingModeConfig::BonusCollector {
            target: ProblemId(target),
        },
        problem,
    )
}

#[test]
fn test_collector_targets_only_its_puzzle() {
    let problem = collector_problem();
    let mode = collector(3, &problem);
    assert_eq!(mode.targets(), &[1]);
    assert_eq!(mode.snap_targets(), &[1]);
}

#[test]
fn test_score_maximizer_cost_is_dislikes_plus_penalty() {
    let problem = collector_problem();
    let mode = BonusModeController::new(OperatingModeConfig::ScoreMaximizer, &problem);
    let pose = Pose::identity(&problem);
    let evaluation = Evaluation {
        score: PoseScore::of(3, 7),
        violations: Vec::new(),
    };
    assert_eq!(mode.cost(&problem, &pose, &evaluation, 2.0), 13.0);
    assert!(mode.targets().is_empty());
}

#[test]
fn test_collector_cost_biases_toward_anchor() {
    let problem = collector_problem();
    let mode = collector(3, &problem);
    let near = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 9)]);
    let far = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 5)]);
    let zero = Evaluation {
        score: PoseScore::ZERO,
        violations: Vec::new(),
    };
    assert_eq!(mode.cost(&problem, &near, &zero, 1.0), 1.0);
    assert_eq!(mode.cost(&problem, &far, &zero, 1.0), 25.0);
}

#[test]
fn test_collector_success_requires_exact_anchor() {
    let problem = collector_problem();
    let mode = collector(3, &problem);
    let exact = Pose::identity(&problem);
    let off_by_one = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 9)]);

    assert!(mode.bonus_acquired(&problem, &exact));
    assert!(!mode.bonus_acquired(&problem, &off_by_one));
    assert_eq!(mode.rank(&problem, &exact), 0);
    assert_eq!(mode.rank(&problem, &off_by_one), 1);
}

#[test]
fn test_collector_without_matching_bonus_never_succeeds() {
    let problem = collector_problem();
    let mode = collector(99, &problem);
    assert!(!mode.bonus_acquired(&problem, &Pose::identity(&problem)));
}

#[test]
fn test_zero_hunter_converges_only_on_zero() {
    let problem = collector_problem();
    let mut mode = BonusModeController::new(OperatingModeConfig::ZeroHunter, &problem);
    let pose = Pose::identity(&problem);

    assert_eq!(
        mode.observe_feasible(&problem, &pose, PoseScore::of_dislikes(1)),
        ModeSignal::Continue
    );
    assert_eq!(
        mode.observe_feasible(&problem, &pose, PoseScore::ZERO),
        ModeSignal::Converged
    );
}

#[test]
fn test_hunter_switches_phase_once_all_bonuses_granted() {
    let problem = collector_problem();
    let mut mode = BonusModeController::new(OperatingModeConfig::BonusHunter, &problem);
    assert_eq!(mode.phase(), HuntPhase::Collect);
    assert_eq!(mode.snap_targets(), &[0, 1]);

    let partial = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 9)]);
    assert_eq!(
        mode.observe_feasible(&problem, &partial, PoseScore::of_dislikes(1)),
        ModeSignal::Continue
    );

    // Collect phase ignores dislikes.
    let evaluation = evaluate(&problem, &partial);
    assert_eq!(mode.cost(&problem, &partial, &evaluation, 0.0), 1.0);

    let full = Pose::identity(&problem);
    assert_eq!(
        mode.observe_feasible(&problem, &full, PoseScore::ZERO),
        ModeSignal::PhaseChanged
    );
    assert_eq!(mode.phase(), HuntPhase::Optimize);
    assert!(mode.snap_targets().is_empty());
    assert!(mode.bonus_acquired(&problem, &full));
}

#[test]
fn test_hunter_without_bonuses_starts_optimizing() {
    let problem = triangle_problem(Vec::new());
    let mode = BonusModeController::new(OperatingModeConfig::BonusHunter, &problem);
    assert_eq!(mode.phase(), HuntPhase::Optimize);
    assert!(!mode.bonus_acquired(&problem, &Pose::identity(&problem)));
}

#[test]
fn test_stop_collecting_moves_hunter_to_optimize_once() {
    let problem = collector_problem();
    let mut mode = BonusModeController::new(OperatingModeConfig::BonusHunter, &problem);
    assert_eq!(mode.stop_collecting(), ModeSignal::PhaseChanged);
    assert_eq!(mode.phase(), HuntPhase::Optimize);
    assert!(mode.snap_targets().is_empty());
    assert_eq!(mode.stop_collecting(), ModeSignal::Continue);

    let mut maximizer = BonusModeController::new(OperatingModeConfig::ScoreMaximizer, &problem);
    assert_eq!(maximizer.stop_collecting(), ModeSignal::Continue);
}
