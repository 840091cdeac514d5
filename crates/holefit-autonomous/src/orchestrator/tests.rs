use std::fs;
use std::time::Duration;

use chrono::Utc;

use holefit_core::{BonusKind, BonusSpec, Figure, Point, Pose};

use super::*;
use crate::graph::BonusGrant;
use crate::submission::SubmissionReceipt;

#[derive(Debug, Default)]
struct AcceptAll;

impl Submitter for AcceptAll {
    async fn submit(&self, _puzzle: ProblemId, _pose: &Pose) -> Result<SubmissionReceipt> {
        Ok(SubmissionReceipt::default())
    }
}

fn pt(x: i64, y: i64) -> Point {
    Point::new(x, y)
}

/// Fitting triangle granting a GLOBALIST to `target`.
fn donor(id: u32, target: u32) -> Problem {
    let corners = vec![pt(0, 0), pt(10, 0), pt(0, 10)];
    let figure = Figure::new(corners.clone(), &[(0, 1), (1, 2), (2, 0)]).unwrap();
    Problem::new(
        corners,
        figure,
        0,
        vec![BonusSpec::new(BonusKind::Globalist, vec![pt(10, 0)]).with_target(ProblemId(target))],
    )
    .unwrap()
    .with_id(ProblemId(id))
}

const FITTING_JSON: &str = r#"{"hole": [[0,0],[10,0],[0,10]], "epsilon": 0,
    "figure": {"vertices": [[0,0],[10,0],[0,10]], "edges": [[0,1],[1,2],[2,0]]}}"#;

#[test]
fn test_from_problems_skips_untagged() {
    let untagged = Problem::new(
        vec![pt(0, 0), pt(4, 0), pt(0, 4)],
        Figure::new(vec![pt(0, 0), pt(1, 0)], &[(0, 1)]).unwrap(),
        0,
        Vec::new(),
    )
    .unwrap();
    let set = PuzzleSet::from_problems([donor(1, 2), untagged]);
    assert_eq!(set.ids(), vec![ProblemId(1)]);
}

#[test]
fn test_load_puzzle_set_excludes_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("1.json"), FITTING_JSON).unwrap();
    fs::write(dir.path().join("2.json"), r#"{"hole": [[0,0]]}"#).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let set = load_puzzle_set(dir.path()).unwrap();
    assert_eq!(set.ids(), vec![ProblemId(1)]);
    assert_eq!(set.failures.len(), 1);
    assert!(set.failures[0].0.ends_with("2.json"));
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_puzzle_set(dir.path().join("absent")).is_err());
}

#[test]
fn test_resumed_state_unlocks_graph() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut state = OrchestratorState::default();
    state.unlocked = vec![BonusGrant {
        donor: ProblemId(1),
        target: ProblemId(2),
        kind: BonusKind::Globalist,
    }];

    let orchestrator = Orchestrator::new(SolverConfig::default(), set, AcceptAll).with_state(state);
    assert_eq!(orchestrator.graph().unlocked_for(ProblemId(2)).len(), 1);
}

#[test]
fn test_stalled_cycle_falls_back_to_independent() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut config = SolverConfig::default();
    config.orchestrator.cycle_retry_limit = 2;
    let mut orchestrator = Orchestrator::new(config, set, AcceptAll);

    let schedule = Schedule {
        waves: vec![vec![ProblemId(1)], vec![ProblemId(2)]],
        cycles: vec![vec![ProblemId(1), ProblemId(2)]],
        cycle_breaks: vec![ProblemId(1)],
    };
    let mut summary = RunSummary::default();

    orchestrator.review_cycles(&schedule, &BTreeMap::new(), &mut summary);
    assert!(orchestrator.independent.is_empty());
    orchestrator.review_cycles(&schedule, &BTreeMap::new(), &mut summary);
    assert_eq!(
        orchestrator.independent,
        BTreeSet::from([ProblemId(1), ProblemId(2)])
    );
    assert_eq!(summary.fallbacks, 1);
}

#[test]
fn test_reopen_only_for_fresh_grants() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut orchestrator = Orchestrator::new(SolverConfig::default(), set, AcceptAll);
    for id in [1, 2] {
        let record = orchestrator.state.record_mut(ProblemId(id));
        record.state = PuzzleState::Submitted;
    }
    orchestrator.graph.unlock(&[BonusGrant {
        donor: ProblemId(1),
        target: ProblemId(2),
        kind: BonusKind::Globalist,
    }]);

    let reopened = orchestrator.reopen(&[ProblemId(1), ProblemId(2)]).unwrap();
    assert_eq!(reopened, BTreeSet::from([ProblemId(2)]));
    assert_eq!(
        orchestrator.state.record(ProblemId(2)).map(|r| r.state),
        Some(PuzzleState::Pending)
    );
}

#[tokio::test]
async fn test_run_solves_and_submits_everything() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut config = SolverConfig::new()
        .with_iteration_limit(200)
        .with_random_seed(3);
    config.orchestrator.attempts_per_puzzle = 1;
    config.orchestrator.worker_count = 2;

    let mut orchestrator = Orchestrator::new(config, set, AcceptAll);
    let summary = orchestrator.run().await.unwrap();

    assert!(!summary.cancelled);
    assert_eq!(summary.failed, 0);
    for id in [1, 2] {
        let record = orchestrator.state().record(ProblemId(id)).unwrap();
        assert_eq!(record.state, PuzzleState::Submitted);
        assert_eq!(record.best_dislikes, Some(0));
    }
    assert_eq!(orchestrator.graph().unlocked().len(), 2);
}

fn grant(donor: u32, target: u32) -> BonusGrant {
    BonusGrant {
        donor: ProblemId(donor),
        target: ProblemId(target),
        kind: BonusKind::Globalist,
    }
}

fn accepted(puzzle: ProblemId, pose: Pose) -> SubmissionRecord {
    SubmissionRecord {
        puzzle,
        pose,
        attempts: 1,
        outcome: SubmissionOutcome::Accepted { dislikes: None },
        at: Utc::now(),
    }
}

/// Puzzle 2 submitted with 7 dislikes, then reopened and solving again.
fn reopened_orchestrator(submitted: bool) -> (Orchestrator<AcceptAll>, Pose) {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut orchestrator = Orchestrator::new(SolverConfig::default(), set, AcceptAll);
    let pose = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 10)]);
    let record = orchestrator.state.record_mut(ProblemId(2));
    record.offer_pose(pose.clone(), 7);
    if submitted {
        record.last_submission = Some(accepted(ProblemId(2), pose.clone()));
    }
    record.state = PuzzleState::Submitted;
    record.transition(PuzzleState::Pending).unwrap();
    record.transition(PuzzleState::Solving).unwrap();
    (orchestrator, pose)
}

fn fruitless(id: u32) -> PuzzleOutcome {
    PuzzleOutcome {
        id: ProblemId(id),
        best: None,
        attempts: 3,
        statuses: Vec::new(),
        error: None,
    }
}

#[tokio::test]
async fn test_fruitless_resolve_keeps_accepted_pose() {
    let (mut orchestrator, pose) = reopened_orchestrator(true);
    let (queue, _records) = SubmissionQueue::spawn(
        Arc::new(AcceptAll),
        RetryPolicy::from_config(&orchestrator.config.submission),
        orchestrator.cancel_flag(),
    );
    let mut summary = RunSummary::default();

    orchestrator.absorb(fruitless(2), &queue, &mut summary).unwrap();

    let record = orchestrator.state().record(ProblemId(2)).unwrap();
    assert_eq!(record.state, PuzzleState::Submitted);
    assert_eq!(record.best_dislikes, Some(7));
    assert_eq!(record.best_pose.as_ref(), Some(&pose));
    assert_eq!(summary.failed, 0);
    assert!(orchestrator.in_flight.is_empty());
}

#[tokio::test]
async fn test_fruitless_resolve_resubmits_unconfirmed_pose() {
    let (mut orchestrator, _) = reopened_orchestrator(false);
    let (queue, _records) = SubmissionQueue::spawn(
        Arc::new(AcceptAll),
        RetryPolicy::from_config(&orchestrator.config.submission),
        orchestrator.cancel_flag(),
    );
    let mut summary = RunSummary::default();

    orchestrator.absorb(fruitless(2), &queue, &mut summary).unwrap();

    let record = orchestrator.state().record(ProblemId(2)).unwrap();
    assert_eq!(record.state, PuzzleState::Solved);
    assert_eq!(summary.failed, 0);
    assert_eq!(orchestrator.in_flight.get(&ProblemId(2)), Some(&1));
}

#[tokio::test]
async fn test_fruitless_first_solve_fails() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut orchestrator = Orchestrator::new(SolverConfig::default(), set, AcceptAll);
    orchestrator
        .state
        .record_mut(ProblemId(1))
        .transition(PuzzleState::Solving)
        .unwrap();
    let (queue, _records) = SubmissionQueue::spawn(
        Arc::new(AcceptAll),
        RetryPolicy::from_config(&orchestrator.config.submission),
        orchestrator.cancel_flag(),
    );
    let mut summary = RunSummary::default();

    orchestrator.absorb(fruitless(1), &queue, &mut summary).unwrap();

    let record = orchestrator.state().record(ProblemId(1)).unwrap();
    assert_eq!(record.state, PuzzleState::Failed);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_reopening_waits_only_for_blocked_submissions() {
    let set = PuzzleSet::from_problems([donor(1, 2), donor(2, 1)]);
    let mut orchestrator = Orchestrator::new(SolverConfig::default(), set, AcceptAll);
    let pose = Pose::new(vec![pt(0, 0), pt(10, 0), pt(0, 10)]);
    let record = orchestrator.state.record_mut(ProblemId(2));
    record.offer_pose(pose.clone(), 7);
    record.state = PuzzleState::Solved;
    orchestrator.graph.unlock(&[grant(1, 2)]);
    // Puzzle 3's submission never finishes.
    orchestrator.in_flight = BTreeMap::from([(ProblemId(2), 1), (ProblemId(3), 1)]);

    let (reports, mut records) = mpsc::unbounded_channel();
    reports.send(accepted(ProblemId(2), pose)).unwrap();
    let mut summary = RunSummary::default();

    tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.await_blocked(&mut records, &mut summary),
    )
    .await
    .expect("waited on an unrelated submission")
    .unwrap();

    assert_eq!(summary.submitted, 1);
    assert_eq!(orchestrator.in_flight, BTreeMap::from([(ProblemId(3), 1)]));
    let reopened = orchestrator.reopen(&[ProblemId(1), ProblemId(2)]).unwrap();
    assert_eq!(reopened, BTreeSet::from([ProblemId(2)]));
}
