//! End-to-end runs of the orchestrator against in-memory submitters.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use holefit_autonomous::{
    load_puzzle_set, Orchestrator, OrchestratorError, OrchestratorState, PuzzleState, Result,
    SubmissionOutcome, SubmissionReceipt, Submitter,
};
use holefit_config::SolverConfig;
use holefit_core::{Pose, ProblemId};

/// Triangle figure identical to its hole; scores zero as given.
const FITTING: &str = r#"{"hole": [[0,0],[10,0],[0,10]], "epsilon": 0,
    "figure": {"vertices": [[0,0],[10,0],[0,10]], "edges": [[0,1],[1,2],[2,0]]}}"#;

/// Fitting triangle whose pose can grant puzzle 2 a GLOBALIST.
const DONOR: &str = r#"{"hole": [[0,0],[10,0],[0,10]], "epsilon": 0,
    "figure": {"vertices": [[0,0],[10,0],[0,10]], "edges": [[0,1],[1,2],[2,0]]},
    "bonuses": [{"bonus": "GLOBALIST", "problem": 2, "position": [10,0]}]}"#;

/// Rigid right triangle in a square hole: one corner always stays
/// uncovered, so the best score is 100.
const SQUARE: &str = r#"{"hole": [[0,0],[10,0],[10,10],[0,10]], "epsilon": 0,
    "figure": {"vertices": [[0,0],[10,0],[0,10]], "edges": [[0,1],[1,2],[2,0]]}}"#;

/// Records every call; answers from a per-puzzle script, then accepts.
#[derive(Debug, Default)]
struct RecordingSubmitter {
    scripts: Mutex<BTreeMap<ProblemId, VecDeque<Result<SubmissionReceipt>>>>,
    calls: Mutex<Vec<ProblemId>>,
}

impl RecordingSubmitter {
    fn script(self, puzzle: u32, responses: Vec<Result<SubmissionReceipt>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(ProblemId(puzzle), responses.into());
        self
    }
}

impl Submitter for RecordingSubmitter {
    async fn submit(&self, puzzle: ProblemId, _pose: &Pose) -> Result<SubmissionReceipt> {
        self.calls.lock().unwrap().push(puzzle);
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&puzzle)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Ok(SubmissionReceipt::default()))
    }
}

/// Counts calls only.
#[derive(Debug, Default)]
struct CountingSubmitter {
    calls: AtomicUsize,
}

impl Submitter for CountingSubmitter {
    async fn submit(&self, _puzzle: ProblemId, _pose: &Pose) -> Result<SubmissionReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SubmissionReceipt::default())
    }
}

fn write_puzzles(dir: &Path, puzzles: &[(u32, &str)]) {
    for (id, json) in puzzles {
        fs::write(dir.join(format!("{id}.json")), json).unwrap();
    }
}

fn config(state_file: Option<&Path>) -> SolverConfig {
    let mut config = SolverConfig::new()
        .with_iteration_limit(300)
        .with_random_seed(11);
    config.orchestrator.attempts_per_puzzle = 1;
    config.orchestrator.worker_count = 2;
    config.orchestrator.attempt_millis = 5_000;
    config.orchestrator.puzzle_millis = 10_000;
    config.orchestrator.state_file = state_file.map(Path::to_path_buf);
    config.submission.initial_backoff_millis = 1;
    config.submission.max_backoff_millis = 2;
    config
}

fn state_of(orchestrator: &Orchestrator<impl Submitter>, id: u32) -> PuzzleState {
    orchestrator
        .state()
        .record(ProblemId(id))
        .map(|r| r.state)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_every_puzzle_is_submitted_once() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(1, FITTING), (2, FITTING), (3, FITTING)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();

    let mut orchestrator = Orchestrator::new(config(None), puzzles, RecordingSubmitter::default());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.solved, 3);
    assert_eq!(summary.submitted, 3);
    for id in 1..=3 {
        assert_eq!(state_of(&orchestrator, id), PuzzleState::Submitted);
    }
}

#[tokio::test]
async fn test_permanent_rejection_fails_only_that_puzzle() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(1, FITTING), (2, FITTING)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();
    let submitter = RecordingSubmitter::default().script(
        2,
        vec![Err(OrchestratorError::SubmissionPermanent(
            "HTTP 400: pose rejected".to_string(),
        ))],
    );

    let mut orchestrator = Orchestrator::new(config(None), puzzles, submitter);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.rejected, 1);
    assert_eq!(state_of(&orchestrator, 1), PuzzleState::Submitted);
    assert_eq!(state_of(&orchestrator, 2), PuzzleState::Failed);
    let record = orchestrator.state().record(ProblemId(2)).unwrap();
    assert!(record.failure.as_deref().unwrap().contains("pose rejected"));
}

#[tokio::test]
async fn test_transient_failures_retry_until_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(4, FITTING)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();
    let transient = || Err(OrchestratorError::SubmissionTransient("HTTP 503".to_string()));
    let submitter = RecordingSubmitter::default().script(4, vec![transient(), transient()]);

    let mut orchestrator = Orchestrator::new(config(None), puzzles, submitter);
    orchestrator.run().await.unwrap();

    assert_eq!(state_of(&orchestrator, 4), PuzzleState::Submitted);
    let record = orchestrator.state().record(ProblemId(4)).unwrap();
    let last = record.last_submission.as_ref().unwrap();
    assert_eq!(last.attempts, 3);
    assert!(matches!(last.outcome, SubmissionOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_malformed_problem_is_excluded() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(1, FITTING), (2, r#"{"hole": "nope"}"#)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();
    assert_eq!(puzzles.failures.len(), 1);

    let mut orchestrator = Orchestrator::new(config(None), puzzles, RecordingSubmitter::default());
    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.submitted, 1);
    assert!(orchestrator.state().record(ProblemId(2)).is_none());
}

#[tokio::test]
async fn test_unlocked_bonus_reopens_consumer() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(1, DONOR), (2, SQUARE)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();

    let mut orchestrator = Orchestrator::new(config(None), puzzles, RecordingSubmitter::default());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.rounds, 2);
    let donor = orchestrator.state().record(ProblemId(1)).unwrap();
    let consumer = orchestrator.state().record(ProblemId(2)).unwrap();
    assert_eq!(donor.solve_rounds, 1);
    assert_eq!(consumer.solve_rounds, 2);
    assert_eq!(consumer.best_dislikes, Some(100));
    assert_eq!(consumer.considered.len(), 1);
    assert_eq!(consumer.state, PuzzleState::Submitted);
}

#[tokio::test]
async fn test_resumed_run_skips_finished_puzzles() {
    let dir = tempfile::tempdir().unwrap();
    let puzzles_dir = dir.path().join("puzzles");
    fs::create_dir(&puzzles_dir).unwrap();
    write_puzzles(&puzzles_dir, &[(1, DONOR), (2, SQUARE), (3, FITTING)]);
    let state_file = dir.path().join("state.json");

    let mut first = Orchestrator::new(
        config(Some(&state_file)),
        load_puzzle_set(&puzzles_dir).unwrap(),
        RecordingSubmitter::default(),
    )
    .resume()
    .unwrap();
    first.run().await.unwrap();
    assert!(state_file.exists());

    let saved = OrchestratorState::load(&state_file).unwrap();
    assert_eq!(&saved, first.state());
    assert_eq!(saved.unlocked.len(), 1);

    let mut second = Orchestrator::new(
        config(Some(&state_file)),
        load_puzzle_set(&puzzles_dir).unwrap(),
        CountingSubmitter::default(),
    )
    .resume()
    .unwrap();
    let summary = second.run().await.unwrap();

    assert_eq!(summary.attempts, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(second.state().puzzles.len(), 3);
}

#[tokio::test]
async fn test_cancelled_run_solves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_puzzles(dir.path(), &[(1, FITTING)]);
    let puzzles = load_puzzle_set(dir.path()).unwrap();

    let mut orchestrator = Orchestrator::new(config(None), puzzles, RecordingSubmitter::default());
    orchestrator.cancel_flag().store(true, Ordering::SeqCst);
    let summary = orchestrator.run().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.rounds, 0);
    assert_eq!(state_of(&orchestrator, 1), PuzzleState::Pending);
}
