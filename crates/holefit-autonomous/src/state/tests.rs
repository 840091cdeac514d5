use holefit_core::{BonusKind, Point, Pose};

use super::*;

fn grant(donor: u32, target: u32) -> BonusGrant {
    BonusGrant {
        donor: ProblemId(donor),
        target: ProblemId(target),
        kind: BonusKind::Wallhack,
    }
}

fn with_state(state: &mut OrchestratorState, id: u32, puzzle_state: PuzzleState) {
    state.record_mut(ProblemId(id)).state = puzzle_state;
}

#[test]
fn test_missing_file_loads_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = OrchestratorState::load(dir.path().join("absent.json")).unwrap();
    assert_eq!(state, OrchestratorState::default());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let mut state = OrchestratorState::default();
    let record = state.record_mut(ProblemId(3));
    record.transition(PuzzleState::Solving).unwrap();
    record.offer_pose(Pose::new(vec![Point::new(1, 1)]), 17);
    record.transition(PuzzleState::Solved).unwrap();
    state.unlocked = vec![grant(3, 4)];
    state.save(&path).unwrap();

    let loaded = OrchestratorState::load(&path).unwrap();
    assert_eq!(loaded, state);
    assert!(loaded.saved_at.is_some());
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_unknown_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, r#"{"version": 99, "saved_at": null}"#).unwrap();

    let err = OrchestratorState::load(&path).unwrap_err();
    assert!(matches!(err, OrchestratorError::State { .. }));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{not json").unwrap();
    assert!(OrchestratorState::load(&path).is_err());
}

#[test]
fn test_reconcile_picks_puzzles_to_solve() {
    let mut state = OrchestratorState::default();
    with_state(&mut state, 1, PuzzleState::Solving);
    with_state(&mut state, 2, PuzzleState::Submitted);
    with_state(&mut state, 3, PuzzleState::Failed);
    with_state(&mut state, 4, PuzzleState::Solved);
    with_state(&mut state, 5, PuzzleState::Submitted);
    state.unlocked = vec![grant(9, 3)];

    let ids: Vec<ProblemId> = (1..=6).map(ProblemId).collect();
    let to_solve = state.reconcile(&ids).unwrap();

    assert_eq!(to_solve, vec![ProblemId(1), ProblemId(3), ProblemId(6)]);
    assert_eq!(state.puzzles[&ProblemId(1)].state, PuzzleState::Pending);
    assert_eq!(state.puzzles[&ProblemId(2)].state, PuzzleState::Submitted);
    assert_eq!(state.puzzles[&ProblemId(3)].state, PuzzleState::Pending);
    assert_eq!(state.puzzles[&ProblemId(6)].state, PuzzleState::Pending);
}

#[test]
fn test_reconcile_skips_grants_already_considered() {
    let mut state = OrchestratorState::default();
    with_state(&mut state, 2, PuzzleState::Submitted);
    state.record_mut(ProblemId(2)).considered = vec![grant(1, 2)];
    state.unlocked = vec![grant(1, 2)];

    assert!(state.reconcile(&[ProblemId(2)]).unwrap().is_empty());
}

#[test]
fn test_known_scores_and_awaiting_submission() {
    let mut state = OrchestratorState::default();
    let record = state.record_mut(ProblemId(1));
    record.offer_pose(Pose::new(vec![Point::new(0, 0)]), 5);
    record.state = PuzzleState::Solved;
    state.record_mut(ProblemId(2)).state = PuzzleState::Solved;

    assert_eq!(state.known_scores(), BTreeMap::from([(ProblemId(1), 5)]));
    assert_eq!(state.awaiting_submission(), vec![ProblemId(1)]);
}
