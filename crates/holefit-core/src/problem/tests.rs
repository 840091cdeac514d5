use super::*;
use crate::pose::BonusUsage;
use crate::test_utils::{points, pt, square_hole, triangle_problem};

fn figure() -> Figure {
    Figure::new(points(&[(0, 0), (3, 4), (6, 0)]), &[(0, 1), (1, 2)]).unwrap()
}

#[test]
fn test_figure_derives_original_lengths() {
    let figure = figure();
    assert_eq!(figure.edges()[0].original_sq, 25);
    assert_eq!(figure.edges()[0].scale, 1);
    assert!(figure.find_edge(2, 1).is_some());
    assert!(figure.find_edge(0, 2).is_none());
}

#[test]
fn test_figure_rejects_bad_edges() {
    assert!(Figure::new(points(&[(0, 0), (1, 1)]), &[(0, 2)]).is_err());
    assert!(Figure::new(points(&[(0, 0), (0, 0)]), &[(0, 1)]).is_err());
}

#[test]
fn test_problem_rejects_small_hole() {
    let result = Problem::new(points(&[(0, 0), (5, 0)]), figure(), 0, Vec::new());
    assert!(matches!(result, Err(HoleFitError::MalformedProblem(_))));
}

#[test]
fn test_problem_rejects_empty_figure() {
    let empty = Figure::new(Vec::new(), &[]).unwrap();
    assert!(Problem::new(square_hole(10), empty, 0, Vec::new()).is_err());
}

#[test]
fn test_problem_rejects_duplicate_bonus_anchors() {
    let bonuses = vec![
        BonusSpec::new(BonusKind::Globalist, vec![pt(1, 1)]),
        BonusSpec::new(BonusKind::Wallhack, vec![pt(1, 1)]),
    ];
    assert!(Problem::new(square_hole(10), figure(), 0, bonuses).is_err());
}

#[test]
fn test_problem_rejects_bad_anchor_vertices() {
    let mismatched =
        BonusSpec::new(BonusKind::Globalist, vec![pt(1, 1)]).with_anchor_vertices(vec![0, 1]);
    assert!(Problem::new(square_hole(10), figure(), 0, vec![mismatched]).is_err());

    let outside = BonusSpec::new(BonusKind::Globalist, vec![pt(1, 1)]).with_anchor_vertices(vec![7]);
    assert!(Problem::new(square_hole(10), figure(), 0, vec![outside]).is_err());
}

#[test]
fn test_with_id_fills_missing_donors() {
    let problem = triangle_problem(vec![
        BonusSpec::new(BonusKind::Globalist, vec![pt(0, 0)]),
        BonusSpec::new(BonusKind::Wallhack, vec![pt(10, 0)]).with_donor(ProblemId(99)),
    ])
    .with_id(ProblemId(5));

    assert_eq!(problem.id(), Some(ProblemId(5)));
    assert_eq!(problem.bonuses()[0].donor, Some(ProblemId(5)));
    assert_eq!(problem.bonuses()[1].donor, Some(ProblemId(99)));
}

#[test]
fn test_anchor_conditions() {
    let vertices = points(&[(0, 0), (3, 4), (6, 0)]);

    let any = BonusSpec::new(BonusKind::Globalist, vec![pt(6, 0)]);
    assert!(any.is_granted_by(&vertices));
    assert_eq!(any.anchor_distance(&vertices), 0);

    let pinned = BonusSpec::new(BonusKind::Globalist, vec![pt(6, 0)]).with_anchor_vertices(vec![0]);
    assert!(!pinned.is_granted_by(&vertices));
    assert_eq!(pinned.anchor_distance(&vertices), 36);

    let near = BonusSpec::new(BonusKind::Globalist, vec![pt(6, 1)]);
    assert!(!near.is_granted_by(&vertices));
    assert_eq!(near.anchor_distance(&vertices), 1);
}

#[test]
fn test_effective_edges_split_broken_leg() {
    let problem = Problem::new(square_hole(10), figure(), 0, Vec::new()).unwrap();
    assert_eq!(problem.effective_edges(&[]).unwrap().len(), 2);

    let usage = [BonusUsage::new(BonusKind::BreakALeg, ProblemId(1)).on_edge(1, 0)];
    let edges = problem.effective_edges(&usage).unwrap();
    assert_eq!(problem.expected_vertex_count(&usage), 4);
    assert_eq!(edges.len(), 3);
    assert!(edges.iter().any(|e| e.connects(0, 3) && e.scale == 4 && e.original_sq == 25));
    assert!(edges.iter().any(|e| e.connects(3, 1) && e.scale == 4));
    assert!(!edges.iter().any(|e| e.connects(0, 1)));
}

#[test]
fn test_effective_edges_reject_unknown_leg() {
    let problem = Problem::new(square_hole(10), figure(), 0, Vec::new()).unwrap();
    let usage = [BonusUsage::new(BonusKind::BreakALeg, ProblemId(1)).on_edge(0, 2)];
    assert!(problem.effective_edges(&usage).is_err());
    let unnamed = [BonusUsage::new(BonusKind::BreakALeg, ProblemId(1))];
    assert!(problem.effective_edges(&unnamed).is_err());
}

#[test]
fn test_bonus_kind_wire_names() {
    assert_eq!(serde_json::to_string(&BonusKind::BreakALeg).unwrap(), "\"BREAK_A_LEG\"");
    assert_eq!(BonusKind::Superflex.to_string(), "SUPERFLEX");
    assert_eq!(ProblemId(12).to_string(), "#12");
}
