//! Contest JSON formats for problems and poses.
//!
//! Problem files look like
//!
//! ```json
//! {"hole": [[0,0],[10,0],[10,10]], "epsilon": 150000,
//!  "figure": {"vertices": [[0,0],[5,5]], "edges": [[0,1]]},
//!  "bonuses": [{"bonus": "GLOBALIST", "problem": 7, "position": [3,3]}]}
//! ```
//!
//! where a bonus's `problem` is the puzzle allowed to spend it. The declaring
//! puzzle's id comes from the file name (`42.problem`, `42.json`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HoleFitError, Result};
use crate::geometry::Point;
use crate::pose::Pose;
use crate::problem::{BonusKind, BonusSpec, Figure, Problem, ProblemId};

#[derive(Debug, Serialize, Deserialize)]
struct ProblemFile {
    hole: Vec<Point>,
    epsilon: u64,
    figure: FigureFile,
    #[serde(default)]
    bonuses: Vec<BonusFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FigureFile {
    vertices: Vec<Point>,
    edges: Vec<[usize; 2]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BonusFile {
    bonus: BonusKind,
    #[serde(default)]
    problem: Option<ProblemId>,
    #[serde(default)]
    position: Option<Point>,
    /// Multi-point anchors; appended after `position`.
    #[serde(default)]
    positions: Vec<Point>,
    /// Figure vertices that must sit on the anchors, index-for-index.
    #[serde(default)]
    vertices: Option<Vec<usize>>,
}

impl BonusFile {
    fn into_spec(self) -> BonusSpec {
        let anchors: Vec<Point> = self.position.into_iter().chain(self.positions).collect();
        let mut spec = BonusSpec::new(self.bonus, anchors);
        if let Some(vertices) = self.vertices {
            spec = spec.with_anchor_vertices(vertices);
        }
        if let Some(target) = self.problem {
            spec = spec.with_target(target);
        }
        spec
    }
}

/// Parses a problem; the result carries no id.
///
/// Syntax errors are reported as `MalformedProblem` like shape errors.
pub fn problem_from_json_str(json: &str) -> Result<Problem> {
    let file: ProblemFile =
        serde_json::from_str(json).map_err(|e| HoleFitError::malformed(e.to_string()))?;
    let edges: Vec<(usize, usize)> = file.figure.edges.iter().map(|&[a, b]| (a, b)).collect();
    let figure = Figure::new(file.figure.vertices, &edges)?;
    let bonuses = file.bonuses.into_iter().map(BonusFile::into_spec).collect();
    Problem::new(file.hole, figure, file.epsilon, bonuses)
}

/// Loads a problem file, taking its id from the file name when numeric.
pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let problem = problem_from_json_str(&json).map_err(|e| match e {
        HoleFitError::MalformedProblem(msg) => {
            HoleFitError::malformed(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    Ok(match problem_id_from_path(path) {
        Some(id) => problem.with_id(id),
        None => problem,
    })
}

/// `42.problem` -> `#42`.
pub fn problem_id_from_path(path: &Path) -> Option<ProblemId> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next()?;
    stem.parse().ok().map(ProblemId)
}

/// Problem files (`*.problem`, `*.json`) in `dir`, ordered by puzzle id.
pub fn problem_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<(ProblemId, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("problem") | Some("json")
            )
        })
        .filter_map(|path| problem_id_from_path(&path).map(|id| (id, path)))
        .collect();
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

pub fn pose_from_json_str(json: &str) -> Result<Pose> {
    Ok(serde_json::from_str(json)?)
}

pub fn pose_to_json_string(pose: &Pose) -> Result<String> {
    Ok(serde_json::to_string(pose)?)
}

pub fn load_pose(path: impl AsRef<Path>) -> Result<Pose> {
    pose_from_json_str(&fs::read_to_string(path)?)
}

pub fn write_pose(path: impl AsRef<Path>, pose: &Pose) -> Result<()> {
    fs::write(path, pose_to_json_string(pose)?)?;
    Ok(())
}
