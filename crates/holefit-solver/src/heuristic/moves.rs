//! Pose moves with explicit undo.

use holefit_core::{Point, Pose};
use smallvec::SmallVec;

/// A change to the working pose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseMove {
    /// Moves one vertex to a new lattice point.
    Shift { vertex: usize, to: Point },
    /// Rigidly translates every vertex.
    Translate { delta: Point },
    /// Places several vertices at once, onto bonus anchors.
    Snap {
        placements: SmallVec<[(usize, Point); 4]>,
    },
}

/// Reverts exactly one applied [`PoseMove`].
#[derive(Debug, Clone)]
#[must_use]
pub enum MoveUndo {
    Restore(SmallVec<[(usize, Point); 4]>),
    Untranslate(Point),
}

impl PoseMove {
    /// Applies the move in place.
    ///
    /// Vertex indices must be within the pose.
    pub fn apply(&self, pose: &mut Pose) -> MoveUndo {
        match self {
            PoseMove::Shift { vertex, to } => {
                let previous = std::mem::replace(&mut pose.vertices[*vertex], *to);
                MoveUndo::Restore(smallvec::smallvec![(*vertex, previous)])
            }
            PoseMove::Translate { delta } => {
                for v in &mut pose.vertices {
                    *v = *v + *delta;
                }
                MoveUndo::Untranslate(*delta)
            }
            PoseMove::Snap { placements } => MoveUndo::Restore(
                placements
                    .iter()
                    .map(|&(i, to)| (i, std::mem::replace(&mut pose.vertices[i], to)))
                    .collect(),
            ),
        }
    }
}

impl MoveUndo {
    pub fn revert(self, pose: &mut Pose) {
        match self {
            MoveUndo::Restore(previous) => {
                // Reverse order handles a vertex placed twice.
                for &(i, p) in previous.iter().rev() {
                    pose.vertices[i] = p;
                }
            }
            MoveUndo::Untranslate(delta) => {
                for v in &mut pose.vertices {
                    *v = *v - delta;
                }
            }
        }
    }
}
