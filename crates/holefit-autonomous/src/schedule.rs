//! Dependency-aware solving order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use holefit_core::ProblemId;
use tracing::warn;

use crate::graph::{find_cycles, BonusGraph};

/// Solving order for one round, as waves of puzzles that may run
/// concurrently. Every donor whose bonus can improve a known consumer score
/// lands in an earlier wave than that consumer, unless a cycle forced a
/// break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub waves: Vec<Vec<ProblemId>>,
    /// Dependency cycles among the scheduled puzzles.
    pub cycles: Vec<Vec<ProblemId>>,
    /// Puzzles released early to break a cycle, in release order.
    pub cycle_breaks: Vec<ProblemId>,
}

impl Schedule {
    /// Number of scheduled puzzles.
    pub fn len(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.iter().all(Vec::is_empty)
    }
}

/// Estimated gain from solving `puzzle` first: the known dislikes of every
/// other puzzle it can still unlock a bonus for.
pub fn improvement_potential(
    graph: &BonusGraph,
    puzzle: ProblemId,
    known: &BTreeMap<ProblemId, u64>,
) -> u64 {
    graph
        .grants_from(puzzle)
        .filter(|g| g.target != puzzle && !graph.is_unlocked(g))
        .filter_map(|g| known.get(&g.target))
        .sum()
}

/// Orders `pending` puzzles.
///
/// A donor must precede a consumer only when the consumer already has a
/// known, non-zero score the bonus could improve. Within a wave, higher
/// improvement potential goes first. When only cycle members remain, the
/// one with the largest potential is released on its own.
pub fn plan(
    graph: &BonusGraph,
    pending: &BTreeSet<ProblemId>,
    known: &BTreeMap<ProblemId, u64>,
) -> Schedule {
    let mut edges: BTreeMap<ProblemId, BTreeSet<ProblemId>> = BTreeMap::new();
    for (donor, consumers) in graph.adjacency(Some(pending)) {
        let useful: BTreeSet<ProblemId> = consumers
            .into_iter()
            .filter(|c| known.get(c).is_some_and(|&score| score > 0))
            .collect();
        if !useful.is_empty() {
            edges.insert(donor, useful);
        }
    }

    let mut indegree: BTreeMap<ProblemId, usize> = pending.iter().map(|&id| (id, 0)).collect();
    for consumer in edges.values().flatten() {
        if let Some(d) = indegree.get_mut(consumer) {
            *d += 1;
        }
    }

    let potential: BTreeMap<ProblemId, u64> = pending
        .iter()
        .map(|&id| (id, improvement_potential(graph, id, known)))
        .collect();
    let priority = |id: &ProblemId| (Reverse(potential[id]), *id);

    let cycles = find_cycles(&edges);
    let mut remaining: BTreeSet<ProblemId> = pending.clone();
    let mut schedule = Schedule {
        cycles: cycles.clone(),
        ..Schedule::default()
    };

    while !remaining.is_empty() {
        let mut wave: Vec<ProblemId> = remaining
            .iter()
            .copied()
            .filter(|id| indegree[id] == 0)
            .collect();

        if wave.is_empty() {
            let Some(pick) = remaining.iter().copied().min_by_key(priority) else {
                break;
            };
            let cycle = cycles.iter().find(|c| c.contains(&pick));
            warn!(
                event = "bonus_cycle",
                puzzle = %pick,
                potential = potential[&pick],
                cycle = ?cycle,
            );
            schedule.cycle_breaks.push(pick);
            wave.push(pick);
        }

        wave.sort_by_key(priority);
        for id in &wave {
            remaining.remove(id);
            for consumer in edges.get(id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(consumer) {
                    *d = d.saturating_sub(1);
                }
            }
        }
        schedule.waves.push(wave);
    }
    schedule
}
