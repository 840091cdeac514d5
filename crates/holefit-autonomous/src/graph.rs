//! Cross-puzzle bonus dependency graph.
//!
//! [`BonusGraph`] is an immutable snapshot. [`SharedBonusGraph`] publishes
//! snapshots behind a lock held only for the pointer swap, so readers see
//! either the graph before an unlock or after it, never a mix.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use holefit_core::{BonusKind, Problem, ProblemId};
use serde::{Deserialize, Serialize};

/// "`donor` grants `kind`, usable by `target`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BonusGrant {
    pub donor: ProblemId,
    pub target: ProblemId,
    pub kind: BonusKind,
}

/// One line of the bonus table report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusTableRow {
    pub puzzle: ProblemId,
    /// `(kind, target, unlocked)` for bonuses this puzzle can grant.
    pub gives: Vec<(BonusKind, ProblemId, bool)>,
    /// `(kind, donor, unlocked)` for bonuses this puzzle can receive.
    pub receives: Vec<(BonusKind, ProblemId, bool)>,
}

/// Snapshot of declared grants and which of them are unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BonusGraph {
    grants: BTreeSet<BonusGrant>,
    unlocked: BTreeSet<BonusGrant>,
}

impl BonusGraph {
    /// Collects every bonus declaration of tagged problems. A bonus without
    /// an explicit target is usable by the declaring puzzle itself.
    pub fn from_problems<'a>(problems: impl IntoIterator<Item = &'a Problem>) -> Self {
        let mut grants = BTreeSet::new();
        for problem in problems {
            let Some(id) = problem.id() else { continue };
            for bonus in problem.bonuses() {
                grants.insert(BonusGrant {
                    donor: bonus.donor.unwrap_or(id),
                    target: bonus.target.unwrap_or(id),
                    kind: bonus.kind,
                });
            }
        }
        Self {
            grants,
            unlocked: BTreeSet::new(),
        }
    }

    pub fn grants(&self) -> impl Iterator<Item = &BonusGrant> {
        self.grants.iter()
    }

    pub fn is_unlocked(&self, grant: &BonusGrant) -> bool {
        self.unlocked.contains(grant)
    }

    pub fn unlocked(&self) -> Vec<BonusGrant> {
        self.unlocked.iter().copied().collect()
    }

    /// Unlocked grants `target` may spend.
    pub fn unlocked_for(&self, target: ProblemId) -> Vec<BonusGrant> {
        self.unlocked
            .iter()
            .filter(|g| g.target == target)
            .copied()
            .collect()
    }

    pub fn grants_from(&self, donor: ProblemId) -> impl Iterator<Item = &BonusGrant> {
        self.grants.iter().filter(move |g| g.donor == donor)
    }

    pub fn grants_to(&self, target: ProblemId) -> impl Iterator<Item = &BonusGrant> {
        self.grants.iter().filter(move |g| g.target == target)
    }

    /// New snapshot with `grants` unlocked. Grants that are not declared are
    /// ignored.
    pub fn with_unlocked(&self, grants: &[BonusGrant]) -> Self {
        let mut next = self.clone();
        next.unlocked
            .extend(grants.iter().filter(|g| self.grants.contains(g)).copied());
        next
    }

    /// Donor -> consumers adjacency over distinct puzzles, restricted to
    /// `among` when given.
    pub fn adjacency(&self, among: Option<&BTreeSet<ProblemId>>) -> BTreeMap<ProblemId, BTreeSet<ProblemId>> {
        let keep = |id: &ProblemId| among.map_or(true, |set| set.contains(id));
        let mut adjacency: BTreeMap<ProblemId, BTreeSet<ProblemId>> = BTreeMap::new();
        for grant in &self.grants {
            if grant.donor == grant.target || !keep(&grant.donor) || !keep(&grant.target) {
                continue;
            }
            adjacency.entry(grant.donor).or_default().insert(grant.target);
        }
        adjacency
    }

    /// Strongly connected components with more than one puzzle, each
    /// sorted, in ascending order of their smallest member.
    pub fn cycles(&self) -> Vec<Vec<ProblemId>> {
        find_cycles(&self.adjacency(None))
    }

    /// Per-puzzle listing of bonuses given and received.
    pub fn bonus_table(&self) -> Vec<BonusTableRow> {
        let puzzles: BTreeSet<ProblemId> = self
            .grants
            .iter()
            .flat_map(|g| [g.donor, g.target])
            .collect();
        puzzles
            .into_iter()
            .map(|puzzle| BonusTableRow {
                puzzle,
                gives: self
                    .grants_from(puzzle)
                    .map(|g| (g.kind, g.target, self.is_unlocked(g)))
                    .collect(),
                receives: self
                    .grants_to(puzzle)
                    .map(|g| (g.kind, g.donor, self.is_unlocked(g)))
                    .collect(),
            })
            .collect()
    }
}

/// Tarjan's algorithm, iterative.
pub(crate) fn find_cycles(adjacency: &BTreeMap<ProblemId, BTreeSet<ProblemId>>) -> Vec<Vec<ProblemId>> {
    let nodes: BTreeSet<ProblemId> = adjacency
        .iter()
        .flat_map(|(from, to)| std::iter::once(*from).chain(to.iter().copied()))
        .collect();
    let empty = BTreeSet::new();

    let mut index: BTreeMap<ProblemId, usize> = BTreeMap::new();
    let mut low: BTreeMap<ProblemId, usize> = BTreeMap::new();
    let mut on_stack: BTreeSet<ProblemId> = BTreeSet::new();
    let mut stack: Vec<ProblemId> = Vec::new();
    let mut next_index = 0;
    let mut components = Vec::new();

    for &root in &nodes {
        if index.contains_key(&root) {
            continue;
        }
        // (node, successors still to visit)
        let mut work: Vec<(ProblemId, Vec<ProblemId>)> = Vec::new();
        let succ = |n: ProblemId| -> Vec<ProblemId> {
            adjacency.get(&n).unwrap_or(&empty).iter().rev().copied().collect()
        };
        index.insert(root, next_index);
        low.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);
        work.push((root, succ(root)));

        while let Some((node, pending)) = work.last_mut() {
            let node = *node;
            if let Some(next) = pending.pop() {
                if !index.contains_key(&next) {
                    index.insert(next, next_index);
                    low.insert(next, next_index);
                    next_index += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    work.push((next, succ(next)));
                } else if on_stack.contains(&next) {
                    let l = low[&node].min(index[&next]);
                    low.insert(node, l);
                }
                continue;
            }

            work.pop();
            if let Some((parent, _)) = work.last() {
                let l = low[parent].min(low[&node]);
                low.insert(*parent, l);
            }
            if low[&node] == index[&node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                if component.len() > 1 {
                    component.sort();
                    components.push(component);
                }
            }
        }
    }
    components.sort();
    components
}

/// Single-writer holder of the current [`BonusGraph`] snapshot.
#[derive(Debug, Default)]
pub struct SharedBonusGraph {
    current: RwLock<Arc<BonusGraph>>,
}

impl SharedBonusGraph {
    pub fn new(graph: BonusGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    /// The current snapshot; unaffected by later unlocks.
    pub fn snapshot(&self) -> Arc<BonusGraph> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes a snapshot with `grants` unlocked. Returns the grants that
    /// were not unlocked before.
    pub fn unlock(&self, grants: &[BonusGrant]) -> Vec<BonusGrant> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let fresh: Vec<BonusGrant> = grants
            .iter()
            .filter(|g| !guard.is_unlocked(g) && guard.grants.contains(g))
            .copied()
            .collect();
        if !fresh.is_empty() {
            *guard = Arc::new(guard.with_unlocked(&fresh));
        }
        fresh
    }
}
