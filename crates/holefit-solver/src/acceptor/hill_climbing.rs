//! Hill climbing acceptor.

use super::Acceptor;

/// Accepts candidates that are no worse than the working pose.
///
/// Used to polish an already good pose; it never freezes, so a polishing
/// attempt ends on its time or iteration budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct HillClimbingAcceptor;

impl HillClimbingAcceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Acceptor for HillClimbingAcceptor {
    fn is_accepted(&self, current_cost: f64, candidate_cost: f64, _roll: f64) -> bool {
        candidate_cost <= current_cost
    }
}
