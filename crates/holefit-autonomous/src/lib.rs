//! holefit Autonomous - runs many puzzles to completion
//!
//! This crate drives the solver over a whole puzzle set:
//! - Per-puzzle lifecycle state machine
//! - Cross-puzzle bonus dependency graph with snapshot reads
//! - Dependency-aware scheduling with cycle breaking
//! - A bounded worker pool running solving attempts
//! - A retrying submission queue
//! - Restart-safe persisted state

pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod puzzle;
pub mod schedule;
pub mod state;
pub mod submission;
mod worker;

pub use error::{OrchestratorError, Result};
pub use graph::{BonusGrant, BonusGraph, BonusTableRow, SharedBonusGraph};
pub use orchestrator::{load_puzzle_set, Orchestrator, PuzzleSet, RunSummary};
pub use puzzle::{PuzzleRecord, PuzzleState, SubmissionOutcome, SubmissionRecord};
pub use schedule::{plan, Schedule};
pub use state::OrchestratorState;
pub use submission::{
    HttpSubmitter, RetryPolicy, SubmissionJob, SubmissionQueue, SubmissionReceipt, Submitter,
};
