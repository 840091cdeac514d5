//! PoseScore - two-level score: violation magnitude, then dislikes.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

use thiserror::Error;

/// Score of a pose.
///
/// `violation` aggregates how badly the pose breaks length and containment
/// rules; `dislikes` is the contest objective. Lower is better on both levels
/// and violation is compared first, so any feasible pose beats any infeasible
/// one.
///
/// # Examples
///
/// ```
/// use holefit_core::PoseScore;
///
/// let broken = PoseScore::of(3, 10);
/// let valid = PoseScore::of(0, 500);
///
/// assert!(valid < broken);
/// assert!(valid.is_feasible());
/// assert!(PoseScore::of_dislikes(40) < valid);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PoseScore {
    violation: u64,
    dislikes: u64,
}

impl PoseScore {
    /// The perfect score.
    pub const ZERO: PoseScore = PoseScore {
        violation: 0,
        dislikes: 0,
    };

    #[inline]
    pub const fn of(violation: u64, dislikes: u64) -> Self {
        PoseScore {
            violation,
            dislikes,
        }
    }

    /// A feasible score.
    #[inline]
    pub const fn of_dislikes(dislikes: u64) -> Self {
        PoseScore {
            violation: 0,
            dislikes,
        }
    }

    #[inline]
    pub const fn violation(&self) -> u64 {
        self.violation
    }

    #[inline]
    pub const fn dislikes(&self) -> u64 {
        self.dislikes
    }

    #[inline]
    pub const fn is_feasible(&self) -> bool {
        self.violation == 0
    }

    /// Collapses both levels into one scalar cost for annealing.
    ///
    /// Infeasible poses stay comparable to feasible ones, weighted by
    /// `violation_weight`.
    pub fn to_cost(&self, violation_weight: f64) -> f64 {
        self.dislikes as f64 + self.violation as f64 * violation_weight
    }
}

impl Ord for PoseScore {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.violation.cmp(&other.violation) {
            Ordering::Equal => self.dislikes.cmp(&other.dislikes),
            other => other,
        }
    }
}

impl PartialOrd for PoseScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for PoseScore {
    type Output = PoseScore;

    fn add(self, rhs: PoseScore) -> PoseScore {
        PoseScore::of(
            self.violation.saturating_add(rhs.violation),
            self.dislikes.saturating_add(rhs.dislikes),
        )
    }
}

impl fmt::Debug for PoseScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoseScore({}, {})", self.violation, self.dislikes)
    }
}

impl fmt::Display for PoseScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}violation/{}dislikes", self.violation, self.dislikes)
    }
}

/// Error when parsing a score from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScoreParseError {
    pub message: String,
}

impl PoseScore {
    /// Parses `"<v>violation/<d>dislikes"`, or a bare dislikes number.
    pub fn parse(s: &str) -> Result<Self, ScoreParseError> {
        let s = s.trim();
        let err = || ScoreParseError {
            message: format!("invalid PoseScore '{}'", s),
        };
        if let Ok(dislikes) = s.parse::<u64>() {
            return Ok(PoseScore::of_dislikes(dislikes));
        }
        let (violation, dislikes) = s.split_once('/').ok_or_else(err)?;
        let violation = violation
            .strip_suffix("violation")
            .and_then(|v| v.parse().ok())
            .ok_or_else(err)?;
        let dislikes = dislikes
            .strip_suffix("dislikes")
            .and_then(|v| v.parse().ok())
            .ok_or_else(err)?;
        Ok(PoseScore::of(violation, dislikes))
    }
}
