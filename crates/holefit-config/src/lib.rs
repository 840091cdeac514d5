//! Configuration system for holefit.
//!
//! Load solver and orchestrator configuration from TOML or YAML files to
//! control annealing, termination, bonus modes and submission without code
//! changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use holefit_config::{OperatingModeConfig, SolverConfig};
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [termination]
//!     millis_spent_limit = 30000
//!
//!     [annealing]
//!     starting_temperature = 250.0
//!     max_reheats = 2
//!
//!     [operating_mode]
//!     type = "bonus_collector"
//!     target = 12
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(config.annealing.max_reheats, 2);
//! assert!(matches!(config.operating_mode, OperatingModeConfig::BonusCollector { .. }));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use holefit_config::SolverConfig;
//!
//! let config = SolverConfig::load("holefit.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use holefit_core::ProblemId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// Random seed for reproducible attempts.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Termination configuration for a single attempt.
    #[serde(default)]
    pub termination: Option<TerminationConfig>,

    /// Annealing schedule and move mix.
    #[serde(default)]
    pub annealing: AnnealingConfig,

    /// Objective shaping for bonus acquisition.
    #[serde(default)]
    pub operating_mode: OperatingModeConfig,

    /// Multi-puzzle scheduling.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Submission retry policy.
    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file, picking the format by extension
    /// (`.yaml`/`.yml` for YAML, anything else TOML).
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, fails to parse, or holds
    /// out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path)?,
            _ => Self::from_toml_file(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Sets the per-attempt time limit.
    pub fn with_time_limit_millis(mut self, millis: u64) -> Self {
        self.termination = Some(TerminationConfig {
            millis_spent_limit: Some(millis),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the per-attempt iteration limit.
    pub fn with_iteration_limit(mut self, iterations: u64) -> Self {
        self.termination = Some(TerminationConfig {
            iteration_limit: Some(iterations),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_annealing(mut self, annealing: AnnealingConfig) -> Self {
        self.annealing = annealing;
        self
    }

    pub fn with_operating_mode(mut self, mode: OperatingModeConfig) -> Self {
        self.operating_mode = mode;
        self
    }

    /// Returns the per-attempt time limit, if configured.
    pub fn time_limit(&self) -> Option<Duration> {
        self.termination.as_ref().and_then(|t| t.time_limit())
    }

    /// Returns the per-attempt iteration limit, if configured.
    pub fn iteration_limit(&self) -> Option<u64> {
        self.termination.as_ref().and_then(|t| t.iteration_limit)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.annealing.validate()?;
        self.orchestrator.validate()?;
        self.submission.validate()
    }
}

/// Termination configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationConfig {
    /// Maximum milliseconds to spend on one attempt.
    pub millis_spent_limit: Option<u64>,

    /// Maximum number of annealing iterations.
    pub iteration_limit: Option<u64>,
}

impl TerminationConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.millis_spent_limit
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

/// Annealing schedule.
///
/// Temperature is multiplied by `cooling_rate` once every
/// `iterations_per_cooling_step` iterations. When it falls below
/// `minimum_temperature` the solver reheats to
/// `starting_temperature * reheat_factor`, at most `max_reheats` times.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnnealingConfig {
    pub starting_temperature: f64,
    pub cooling_rate: f64,
    pub minimum_temperature: f64,
    pub iterations_per_cooling_step: u64,
    pub max_reheats: u32,
    pub reheat_factor: f64,
    /// Weight of the violation level when collapsing a score into a cost.
    pub violation_weight: f64,
    /// Probability of a whole-pose translation instead of a vertex shift.
    pub translate_probability: f64,
    /// Probability of snapping onto bonus anchors when a bonus is targeted.
    pub bonus_snap_probability: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            starting_temperature: 100.0,
            cooling_rate: 0.99,
            minimum_temperature: 2.0,
            iterations_per_cooling_step: 32_768,
            max_reheats: 5,
            reheat_factor: 0.33,
            violation_weight: 1.0,
            translate_probability: 0.05,
            bonus_snap_probability: 0.02,
        }
    }
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if !(self.minimum_temperature > 0.0) {
            return invalid(format!(
                "minimum_temperature must be positive, got {}",
                self.minimum_temperature
            ));
        }
        if !(self.starting_temperature > self.minimum_temperature) {
            return invalid(format!(
                "starting_temperature {} must exceed minimum_temperature {}",
                self.starting_temperature, self.minimum_temperature
            ));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return invalid(format!("cooling_rate must be in (0, 1), got {}", self.cooling_rate));
        }
        if !(self.reheat_factor > 0.0 && self.reheat_factor <= 1.0) {
            return invalid(format!("reheat_factor must be in (0, 1], got {}", self.reheat_factor));
        }
        if self.iterations_per_cooling_step == 0 {
            return invalid("iterations_per_cooling_step must be at least 1".to_string());
        }
        if !(self.violation_weight > 0.0) {
            return invalid(format!(
                "violation_weight must be positive, got {}",
                self.violation_weight
            ));
        }
        for (name, p) in [
            ("translate_probability", self.translate_probability),
            ("bonus_snap_probability", self.bonus_snap_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} must be in [0, 1], got {}", name, p));
            }
        }
        Ok(())
    }
}

/// Objective shaping for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatingModeConfig {
    /// Minimize dislikes only.
    #[default]
    ScoreMaximizer,

    /// Minimize dislikes while acquiring the bonus `target` needs.
    BonusCollector { target: ProblemId },

    /// Acquire any bonus, then minimize dislikes subject to keeping it.
    BonusHunter,

    /// Stop as soon as a zero-dislike valid pose is found.
    ZeroHunter,
}

/// Multi-puzzle scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Concurrent solver attempts.
    pub worker_count: usize,
    /// Wall-clock budget of one attempt.
    pub attempt_millis: u64,
    /// Wall-clock budget of one puzzle across all its attempts.
    pub puzzle_millis: u64,
    pub attempts_per_puzzle: u32,
    /// Rounds spent trying to break bonus dependency cycles before every
    /// puzzle in the cycle is solved independently.
    pub cycle_retry_limit: u32,
    /// Persisted progress; `None` keeps state in memory only.
    pub state_file: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            attempt_millis: 60_000,
            puzzle_millis: 300_000,
            attempts_per_puzzle: 3,
            cycle_retry_limit: 2,
            state_file: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn attempt_time_limit(&self) -> Duration {
        Duration::from_millis(self.attempt_millis)
    }

    pub fn puzzle_time_limit(&self) -> Duration {
        Duration::from_millis(self.puzzle_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".to_string()));
        }
        if self.attempts_per_puzzle == 0 {
            return Err(ConfigError::Invalid(
                "attempts_per_puzzle must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Submission retry policy and endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SubmissionConfig {
    pub max_attempts: u32,
    pub initial_backoff_millis: u64,
    pub max_backoff_millis: u64,
    /// Base URL of the contest server; `None` disables HTTP submission.
    pub endpoint: Option<String>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_millis: 500,
            max_backoff_millis: 30_000,
            endpoint: None,
        }
    }
}

impl SubmissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.initial_backoff_millis > self.max_backoff_millis {
            return Err(ConfigError::Invalid(format!(
                "initial_backoff_millis {} exceeds max_backoff_millis {}",
                self.initial_backoff_millis, self.max_backoff_millis
            )));
        }
        Ok(())
    }
}
