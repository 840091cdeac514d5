//! Simulated annealing acceptor.

use holefit_config::AnnealingConfig;

use super::Acceptor;

/// Metropolis acceptor with geometric cooling.
///
/// Improving candidates are always accepted; a worse candidate is accepted
/// with probability `exp(-(candidate - current) / temperature)`. Temperature
/// is multiplied by `cooling_rate` once every `iterations_per_cooling_step`
/// iterations.
///
/// # Example
///
/// ```
/// use holefit_solver::{Acceptor, SimulatedAnnealingAcceptor};
///
/// let acceptor = SimulatedAnnealingAcceptor::new(10.0, 0.5, 1.0, 1);
/// assert!(acceptor.is_accepted(5.0, 4.0, 0.99));
/// // exp(-1 / 10) ~ 0.905
/// assert!(acceptor.is_accepted(5.0, 6.0, 0.9));
/// assert!(!acceptor.is_accepted(5.0, 6.0, 0.91));
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingAcceptor {
    /// Initial temperature.
    starting_temperature: f64,
    /// Current temperature.
    current_temperature: f64,
    /// Multiplicative decay per cooling step.
    cooling_rate: f64,
    minimum_temperature: f64,
    iterations_per_cooling_step: u64,
    iterations_since_cooling: u64,
}

impl SimulatedAnnealingAcceptor {
    pub fn new(
        starting_temperature: f64,
        cooling_rate: f64,
        minimum_temperature: f64,
        iterations_per_cooling_step: u64,
    ) -> Self {
        Self {
            starting_temperature,
            current_temperature: starting_temperature,
            cooling_rate,
            minimum_temperature,
            iterations_per_cooling_step: iterations_per_cooling_step.max(1),
            iterations_since_cooling: 0,
        }
    }

    pub fn from_config(config: &AnnealingConfig) -> Self {
        Self::new(
            config.starting_temperature,
            config.cooling_rate,
            config.minimum_temperature,
            config.iterations_per_cooling_step,
        )
    }

    pub fn starting_temperature(&self) -> f64 {
        self.starting_temperature
    }
}

impl Acceptor for SimulatedAnnealingAcceptor {
    fn is_accepted(&self, current_cost: f64, candidate_cost: f64, roll: f64) -> bool {
        if candidate_cost < current_cost {
            return true;
        }
        if self.current_temperature <= 0.0 {
            return candidate_cost <= current_cost;
        }
        let probability = (-(candidate_cost - current_cost) / self.current_temperature).exp();
        roll < probability
    }

    fn phase_started(&mut self) {
        self.current_temperature = self.starting_temperature;
        self.iterations_since_cooling = 0;
    }

    fn step_ended(&mut self) {
        self.iterations_since_cooling += 1;
        if self.iterations_since_cooling >= self.iterations_per_cooling_step {
            self.iterations_since_cooling = 0;
            self.current_temperature *= self.cooling_rate;
        }
    }

    fn temperature(&self) -> f64 {
        self.current_temperature
    }

    fn temperature_ratio(&self) -> f64 {
        if self.starting_temperature > 0.0 {
            (self.current_temperature / self.starting_temperature).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn is_frozen(&self) -> bool {
        self.current_temperature < self.minimum_temperature
    }

    fn reheat(&mut self, factor: f64) {
        self.current_temperature = self.starting_temperature * factor;
        self.iterations_since_cooling = 0;
    }
}
