//! Random outcomes for the `/error` endpoint.

use std::sync::Mutex;

use crate::config::SimulationConfig;
use crate::sync::lock;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

impl<F> RandomSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn next_f64(&self) -> f64 {
        self()
    }
}

/// `fastrand` generator, optionally seeded.
#[derive(Debug)]
pub struct FastRandSource {
    rng: Mutex<fastrand::Rng>,
}

impl FastRandSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl RandomSource for FastRandSource {
    fn next_f64(&self) -> f64 {
        lock(&self.rng).f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedOutcome {
    ServerError,
    ClientError,
    Success,
}

/// Picks an outcome with two independent draws: first against the server
/// error rate, then against the client error rate.
pub struct ErrorSimulator {
    source: Box<dyn RandomSource>,
    server_error_rate: f64,
    client_error_rate: f64,
}

impl ErrorSimulator {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::with_source(config, FastRandSource::new(config.seed))
    }

    pub fn with_source(config: &SimulationConfig, source: impl RandomSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            server_error_rate: f64::from(config.server_error_rate),
            client_error_rate: f64::from(config.client_error_rate),
        }
    }

    pub fn draw(&self) -> SimulatedOutcome {
        if self.source.next_f64() < self.server_error_rate {
            return SimulatedOutcome::ServerError;
        }
        if self.source.next_f64() < self.client_error_rate {
            return SimulatedOutcome::ClientError;
        }
        SimulatedOutcome::Success
    }
}

impl std::fmt::Debug for ErrorSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSimulator")
            .field("server_error_rate", &self.server_error_rate)
            .field("client_error_rate", &self.client_error_rate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sequence(values: Vec<f64>) -> impl RandomSource {
        let next = AtomicUsize::new(0);
        move || values[next.fetch_add(1, Ordering::SeqCst) % values.len()]
    }

    #[test]
    fn test_outcomes_follow_draw_order() {
        let config = SimulationConfig::default();

        let sim = ErrorSimulator::with_source(&config, sequence(vec![0.1]));
        assert_eq!(sim.draw(), SimulatedOutcome::ServerError);

        let sim = ErrorSimulator::with_source(&config, sequence(vec![0.5, 0.1]));
        assert_eq!(sim.draw(), SimulatedOutcome::ClientError);

        let sim = ErrorSimulator::with_source(&config, sequence(vec![0.5, 0.5]));
        assert_eq!(sim.draw(), SimulatedOutcome::Success);
    }

    #[test]
    fn test_zero_rates_always_succeed() {
        let config = SimulationConfig {
            server_error_rate: 0.0,
            client_error_rate: 0.0,
            seed: Some(7),
        };
        let sim = ErrorSimulator::from_config(&config);
        assert!((0..100).all(|_| sim.draw() == SimulatedOutcome::Success));
    }

    #[test]
    fn test_seeded_source_is_repeatable() {
        let a = FastRandSource::new(Some(42));
        let b = FastRandSource::new(Some(42));
        for _ in 0..10 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }
}
