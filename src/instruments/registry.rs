//! Instrument factory and collection point.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::instruments::counter::{Counter, CounterState};
use crate::instruments::data::{InstrumentDescriptor, InstrumentKind, MetricData, MetricReading};
use crate::instruments::gauge::{GaugeState, Observable, ObservableGauge, ObserveError};
use crate::instruments::histogram::{Histogram, HistogramState, DEFAULT_LATENCY_BOUNDARIES};
use crate::sync::lock;

const MAX_NAME_LEN: usize = 255;

/// Errors raised when creating instruments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid instrument name {0:?}: must start with a letter and contain only letters, digits, '_', '.', '-' or '/' (max 255 chars)")]
    InvalidName(String),

    #[error("instrument {0:?} is already registered")]
    Duplicate(String),

    #[error("histogram {0:?} boundaries must be finite and strictly increasing")]
    InvalidBoundaries(String),
}

/// A gauge callback that failed during collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub instrument: String,
    pub error: ObserveError,
}

/// Output of one [`MetricRegistry::collect`] call.
#[derive(Debug, Default)]
pub struct Collection {
    pub readings: Vec<MetricReading>,
    pub failures: Vec<CallbackFailure>,
}

#[derive(Clone)]
enum Registered {
    Counter(Arc<CounterState>),
    Histogram(Arc<HistogramState>),
    Gauge(Arc<GaugeState>),
}

impl Registered {
    fn descriptor(&self) -> &InstrumentDescriptor {
        match self {
            Registered::Counter(state) => state.descriptor(),
            Registered::Histogram(state) => state.descriptor(),
            Registered::Gauge(state) => state.descriptor(),
        }
    }
}

/// Owns every instrument created for a scope and the gauge callbacks
/// registered against it.
///
/// Request handlers write through the returned handles; only the export
/// path calls [`collect`](Self::collect), which is also the only place gauge
/// callbacks run.
pub struct MetricRegistry {
    scope: String,
    instruments: Mutex<Vec<Registered>>,
}

impl MetricRegistry {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            instruments: Mutex::new(Vec::new()),
        }
    }

    /// Instrumentation scope name reported alongside every reading.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn counter(
        &self,
        name: &str,
        unit: &str,
        description: &str,
    ) -> Result<Counter, RegistryError> {
        let descriptor = descriptor(name, unit, description, InstrumentKind::Counter)?;
        self.register(descriptor, |d| {
            let (handle, state) = Counter::new(d);
            (handle, Registered::Counter(state))
        })
    }

    /// Create a histogram with [`DEFAULT_LATENCY_BOUNDARIES`].
    pub fn histogram(
        &self,
        name: &str,
        unit: &str,
        description: &str,
    ) -> Result<Histogram, RegistryError> {
        self.histogram_with_boundaries(name, unit, description, DEFAULT_LATENCY_BOUNDARIES.to_vec())
    }

    pub fn histogram_with_boundaries(
        &self,
        name: &str,
        unit: &str,
        description: &str,
        boundaries: Vec<f64>,
    ) -> Result<Histogram, RegistryError> {
        let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
        if !increasing || boundaries.iter().any(|b| !b.is_finite()) {
            return Err(RegistryError::InvalidBoundaries(name.to_string()));
        }
        let descriptor = descriptor(name, unit, description, InstrumentKind::Histogram)?;
        self.register(descriptor, |d| {
            let (handle, state) = Histogram::new(d, boundaries);
            (handle, Registered::Histogram(state))
        })
    }

    /// Register a gauge whose values come from `callback` at collection time.
    pub fn observable_gauge(
        &self,
        name: &str,
        unit: &str,
        description: &str,
        callback: impl Observable + 'static,
    ) -> Result<ObservableGauge, RegistryError> {
        let descriptor = descriptor(name, unit, description, InstrumentKind::ObservableGauge)?;
        self.register(descriptor, |d| {
            let (handle, state) = ObservableGauge::new(d, Box::new(callback));
            (handle, Registered::Gauge(state))
        })
    }

    fn register<H>(
        &self,
        descriptor: InstrumentDescriptor,
        build: impl FnOnce(InstrumentDescriptor) -> (H, Registered),
    ) -> Result<H, RegistryError> {
        let mut instruments = lock(&self.instruments);
        if instruments
            .iter()
            .any(|existing| existing.descriptor().name == descriptor.name)
        {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        tracing::debug!(
            scope = %self.scope,
            instrument = %descriptor.name,
            kind = ?descriptor.kind,
            "Instrument registered"
        );
        let (handle, registered) = build(descriptor);
        instruments.push(registered);
        Ok(handle)
    }

    pub fn descriptors(&self) -> Vec<InstrumentDescriptor> {
        lock(&self.instruments)
            .iter()
            .map(|r| r.descriptor().clone())
            .collect()
    }

    /// Gather one reading per instrument.
    ///
    /// Counters and histograms hand over what accumulated since the previous
    /// call. Gauge callbacks run now; a failing callback contributes no
    /// reading and is reported in [`Collection::failures`] instead.
    pub fn collect(&self) -> Collection {
        // Callbacks run outside the registry lock.
        let instruments: Vec<Registered> = lock(&self.instruments).clone();

        let mut collection = Collection::default();
        for instrument in instruments {
            let descriptor = instrument.descriptor().clone();
            let data = match &instrument {
                Registered::Counter(state) => MetricData::Sum(state.collect()),
                Registered::Histogram(state) => MetricData::Histogram(state.collect()),
                Registered::Gauge(state) => match state.observe() {
                    Ok(points) => MetricData::Gauge(points),
                    Err(error) => {
                        collection.failures.push(CallbackFailure {
                            instrument: descriptor.name,
                            error,
                        });
                        continue;
                    }
                },
            };
            collection.readings.push(MetricReading { descriptor, data });
        }
        collection
    }
}

fn descriptor(
    name: &str,
    unit: &str,
    description: &str,
    kind: InstrumentKind,
) -> Result<InstrumentDescriptor, RegistryError> {
    if !is_valid_name(name) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(InstrumentDescriptor {
        name: name.to_string(),
        unit: unit.to_string(),
        description: description.to_string(),
        kind,
    })
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= MAX_NAME_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::attributes::Attributes;
    use crate::instruments::gauge::{ObserveResult, Observation};

    #[test]
    fn test_name_validation() {
        let registry = MetricRegistry::new("test");
        assert!(registry.counter("http_errors_total", "1", "").is_ok());
        assert!(registry.counter("http.server/duration-ms", "ms", "").is_ok());

        let too_long = "a".repeat(256);
        for bad in ["", "1abc", "_x", "has space", "a\u{e9}", too_long.as_str()] {
            assert_eq!(
                registry.counter(bad, "1", "").unwrap_err(),
                RegistryError::InvalidName(bad.to_string())
            );
        }
    }

    #[test]
    fn test_duplicate_names_rejected_across_kinds() {
        let registry = MetricRegistry::new("test");
        registry.counter("requests", "1", "").unwrap();
        assert_eq!(
            registry.histogram("requests", "s", "").unwrap_err(),
            RegistryError::Duplicate("requests".into())
        );
        assert_eq!(registry.descriptors().len(), 1);
    }

    #[test]
    fn test_invalid_boundaries() {
        let registry = MetricRegistry::new("test");
        for bounds in [vec![1.0, 1.0], vec![2.0, 1.0], vec![f64::NAN]] {
            assert!(matches!(
                registry.histogram_with_boundaries("h", "s", "", bounds),
                Err(RegistryError::InvalidBoundaries(_))
            ));
        }
    }

    #[test]
    fn test_collect_one_reading_per_instrument() {
        let registry = MetricRegistry::new("test");
        let counter = registry.counter("errors", "1", "errors").unwrap();
        let histogram = registry.histogram("latency", "s", "latency").unwrap();
        registry
            .observable_gauge("sizes", "1", "sizes", || -> ObserveResult {
                Ok(vec![Observation::new(3, Attributes::new().with("user_id", "u1"))])
            })
            .unwrap();

        counter.add(1, &Attributes::new());
        histogram.record(0.2, &Attributes::new());

        let collection = registry.collect();
        assert!(collection.failures.is_empty());
        let names: Vec<_> = collection.readings.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["errors", "latency", "sizes"]);
        assert_eq!(collection.readings[0].sum_points()[0].delta, 1);
        assert_eq!(collection.readings[1].histogram_points()[0].count, 1);
        assert_eq!(collection.readings[2].gauge_points()[0].value, 3);

        // Second cycle: counters and histograms are drained, gauges resampled.
        let collection = registry.collect();
        assert!(collection.readings[0].sum_points().is_empty());
        assert!(collection.readings[1].histogram_points().is_empty());
        assert_eq!(collection.readings[2].gauge_points().len(), 1);
    }

    #[test]
    fn test_failing_callbacks_are_isolated() {
        let registry = MetricRegistry::new("test");
        registry
            .observable_gauge("broken", "1", "", || -> ObserveResult {
                Err(ObserveError::Unavailable("store offline".into()))
            })
            .unwrap();
        registry
            .observable_gauge("panicky", "1", "", || -> ObserveResult {
                panic!("callback exploded")
            })
            .unwrap();
        registry
            .observable_gauge("healthy", "1", "", || -> ObserveResult {
                Ok(vec![Observation::new(1, Attributes::new())])
            })
            .unwrap();

        let collection = registry.collect();
        assert_eq!(collection.readings.len(), 1);
        assert_eq!(collection.readings[0].name(), "healthy");
        assert_eq!(collection.failures.len(), 2);
        assert_eq!(collection.failures[0].instrument, "broken");
        assert_eq!(
            collection.failures[1].error,
            ObserveError::Panicked("callback exploded".into())
        );
    }
}
