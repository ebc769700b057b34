//! Bucketed histogram of non-negative floating point values.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::instruments::attributes::Attributes;
use crate::instruments::data::{HistogramPoint, InstrumentDescriptor};
use crate::sync::lock;

/// Default bucket upper bounds, in seconds, for request latencies.
pub const DEFAULT_LATENCY_BOUNDARIES: &[f64] =
    &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Handle to a registered histogram. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Histogram {
    inner: Arc<HistogramState>,
}

#[derive(Debug)]
pub(crate) struct HistogramState {
    descriptor: InstrumentDescriptor,
    boundaries: Vec<f64>,
    cells: DashMap<Attributes, Mutex<HistogramCell>>,
}

#[derive(Debug)]
struct HistogramCell {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    bucket_counts: Vec<u64>,
}

impl HistogramCell {
    fn new(buckets: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            bucket_counts: vec![0; buckets],
        }
    }

    fn record(&mut self, bucket: usize, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.bucket_counts[bucket] += 1;
    }
}

impl Histogram {
    pub(crate) fn new(
        descriptor: InstrumentDescriptor,
        boundaries: Vec<f64>,
    ) -> (Self, Arc<HistogramState>) {
        let inner = Arc::new(HistogramState {
            descriptor,
            boundaries,
            cells: DashMap::new(),
        });
        (
            Self {
                inner: inner.clone(),
            },
            inner,
        )
    }

    /// Record `value` into the series identified by `attributes`.
    ///
    /// Negative, NaN and infinite values are dropped.
    pub fn record(&self, value: f64, attributes: &Attributes) {
        if !value.is_finite() || value < 0.0 {
            tracing::debug!(
                instrument = %self.inner.descriptor.name,
                value,
                "Dropping histogram value outside [0, inf)"
            );
            return;
        }

        // Buckets are upper-inclusive: a value equal to a boundary lands in
        // that boundary's bucket.
        let bucket = self.inner.boundaries.partition_point(|bound| *bound < value);
        let buckets = self.inner.boundaries.len() + 1;

        if let Some(cell) = self.inner.cells.get(attributes) {
            lock(cell.value()).record(bucket, value);
            return;
        }
        let cell = self
            .inner
            .cells
            .entry(attributes.clone())
            .or_insert_with(|| Mutex::new(HistogramCell::new(buckets)));
        lock(cell.value()).record(bucket, value);
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.inner.descriptor
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.inner.boundaries
    }
}

impl HistogramState {
    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Take every series' distribution since the last collection, resetting
    /// the cells. Series with no new values are skipped.
    pub(crate) fn collect(&self) -> Vec<HistogramPoint> {
        let buckets = self.boundaries.len() + 1;
        self.cells
            .iter()
            .filter_map(|cell| {
                let taken = {
                    let mut guard = lock(cell.value());
                    if guard.count == 0 {
                        return None;
                    }
                    std::mem::replace(&mut *guard, HistogramCell::new(buckets))
                };
                Some(HistogramPoint {
                    attributes: cell.key().clone(),
                    count: taken.count,
                    sum: taken.sum,
                    min: taken.min,
                    max: taken.max,
                    boundaries: self.boundaries.clone(),
                    bucket_counts: taken.bucket_counts,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::data::InstrumentKind;

    fn histogram(boundaries: &[f64]) -> (Histogram, Arc<HistogramState>) {
        Histogram::new(
            InstrumentDescriptor {
                name: "latency".into(),
                unit: "s".into(),
                description: "test".into(),
                kind: InstrumentKind::Histogram,
            },
            boundaries.to_vec(),
        )
    }

    #[test]
    fn test_bucket_placement() {
        let (hist, state) = histogram(&[1.0, 5.0]);
        assert_eq!(hist.boundaries(), &[1.0, 5.0]);
        let attrs = Attributes::new();

        for value in [0.0, 1.0, 1.5, 5.0, 7.0, 100.0] {
            hist.record(value, &attrs);
        }

        let points = state.collect();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.count, 6);
        assert_eq!(point.bucket_counts, vec![2, 2, 2]);
        assert_eq!(point.min, 0.0);
        assert_eq!(point.max, 100.0);
        assert!((point.sum - 114.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_values_dropped() {
        let (hist, state) = histogram(DEFAULT_LATENCY_BOUNDARIES);
        let attrs = Attributes::new().with("endpoint", "/x");

        hist.record(-0.1, &attrs);
        hist.record(f64::NAN, &attrs);
        hist.record(f64::INFINITY, &attrs);
        assert!(state.collect().is_empty());

        hist.record(0.02, &attrs);
        let points = state.collect();
        assert_eq!(points[0].count, 1);
        assert_eq!(points[0].bucket_counts[2], 1);
        assert_eq!(points[0].bucket_counts.len(), DEFAULT_LATENCY_BOUNDARIES.len() + 1);
    }

    #[test]
    fn test_collect_resets_series() {
        let (hist, state) = histogram(&[1.0]);
        let attrs = Attributes::new();
        hist.record(0.5, &attrs);
        assert_eq!(state.collect().len(), 1);
        assert!(state.collect().is_empty());

        hist.record(2.0, &attrs);
        let points = state.collect();
        assert_eq!(points[0].count, 1);
        assert_eq!(points[0].min, 2.0);
        assert_eq!(points[0].bucket_counts, vec![0, 1]);
    }
}
