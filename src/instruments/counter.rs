//! Monotonic integer counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::instruments::attributes::Attributes;
use crate::instruments::data::{InstrumentDescriptor, SumPoint};

/// Handle to a registered counter. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Counter {
    inner: Arc<CounterState>,
}

#[derive(Debug)]
pub(crate) struct CounterState {
    descriptor: InstrumentDescriptor,
    cells: DashMap<Attributes, AtomicU64>,
}

impl Counter {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> (Self, Arc<CounterState>) {
        let inner = Arc::new(CounterState {
            descriptor,
            cells: DashMap::new(),
        });
        (
            Self {
                inner: inner.clone(),
            },
            inner,
        )
    }

    /// Add `delta` to the series identified by `attributes`.
    ///
    /// The delta is unsigned, so a decrement cannot be expressed at all.
    /// A zero delta is a no-op.
    pub fn add(&self, delta: u64, attributes: &Attributes) {
        if delta == 0 {
            return;
        }
        if let Some(cell) = self.inner.cells.get(attributes) {
            cell.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        self.inner
            .cells
            .entry(attributes.clone())
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.inner.descriptor
    }
}

impl CounterState {
    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Take every series' delta since the last collection.
    ///
    /// The swap is atomic, so increments racing with collection land either
    /// in this delta or the next one.
    pub(crate) fn collect(&self) -> Vec<SumPoint> {
        self.cells
            .iter()
            .filter_map(|cell| {
                let delta = cell.value().swap(0, Ordering::Relaxed);
                (delta > 0).then(|| SumPoint {
                    attributes: cell.key().clone(),
                    delta,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::data::InstrumentKind;
    use std::thread;

    fn counter() -> (Counter, Arc<CounterState>) {
        Counter::new(InstrumentDescriptor {
            name: "test_total".into(),
            unit: "1".into(),
            description: "test".into(),
            kind: InstrumentKind::Counter,
        })
    }

    #[test]
    fn test_collect_returns_deltas() {
        let (counter, state) = counter();
        let get = Attributes::new().with("method", "GET");
        let post = Attributes::new().with("method", "POST");

        counter.add(2, &get);
        counter.add(3, &get);
        counter.add(1, &post);
        counter.add(0, &post);

        let mut points = state.collect();
        points.sort_by_key(|p| p.delta);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].delta, 1);
        assert_eq!(points[1].delta, 5);
        assert_eq!(points[1].attributes, get);

        // Nothing new since last collection.
        assert!(state.collect().is_empty());

        counter.add(4, &get);
        let points = state.collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].delta, 4);
    }

    #[test]
    fn test_no_increment_lost_during_collection() {
        let (counter, state) = counter();
        let attrs = Attributes::new().with("endpoint", "/health");
        let writers = 4;
        let per_writer = 10_000u64;

        let collected: u64 = thread::scope(|scope| {
            for _ in 0..writers {
                let counter = counter.clone();
                let attrs = attrs.clone();
                scope.spawn(move || {
                    for _ in 0..per_writer {
                        counter.add(1, &attrs);
                    }
                });
            }
            let collector = scope.spawn(|| {
                let mut total = 0;
                for _ in 0..100 {
                    total += state.collect().iter().map(|p| p.delta).sum::<u64>();
                }
                total
            });
            collector.join().unwrap()
        });

        let rest: u64 = state.collect().iter().map(|p| p.delta).sum();
        assert_eq!(collected + rest, writers * per_writer);
    }
}
