//! Observable gauge, sampled through a callback at collection time.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::instruments::attributes::Attributes;
use crate::instruments::data::{GaugePoint, InstrumentDescriptor};

/// A single value reported by an [`Observable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub value: i64,
    pub attributes: Attributes,
}

impl Observation {
    pub fn new(value: i64, attributes: Attributes) -> Self {
        Self { value, attributes }
    }
}

/// Errors raised while sampling an observable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    /// The callback could not read its source.
    #[error("observation source unavailable: {0}")]
    Unavailable(String),

    /// The callback panicked.
    #[error("observable callback panicked: {0}")]
    Panicked(String),
}

pub type ObserveResult = Result<Vec<Observation>, ObserveError>;

/// Source of gauge values, sampled once per export cycle.
pub trait Observable: Send + Sync {
    fn sample(&self) -> ObserveResult;
}

impl<F> Observable for F
where
    F: Fn() -> ObserveResult + Send + Sync,
{
    fn sample(&self) -> ObserveResult {
        self()
    }
}

/// Handle to a registered observable gauge.
///
/// The gauge holds no values of its own; it only identifies the callback
/// the registry will sample.
#[derive(Clone)]
pub struct ObservableGauge {
    inner: Arc<GaugeState>,
}

pub(crate) struct GaugeState {
    descriptor: InstrumentDescriptor,
    callback: Box<dyn Observable>,
}

impl ObservableGauge {
    pub(crate) fn new(
        descriptor: InstrumentDescriptor,
        callback: Box<dyn Observable>,
    ) -> (Self, Arc<GaugeState>) {
        let inner = Arc::new(GaugeState {
            descriptor,
            callback,
        });
        (
            Self {
                inner: inner.clone(),
            },
            inner,
        )
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.inner.descriptor
    }
}

impl std::fmt::Debug for ObservableGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableGauge")
            .field("descriptor", &self.inner.descriptor)
            .finish()
    }
}

impl GaugeState {
    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Run the callback, converting a panic into [`ObserveError::Panicked`].
    pub(crate) fn observe(&self) -> Result<Vec<GaugePoint>, ObserveError> {
        let observations = panic::catch_unwind(AssertUnwindSafe(|| self.callback.sample()))
            .map_err(|payload| ObserveError::Panicked(panic_message(payload.as_ref())))??;

        Ok(observations
            .into_iter()
            .map(|o| GaugePoint {
                attributes: o.attributes,
                value: o.value,
            })
            .collect())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
