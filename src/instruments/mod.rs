//! Metric instruments and the registry that owns them.
//!
//! # Data Flow
//! ```text
//! Request path (many workers):
//!     Counter::add / Histogram::record
//!     → per-attribute-set cells (atomic / short mutex)
//!
//! Export path (one worker, every interval):
//!     MetricRegistry::collect
//!     → counters: swap deltas to zero
//!     → histograms: take and reset each cell
//!     → gauges: run Observable::sample now
//!     → Vec<MetricReading> + callback failures
//! ```
//!
//! # Design Decisions
//! - Delta temporality: each collection hands over what accumulated since
//!   the previous one
//! - Counters take `u64`, so a negative delta cannot be expressed
//! - Gauges are pull-only; nothing on the request path runs a callback
//! - A failing or panicking callback drops only its own reading

pub mod attributes;
pub mod counter;
pub mod data;
pub mod gauge;
pub mod histogram;
pub mod registry;

pub use attributes::{AttributeValue, Attributes};
pub use counter::Counter;
pub use data::{
    GaugePoint, HistogramPoint, InstrumentDescriptor, InstrumentKind, MetricData, MetricReading,
    SumPoint,
};
pub use gauge::{Observable, ObservableGauge, ObserveError, ObserveResult, Observation};
pub use histogram::{Histogram, DEFAULT_LATENCY_BOUNDARIES};
pub use registry::{CallbackFailure, Collection, MetricRegistry, RegistryError};
