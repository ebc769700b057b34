//! Middleware applied to the service routes.

pub mod instrumentation;

pub use instrumentation::{
    instrument_request, CurrentSpan, Instrumentation, RequestMetrics, RequestOutcome, ERROR_COUNTER,
    LATENCY_HISTOGRAM,
};
