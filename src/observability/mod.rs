//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request middleware:
//!     → trace.rs (ActiveSpan per request → SpanQueue)
//!
//! Export scheduler:
//!     → trace.rs (SpanQueue::drain)
//!
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (pipeline self-metrics, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Business telemetry (spans, instruments) is pushed to the sink;
//!   pipeline health is pulled by Prometheus
//! - Structured logging (JSON) for machine parsing

pub mod logging;
pub mod metrics;
pub mod trace;

pub use trace::{ActiveSpan, FinishedSpan, SpanHandle, SpanId, SpanQueue, SpanStatus, TraceId, Tracer};
