//! Telemetry export subsystem.
//!
//! # Data Flow
//! ```text
//! Every interval (scheduler.rs):
//!     MetricRegistry::collect + SpanQueue::drain
//!     → batch.rs (ExportBatch with Resource)
//!     → pending queue (bounded, oldest dropped first)
//!     → sink.rs (TelemetrySink::export, under timeout)
//!         → http_sink.rs (JSON POST to collector)
//!         → log_sink.rs (summary through tracing)
//!         → memory.rs (kept in process)
//!
//! Shutdown:
//!     broadcast signal → final collect → flush pending → sink shutdown
//! ```
//!
//! # Design Decisions
//! - Export runs on its own task; request handling never waits on a sink
//! - A failed push keeps its batch for the next cycle instead of losing it
//! - Only the final flush reports failure to the caller

pub mod batch;
pub mod http_sink;
pub mod log_sink;
pub mod memory;
pub mod scheduler;
pub mod sink;

pub use batch::{ExportBatch, Resource};
pub use http_sink::HttpSink;
pub use log_sink::LogSink;
pub use memory::MemorySink;
pub use scheduler::{ExportError, ExportScheduler};
pub use sink::{build_sink, SinkError, TelemetrySink};
