//! Sink abstraction and selection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture};
use thiserror::Error;

use crate::config::{ExporterConfig, ExporterKind};
use crate::export::batch::ExportBatch;
use crate::export::http_sink::HttpSink;
use crate::export::log_sink::LogSink;

/// Errors returned by a sink push.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink could not be reached.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The sink answered but refused the batch.
    #[error("sink rejected batch with status {status}")]
    Rejected { status: u16 },

    /// The push did not finish in time.
    #[error("export timed out after {0:?}")]
    Timeout(Duration),

    /// The batch could not be encoded.
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for exported telemetry.
///
/// Implementations do their own I/O; the scheduler only enforces a timeout
/// around each call.
pub trait TelemetrySink: Send + Sync {
    fn name(&self) -> &'static str;

    fn export<'a>(&'a self, batch: &'a ExportBatch) -> BoxFuture<'a, Result<(), SinkError>>;

    /// Release sink resources after the final flush.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(future::ready(Ok(())))
    }
}

/// Build the sink selected by `config.kind`.
pub fn build_sink(config: &ExporterConfig) -> Result<Arc<dyn TelemetrySink>, SinkError> {
    Ok(match config.kind {
        ExporterKind::Http => Arc::new(HttpSink::new(config)?),
        ExporterKind::Log => Arc::new(LogSink),
    })
}
