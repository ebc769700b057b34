//! Sink that writes batch summaries to the log.

use futures_util::future::{self, BoxFuture};

use crate::export::batch::ExportBatch;
use crate::export::sink::{SinkError, TelemetrySink};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn export<'a>(&'a self, batch: &'a ExportBatch) -> BoxFuture<'a, Result<(), SinkError>> {
        tracing::info!(
            scope = %batch.scope,
            spans = batch.spans.len(),
            metrics = batch.metrics.len(),
            points = batch.point_count(),
            "Exported telemetry batch"
        );
        for reading in &batch.metrics {
            tracing::debug!(
                instrument = %reading.descriptor.name,
                unit = %reading.descriptor.unit,
                points = reading.data.point_count(),
                "Metric reading"
            );
        }
        for span in &batch.spans {
            tracing::debug!(
                trace_id = %span.trace_id,
                span_id = %span.span_id,
                name = %span.name,
                status = ?span.status,
                attributes = %span.attributes,
                "Span"
            );
        }
        Box::pin(future::ready(Ok(())))
    }
}
