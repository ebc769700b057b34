//! Periodic export worker.
//!
//! # Responsibilities
//! - Collect instruments and queued spans once per interval
//! - Push batches to the sink, oldest pending first
//! - Keep failed batches for the next cycle, bounded by `max_pending_batches`
//! - Run a final collection and flush on shutdown

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ExporterConfig;
use crate::export::batch::{ExportBatch, Resource};
use crate::export::sink::{SinkError, TelemetrySink};
use crate::instruments::MetricRegistry;
use crate::observability::metrics;
use crate::observability::trace::SpanQueue;

/// Errors surfaced by the scheduler.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Shutdown could not deliver everything that was collected.
    #[error("final flush failed with {pending} batch(es) unsent: {source}")]
    FinalFlush {
        pending: usize,
        #[source]
        source: SinkError,
    },
}

pub struct ExportScheduler {
    registry: Arc<MetricRegistry>,
    spans: Arc<SpanQueue>,
    sink: Arc<dyn TelemetrySink>,
    resource: Resource,
    interval: Duration,
    timeout: Duration,
    max_pending: usize,
    pending: VecDeque<ExportBatch>,
}

impl ExportScheduler {
    pub fn new(
        registry: Arc<MetricRegistry>,
        spans: Arc<SpanQueue>,
        sink: Arc<dyn TelemetrySink>,
        resource: Resource,
        config: &ExporterConfig,
    ) -> Self {
        Self {
            registry,
            spans,
            sink,
            resource,
            interval: Duration::from_secs(config.interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            max_pending: config.max_pending_batches.max(1),
            pending: VecDeque::new(),
        }
    }

    /// Batches collected but not yet accepted by the sink.
    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Build a batch from everything accumulated since the last call.
    pub fn collect(&self) -> ExportBatch {
        let collection = self.registry.collect();
        for failure in &collection.failures {
            tracing::warn!(
                instrument = %failure.instrument,
                error = %failure.error,
                "Gauge callback failed, reading skipped for this cycle"
            );
            metrics::record_callback_failure(&failure.instrument);
        }

        ExportBatch {
            resource: self.resource.clone(),
            scope: self.registry.scope().to_string(),
            collected_at: SystemTime::now(),
            spans: self.spans.drain(),
            metrics: collection.readings,
        }
    }

    /// Run one cycle: collect, then push pending batches in order.
    ///
    /// On failure the unsent batches stay queued for the next cycle.
    pub async fn export_once(&mut self) -> Result<(), SinkError> {
        let batch = self.collect();
        self.enqueue(batch);
        self.flush_pending().await
    }

    /// Tick every interval until `shutdown` fires, then flush.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ExportError> {
        tracing::info!(
            sink = self.sink.name(),
            interval_secs = self.interval.as_secs(),
            "Export scheduler starting"
        );

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.export_once().await {
                        tracing::warn!(
                            error = %e,
                            pending = self.pending.len(),
                            "Export failed, will retry next cycle"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Export scheduler received shutdown signal, flushing");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Final collection and flush, then release the sink.
    pub async fn shutdown(mut self) -> Result<(), ExportError> {
        if let Err(source) = self.export_once().await {
            let pending = self.pending.len();
            tracing::error!(error = %source, pending, "Final flush failed");
            return Err(ExportError::FinalFlush { pending, source });
        }
        self.sink.shutdown().await?;
        tracing::info!("Export scheduler stopped");
        Ok(())
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<Result<(), ExportError>> {
        tokio::spawn(self.run(shutdown))
    }

    fn enqueue(&mut self, batch: ExportBatch) {
        if self.pending.len() >= self.max_pending {
            if let Some(dropped) = self.pending.pop_front() {
                tracing::warn!(
                    spans = dropped.spans.len(),
                    points = dropped.point_count(),
                    "Pending export queue full, dropping oldest batch"
                );
                metrics::record_dropped_batch();
            }
        }
        self.pending.push_back(batch);
        metrics::record_pending_batches(self.pending.len());
    }

    async fn flush_pending(&mut self) -> Result<(), SinkError> {
        while let Some(batch) = self.pending.front() {
            let result = match time::timeout(self.timeout, self.sink.export(batch)).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(self.timeout)),
            };
            match result {
                Ok(()) => {
                    metrics::record_export("success");
                    self.pending.pop_front();
                }
                Err(e) => {
                    metrics::record_export(match &e {
                        SinkError::Timeout(_) => "timeout",
                        _ => "failure",
                    });
                    metrics::record_pending_batches(self.pending.len());
                    return Err(e);
                }
            }
        }
        metrics::record_pending_batches(0);
        Ok(())
    }
}
