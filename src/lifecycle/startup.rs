//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every shared service from the validated configuration
//! - Register the request instruments and the cart gauge
//! - Hand out the pieces the server and the export scheduler need
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Domain state is constructed here and passed by `Arc`, never global

use std::sync::Arc;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::cart::{register_cart_gauge, CartStore};
use crate::config::{ExporterConfig, ServiceConfig};
use crate::export::{build_sink, ExportScheduler, Resource, SinkError, TelemetrySink};
use crate::http::handlers::AppState;
use crate::http::middleware::{Instrumentation, RequestMetrics};
use crate::http::simulation::ErrorSimulator;
use crate::instruments::{MetricRegistry, ObservableGauge, RegistryError};
use crate::observability::trace::{SpanQueue, Tracer};

/// Errors that stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build telemetry sink: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to register instrument: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to start Prometheus endpoint: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Shared state for the server and the export scheduler.
pub struct Services {
    pub store: Arc<CartStore>,
    pub registry: Arc<MetricRegistry>,
    pub spans: Arc<SpanQueue>,
    pub tracer: Tracer,
    pub request_metrics: RequestMetrics,
    pub cart_gauge: ObservableGauge,
    pub simulator: Arc<ErrorSimulator>,
    pub sink: Arc<dyn TelemetrySink>,
    pub resource: Resource,
}

impl Services {
    /// Build services with the sink selected by `config.exporter.kind`.
    pub fn init(config: &ServiceConfig) -> Result<Self, StartupError> {
        let sink = build_sink(&config.exporter)?;
        Self::with_sink(config, sink)
    }

    /// Build services around a caller-supplied sink.
    pub fn with_sink(
        config: &ServiceConfig,
        sink: Arc<dyn TelemetrySink>,
    ) -> Result<Self, StartupError> {
        let store = Arc::new(CartStore::new());
        let registry = Arc::new(MetricRegistry::new(config.service.name.clone()));
        let spans = Arc::new(SpanQueue::new(config.exporter.max_queued_spans));
        let tracer = Tracer::new(spans.clone());
        let request_metrics = RequestMetrics::register(&registry)?;
        let cart_gauge = register_cart_gauge(&registry, store.clone())?;

        tracing::info!(
            service = %config.service.name,
            sink = sink.name(),
            instruments = registry.descriptors().len(),
            "Services initialized"
        );

        Ok(Self {
            store,
            registry,
            spans,
            tracer,
            request_metrics,
            cart_gauge,
            simulator: Arc::new(ErrorSimulator::from_config(&config.simulation)),
            sink,
            resource: Resource::from_identity(&config.service),
        })
    }

    /// Replace the `/error` outcome source.
    pub fn with_simulator(mut self, simulator: ErrorSimulator) -> Self {
        self.simulator = Arc::new(simulator);
        self
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            simulator: self.simulator.clone(),
        }
    }

    pub fn instrumentation(&self) -> Instrumentation {
        Instrumentation::new(self.tracer.clone(), self.request_metrics.clone())
    }

    pub fn export_scheduler(&self, config: &ExporterConfig) -> ExportScheduler {
        ExportScheduler::new(
            self.registry.clone(),
            self.spans.clone(),
            self.sink.clone(),
            self.resource.clone(),
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExporterKind;
    use crate::export::MemorySink;

    #[test]
    fn test_services_register_the_three_instruments() {
        let config = ServiceConfig::default();
        let services = Services::with_sink(&config, Arc::new(MemorySink::new())).unwrap();

        let mut names: Vec<String> = services
            .registry
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cart_items_count",
                "http_errors_total",
                "http_request_duration_seconds"
            ]
        );
        assert_eq!(services.registry.scope(), "cart-telemetry");
    }

    #[test]
    fn test_init_builds_configured_sink() {
        let mut config = ServiceConfig::default();
        config.exporter.kind = ExporterKind::Log;
        let services = Services::init(&config).unwrap();
        assert_eq!(services.sink.name(), "log");
    }
}
