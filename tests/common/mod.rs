//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower::ServiceExt;

use cart_telemetry::config::ServiceConfig;
use cart_telemetry::export::{ExportScheduler, MemorySink};
use cart_telemetry::http::{ErrorSimulator, HttpServer};
use cart_telemetry::lifecycle::Services;

/// Service wired to an in-memory sink.
pub struct TestApp {
    pub config: ServiceConfig,
    pub services: Services,
    pub sink: Arc<MemorySink>,
    pub router: Router,
}

impl TestApp {
    pub fn scheduler(&self) -> ExportScheduler {
        self.services.export_scheduler(&self.config.exporter)
    }
}

/// Build the app. `draws` feeds the `/error` endpoint in order, cycling.
pub fn spawn_app(draws: Vec<f64>) -> TestApp {
    let config = ServiceConfig::default();
    let sink = Arc::new(MemorySink::new());
    let services = Services::with_sink(&config, sink.clone())
        .unwrap()
        .with_simulator(fixed_simulator(&config, draws));
    let router = HttpServer::new(&config, &services).router();
    TestApp {
        config,
        services,
        sink,
        router,
    }
}

pub fn fixed_simulator(config: &ServiceConfig, draws: Vec<f64>) -> ErrorSimulator {
    let next = AtomicUsize::new(0);
    ErrorSimulator::with_source(&config.simulation, move || {
        if draws.is_empty() {
            return 1.0;
        }
        draws[next.fetch_add(1, Ordering::SeqCst) % draws.len()]
    })
}

/// Issue a GET through the router in-process.
pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A collector that stores every posted JSON body and answers with the
/// currently configured status.
#[derive(Clone, Default)]
pub struct MockCollector {
    pub received: Arc<Mutex<Vec<serde_json::Value>>>,
    pub status: Arc<AtomicU16>,
}

impl MockCollector {
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<serde_json::Value> {
        self.received.lock().unwrap().clone()
    }
}

pub async fn start_mock_collector() -> (SocketAddr, MockCollector) {
    let collector = MockCollector::default();
    collector.set_status(200);

    async fn accept(
        State(collector): State<MockCollector>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        collector.received.lock().unwrap().push(body);
        StatusCode::from_u16(collector.status.load(Ordering::SeqCst))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    let router = Router::new()
        .route("/v1/telemetry", post(accept))
        .with_state(collector.clone());
    (serve(router).await, collector)
}
