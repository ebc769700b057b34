//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the service endpoints
//! - Wrap every endpoint with the instrumentation middleware
//! - Bound each instrumented request by the configured timeout
//! - Wire up outer middleware (access log, request ID)
//! - Serve until the shutdown signal, then drain

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handlers::{self, AppState};
use crate::http::middleware::{instrument_request, Instrumentation};
use crate::lifecycle::startup::Services;

/// Routes served, all instrumented.
pub const ENDPOINTS: [&str; 5] = ["/health", "/error", "/cart/add", "/cart/remove", "/cart/get"];

/// HTTP server for the cart service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServiceConfig, services: &Services) -> Self {
        let router = build_router(
            services.app_state(),
            services.instrumentation(),
            Duration::from_secs(config.timeouts.request_secs),
        );
        Self { router }
    }

    /// The fully layered router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then wait for in-flight
    /// requests to finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, endpoints = ?ENDPOINTS, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
///
/// Layers, outermost first: access log, request ID, then per route the
/// instrumentation and the timeout.
pub fn build_router(
    state: AppState,
    instrumentation: Instrumentation,
    request_timeout: Duration,
) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/error", get(handlers::error))
        .route("/cart/add", get(handlers::add_to_cart))
        .route("/cart/remove", get(handlers::remove_from_cart))
        .route("/cart/get", get(handlers::get_cart));

    instrument_routes(routes, instrumentation, request_timeout)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Wrap every route of `routes` with the request timeout and, around it, the
/// instrumentation middleware, so a timed-out request is measured as a 408.
#[allow(deprecated)]
pub fn instrument_routes<S>(
    routes: Router<S>,
    instrumentation: Instrumentation,
    request_timeout: Duration,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .route_layer(TimeoutLayer::new(request_timeout))
        .route_layer(middleware::from_fn_with_state(
            instrumentation,
            instrument_request,
        ))
}
