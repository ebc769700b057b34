//! Per-request span and metric recording.
//!
//! # Responsibilities
//! - Open one span per request and expose it to handlers
//! - Record latency for every completed request
//! - Count requests that end with status >= 400
//! - Turn a handler panic into a 500 that is still measured
//!
//! # Design Decisions
//! - Metric attributes are `method`, `endpoint` (request path) and
//!   `status_code`; span attributes follow the `http.*` naming
//! - The request timeout sits inside this middleware, so a timed-out request
//!   is recorded as a 408
//! - A request whose future is dropped (client gone) closes its span as
//!   abandoned and records no metrics

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::instruments::gauge::panic_message;
use crate::instruments::{AttributeValue, Attributes, Counter, Histogram, MetricRegistry, RegistryError};
use crate::observability::trace::{SpanHandle, SpanStatus, Tracer};

pub const ERROR_COUNTER: &str = "http_errors_total";
pub const LATENCY_HISTOGRAM: &str = "http_request_duration_seconds";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Final status and duration of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: u16,
    pub elapsed: Duration,
}

impl RequestOutcome {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Instruments written on every request.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    errors: Counter,
    latency: Histogram,
}

impl RequestMetrics {
    pub fn register(registry: &MetricRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            errors: registry.counter(ERROR_COUNTER, "1", "Total number of HTTP error requests")?,
            latency: registry.histogram(LATENCY_HISTOGRAM, "s", "HTTP request latency in seconds")?,
        })
    }

    /// Record one finished request. Returns the attributes used.
    pub fn record(&self, method: &str, endpoint: &str, outcome: RequestOutcome) -> Attributes {
        let attributes = Attributes::new()
            .with("method", method)
            .with("endpoint", endpoint)
            .with("status_code", outcome.status);
        self.latency.record(outcome.elapsed.as_secs_f64(), &attributes);
        if outcome.is_error() {
            self.errors.add(1, &attributes);
        }
        attributes
    }
}

/// State for [`instrument_request`].
#[derive(Debug, Clone)]
pub struct Instrumentation {
    tracer: Tracer,
    metrics: RequestMetrics,
}

impl Instrumentation {
    pub fn new(tracer: Tracer, metrics: RequestMetrics) -> Self {
        Self { tracer, metrics }
    }
}

/// Axum middleware wrapping a route with a span and request metrics.
///
/// Install with `axum::middleware::from_fn_with_state` as a route layer so
/// [`MatchedPath`] is available.
pub async fn instrument_request(
    State(instrumentation): State<Instrumentation>,
    mut req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let span = instrumentation.tracer.start(format!("{} {}", method, path));
    span.set_attribute("http.method", method.as_str());
    span.set_attribute("http.url", req.uri().to_string());
    span.set_attribute("http.route", route);
    if let Some(request_id) = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        span.set_attribute("http.request_id", request_id);
    }
    req.extensions_mut().insert(span.handle());

    let start = Instant::now();
    let response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(method = %method, path = %path, panic = %message, "Handler panicked");
            span.set_attribute("panic.message", message);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };
    let outcome = RequestOutcome {
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
    };

    span.set_attribute("http.status_code", outcome.status);
    instrumentation.metrics.record(&method, &path, outcome);
    if outcome.is_error() {
        span.set_attribute("error", true);
        span.set_status(SpanStatus::Error);
    } else {
        span.set_status(SpanStatus::Ok);
    }

    tracing::debug!(
        method = %method,
        path = %path,
        status = outcome.status,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        trace_id = %span.trace_id(),
        "Request instrumented"
    );
    span.end();
    response
}

/// The request span, if the route is instrumented.
#[derive(Debug, Clone, Default)]
pub struct CurrentSpan(pub Option<SpanHandle>);

impl CurrentSpan {
    pub fn set(&self, key: &str, value: impl Into<AttributeValue>) {
        if let Some(span) = &self.0 {
            span.set_attribute(key, value);
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSpan {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSpan(parts.extensions.get::<SpanHandle>().cloned()))
    }
}
