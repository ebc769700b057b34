//! Request spans and the queue that holds them until export.
//!
//! # Responsibilities
//! - Create one span per request with trace and span identifiers
//! - Let handlers attach attributes while the span is open
//! - Close each span exactly once and queue it for the exporter
//!
//! # Design Decisions
//! - `ActiveSpan` is a guard: dropping it without `end()` still closes the
//!   span, marked `abandoned` with error status
//! - Attribute writes after close are ignored, so a queued span never changes
//! - The queue is bounded; overflow drops the newest span and counts it

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::instruments::{AttributeValue, Attributes};
use crate::observability::metrics;
use crate::sync::lock;

/// 128-bit trace identifier, rendered as 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

/// 64-bit span identifier, rendered as 16 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl TraceId {
    fn random() -> Self {
        Self(Uuid::new_v4().as_u128())
    }
}

impl SpanId {
    fn random() -> Self {
        Self(fastrand::u64(1..))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error,
}

/// A closed span. Immutable once queued.
#[derive(Debug, Clone, Serialize)]
pub struct FinishedSpan {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub name: String,
    pub attributes: Attributes,
    #[serde(serialize_with = "serialize_unix_nanos")]
    pub start_time: SystemTime,
    #[serde(serialize_with = "serialize_unix_nanos")]
    pub end_time: SystemTime,
    pub status: SpanStatus,
}

impl FinishedSpan {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

pub(crate) fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

pub(crate) fn serialize_unix_nanos<S: Serializer>(
    time: &SystemTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(unix_nanos(*time))
}

/// Bounded buffer of finished spans awaiting export.
#[derive(Debug)]
pub struct SpanQueue {
    spans: Mutex<Vec<FinishedSpan>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl SpanQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            spans: Mutex::new(Vec::new()),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a span. Returns `false` if the queue was full and the span was
    /// dropped.
    pub fn push(&self, span: FinishedSpan) -> bool {
        let mut spans = lock(&self.spans);
        if spans.len() >= self.capacity {
            drop(spans);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_span_dropped();
            return false;
        }
        spans.push(span);
        true
    }

    /// Take every queued span.
    pub fn drain(&self) -> Vec<FinishedSpan> {
        std::mem::take(&mut *lock(&self.spans))
    }

    pub fn len(&self) -> usize {
        lock(&self.spans).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spans dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Creates spans that report into a [`SpanQueue`].
#[derive(Debug, Clone)]
pub struct Tracer {
    queue: Arc<SpanQueue>,
}

impl Tracer {
    pub fn new(queue: Arc<SpanQueue>) -> Self {
        Self { queue }
    }

    /// Open a new root span.
    pub fn start(&self, name: impl Into<String>) -> ActiveSpan {
        ActiveSpan {
            inner: Arc::new(SpanCell {
                trace_id: TraceId::random(),
                span_id: SpanId::random(),
                name: name.into(),
                start_time: SystemTime::now(),
                open: Mutex::new(Some(OpenState {
                    attributes: Attributes::new(),
                    status: SpanStatus::Unset,
                })),
                queue: self.queue.clone(),
            }),
        }
    }
}

#[derive(Debug)]
struct SpanCell {
    trace_id: TraceId,
    span_id: SpanId,
    name: String,
    start_time: SystemTime,
    // `None` once closed.
    open: Mutex<Option<OpenState>>,
    queue: Arc<SpanQueue>,
}

#[derive(Debug)]
struct OpenState {
    attributes: Attributes,
    status: SpanStatus,
}

impl SpanCell {
    fn set_attribute(&self, key: String, value: AttributeValue) -> bool {
        match lock(&self.open).as_mut() {
            Some(state) => {
                state.attributes.insert(key, value);
                true
            }
            None => false,
        }
    }

    fn set_status(&self, status: SpanStatus) {
        if let Some(state) = lock(&self.open).as_mut() {
            state.status = status;
        }
    }

    /// Close the span if it is still open. Only the first call has any effect.
    fn close(&self, abandoned: bool) -> bool {
        let Some(mut state) = lock(&self.open).take() else {
            return false;
        };
        if abandoned {
            state.attributes.insert("abandoned", true);
            state.status = SpanStatus::Error;
        }
        self.queue.push(FinishedSpan {
            trace_id: self.trace_id,
            span_id: self.span_id,
            name: self.name.clone(),
            attributes: state.attributes,
            start_time: self.start_time,
            end_time: SystemTime::now(),
            status: state.status,
        });
        true
    }
}

/// Owning guard for an open span.
///
/// Call [`end`](Self::end) on the normal path. If the guard is dropped
/// first (the request future was cancelled), the span is closed as abandoned.
#[derive(Debug)]
pub struct ActiveSpan {
    inner: Arc<SpanCell>,
}

impl ActiveSpan {
    pub fn trace_id(&self) -> TraceId {
        self.inner.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.inner.span_id
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.inner.set_attribute(key.into(), value.into());
    }

    pub fn set_status(&self, status: SpanStatus) {
        self.inner.set_status(status);
    }

    /// A non-owning handle that code further down the request can use to
    /// add attributes.
    pub fn handle(&self) -> SpanHandle {
        SpanHandle {
            inner: self.inner.clone(),
        }
    }

    /// Close the span and queue it for export.
    pub fn end(self) {
        self.inner.close(false);
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        if self.inner.close(true) {
            tracing::debug!(span = %self.inner.name, "Span abandoned before completion");
        }
    }
}

/// Attribute-only access to a span owned by someone else.
#[derive(Debug, Clone)]
pub struct SpanHandle {
    inner: Arc<SpanCell>,
}

impl SpanHandle {
    /// Attach an attribute. Returns `false` if the span is already closed.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> bool {
        self.inner.set_attribute(key.into(), value.into())
    }

    pub fn trace_id(&self) -> TraceId {
        self.inner.trace_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracer(capacity: usize) -> (Tracer, Arc<SpanQueue>) {
        let queue = Arc::new(SpanQueue::new(capacity));
        (Tracer::new(queue.clone()), queue)
    }

    #[test]
    fn test_end_queues_exactly_once() {
        let (tracer, queue) = tracer(16);
        let span = tracer.start("GET /health");
        span.set_attribute("http.method", "GET");
        span.set_status(SpanStatus::Ok);
        let handle = span.handle();
        span.end();

        let spans = queue.drain();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "GET /health");
        assert_eq!(spans[0].status, SpanStatus::Ok);
        assert!(spans[0].end_time >= spans[0].start_time);
        assert!(spans[0].attribute("abandoned").is_none());

        // Writes after close are ignored.
        assert!(!handle.set_attribute("late", true));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drop_closes_as_abandoned() {
        let (tracer, queue) = tracer(16);
        {
            let span = tracer.start("GET /slow");
            span.set_attribute("http.route", "/slow");
        }
        let spans = queue.drain();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(spans[0].attribute("abandoned"), Some(&AttributeValue::Bool(true)));
        assert_eq!(
            spans[0].attribute("http.route"),
            Some(&AttributeValue::String("/slow".into()))
        );
    }

    #[test]
    fn test_queue_overflow_drops_newest() {
        let (tracer, queue) = tracer(2);
        for i in 0..3 {
            tracer.start(format!("span-{i}")).end();
        }
        assert_eq!(queue.dropped(), 1);
        let names: Vec<_> = queue.drain().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["span-0", "span-1"]);
    }

    #[test]
    fn test_ids_render_as_hex() {
        let (tracer, _queue) = tracer(1);
        let span = tracer.start("x");
        assert_eq!(span.trace_id().to_string().len(), 32);
        assert_eq!(span.span_id().to_string().len(), 16);
        let json = serde_json::to_value(span.trace_id()).unwrap();
        assert!(json.is_string());
    }
}
