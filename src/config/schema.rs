//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity, reported as telemetry resource attributes.
    pub service: ServiceIdentity,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Telemetry export settings.
    pub exporter: ExporterConfig,

    /// Logging and self-metrics settings.
    pub observability: ObservabilityConfig,

    /// Outcome probabilities for the `/error` endpoint.
    pub simulation: SimulationConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceIdentity {
    /// Service name (`service.name`).
    pub name: String,

    /// Service version (`service.version`).
    pub version: String,

    /// Deployment environment (`environment`).
    pub environment: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "cart-telemetry".to_string(),
            version: "1.0.0".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Which sink receives exported telemetry.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// JSON over HTTP to the collector endpoint.
    Http,
    /// Summaries written to the log.
    Log,
}

/// Telemetry export configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    pub kind: ExporterKind,

    /// Collector address (`host:port`, scheme chosen by `insecure`).
    pub endpoint: String,

    /// Use plain HTTP instead of HTTPS.
    pub insecure: bool,

    /// Export interval in seconds.
    pub interval_secs: u64,

    /// Per-push timeout in seconds.
    pub timeout_secs: u64,

    /// Unsent batches kept for retry before the oldest is dropped.
    pub max_pending_batches: usize,

    /// Finished spans buffered between exports.
    pub max_queued_spans: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            kind: ExporterKind::Http,
            endpoint: "localhost:4318".to_string(),
            insecure: true,
            interval_secs: 10,
            timeout_secs: 5,
            max_pending_batches: 16,
            max_queued_spans: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus self-metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// `/error` endpoint behaviour.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Probability of answering 500.
    pub server_error_rate: f32,

    /// Probability of answering 400 when no 500 was drawn.
    pub client_error_rate: f32,

    /// Fixed seed for reproducible outcomes.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            server_error_rate: 0.3,
            client_error_rate: 0.2,
            seed: None,
        }
    }
}
