//! The unit of data pushed to a sink.

use std::time::SystemTime;

use serde::Serialize;

use crate::config::ServiceIdentity;
use crate::instruments::{Attributes, MetricReading};
use crate::observability::trace::{serialize_unix_nanos, FinishedSpan};

/// Attributes describing the process that produced the telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub attributes: Attributes,
}

impl Resource {
    pub fn from_identity(identity: &ServiceIdentity) -> Self {
        Self {
            attributes: Attributes::new()
                .with("service.name", identity.name.as_str())
                .with("service.version", identity.version.as_str())
                .with("environment", identity.environment.as_str())
                .with("library.language", "rust"),
        }
    }
}

/// Everything collected in one export cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ExportBatch {
    pub resource: Resource,
    pub scope: String,
    #[serde(serialize_with = "serialize_unix_nanos")]
    pub collected_at: SystemTime,
    pub spans: Vec<FinishedSpan>,
    pub metrics: Vec<MetricReading>,
}

impl ExportBatch {
    pub fn metric(&self, name: &str) -> Option<&MetricReading> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    /// Total data points across all readings.
    pub fn point_count(&self) -> usize {
        self.metrics.iter().map(|m| m.data.point_count()).sum()
    }
}
