//! Collected instrument data, as handed to the export path.

use serde::Serialize;

use crate::instruments::attributes::Attributes;

/// The three instrument kinds the registry can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Counter,
    Histogram,
    ObservableGauge,
}

/// Identity of an instrument. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub unit: String,
    pub description: String,
    pub kind: InstrumentKind,
}

/// Counter increase for one attribute set since the previous collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumPoint {
    pub attributes: Attributes,
    pub delta: u64,
}

/// Distribution of the values recorded for one attribute set since the
/// previous collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPoint {
    pub attributes: Attributes,
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    /// Upper bounds (inclusive) of every bucket but the last.
    pub boundaries: Vec<f64>,
    /// One more entry than `boundaries`; the last counts values above the
    /// highest boundary.
    pub bucket_counts: Vec<u64>,
}

/// A value produced by a gauge callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GaugePoint {
    pub attributes: Attributes,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "points", rename_all = "snake_case")]
pub enum MetricData {
    Sum(Vec<SumPoint>),
    Histogram(Vec<HistogramPoint>),
    Gauge(Vec<GaugePoint>),
}

impl MetricData {
    pub fn point_count(&self) -> usize {
        match self {
            MetricData::Sum(points) => points.len(),
            MetricData::Histogram(points) => points.len(),
            MetricData::Gauge(points) => points.len(),
        }
    }
}

/// One instrument's contribution to an export cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub descriptor: InstrumentDescriptor,
    pub data: MetricData,
}

impl MetricReading {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn sum_points(&self) -> &[SumPoint] {
        match &self.data {
            MetricData::Sum(points) => points,
            _ => &[],
        }
    }

    pub fn histogram_points(&self) -> &[HistogramPoint] {
        match &self.data {
            MetricData::Histogram(points) => points,
            _ => &[],
        }
    }

    pub fn gauge_points(&self) -> &[GaugePoint] {
        match &self.data {
            MetricData::Gauge(points) => points,
            _ => &[],
        }
    }
}
