//! Declarative per-metric schemas shared by every device category.
//!
//! A category lists its metrics as data (`Metric { measurement, read }`); the
//! generic builder here owns the connection gate, the shared timestamp and the
//! sentinel substitution so no category repeats that logic.

use crate::point::{FieldValue, Point, Precision};
use chrono::{DateTime, Utc};

/// Written in place of a missing or non-finite float reading.
pub const SENTINEL_FLOAT: f64 = -1.0;
/// Written in place of a missing or negative integer-like reading.
pub const SENTINEL_INT: i64 = -1;

/// A raw reading pulled off a snapshot before sanitisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reading {
    Float(Option<f64>),
    Count(Option<i64>),
    /// A float-typed source that is recorded as an integer (battery percent).
    Whole(Option<f64>),
}

impl Reading {
    pub fn sanitize(self) -> FieldValue {
        match self {
            Reading::Float(value) => FieldValue::Float(sanitize_float(value)),
            Reading::Count(value) => FieldValue::Integer(sanitize_count(value)),
            Reading::Whole(value) => FieldValue::Integer(sanitize_whole(value)),
        }
    }
}

pub fn sanitize_float(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => SENTINEL_FLOAT,
    }
}

pub fn sanitize_count(value: Option<i64>) -> i64 {
    match value {
        Some(v) if v >= 0 => v,
        _ => SENTINEL_INT,
    }
}

pub fn sanitize_whole(value: Option<f64>) -> i64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 && v <= i64::MAX as f64 => v.round() as i64,
        _ => SENTINEL_INT,
    }
}

pub struct Metric<S> {
    pub measurement: &'static str,
    pub read: fn(&S) -> Reading,
}

/// Common surface of every device snapshot.
pub trait Snapshot {
    fn connected(&self) -> bool;
    fn device_name(&self) -> &str;
}

/// Builds one point per metric, all sharing `timestamp`. A disconnected
/// snapshot yields nothing.
pub fn build_snapshot_points<S: Snapshot>(
    snapshot: &S,
    metrics: &[Metric<S>],
    timestamp: DateTime<Utc>,
) -> Vec<Point> {
    if !snapshot.connected() {
        return Vec::new();
    }
    metrics
        .iter()
        .map(|metric| {
            Point::new(metric.measurement)
                .field("value", (metric.read)(snapshot).sanitize())
                .timestamp(timestamp, Precision::Nanoseconds)
        })
        .collect()
}
