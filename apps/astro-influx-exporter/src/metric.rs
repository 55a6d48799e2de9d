use crate::point::{FieldValue, Point, Precision};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tag,
    Field,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricEntity {
    pub kind: EntityKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl MetricEntity {
    fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// A user-defined point, e.g. a note dropped in from an imaging sequence.
#[derive(Clone, Debug, Deserialize)]
pub struct CustomMetric {
    pub measurement: String,
    #[serde(default)]
    pub entities: Vec<MetricEntity>,
}

/// Numbers first, then booleans, otherwise the raw text.
pub fn parse_field_value(raw: &str) -> FieldValue {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<f64>() {
        if number.is_finite() {
            return FieldValue::Float(number);
        }
    }
    if raw.eq_ignore_ascii_case("true") {
        return FieldValue::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return FieldValue::Boolean(false);
    }
    FieldValue::String(raw.to_string())
}

impl CustomMetric {
    /// Problems that stop the metric from being written. Incomplete
    /// entities are not among them; they are skipped by [`Self::to_point`].
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.measurement.trim().is_empty() {
            issues.push("Measurement name must be set".to_string());
        }
        if self.entities.is_empty() {
            issues.push("At least one measurement entity must be defined".to_string());
        } else if !self
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Field && e.is_usable())
        {
            issues.push("At least one field entity with a name and value is required".to_string());
        }
        issues
    }

    /// Entities missing a name or a value.
    pub fn incomplete_entities(&self) -> usize {
        self.entities.iter().filter(|e| !e.is_usable()).count()
    }

    /// Builds the point, skipping incomplete entities. Fails when nothing
    /// writable is left.
    pub fn to_point(&self, now: DateTime<Utc>) -> Result<Point> {
        let measurement = self.measurement.trim();
        if measurement.is_empty() {
            bail!("custom metric has no measurement name");
        }

        let mut point = Point::new(measurement).timestamp(now, Precision::Nanoseconds);
        let mut fields = 0;
        for entity in self.entities.iter().filter(|e| e.is_usable()) {
            let name = entity.name.trim();
            match entity.kind {
                EntityKind::Tag => point.insert_tag(name, entity.value.trim()),
                EntityKind::Field => {
                    point = point.field(name, parse_field_value(&entity.value));
                    fields += 1;
                }
            }
        }
        if fields == 0 {
            bail!("custom metric {measurement} has no usable field");
        }
        Ok(point)
    }
}
