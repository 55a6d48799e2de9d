use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Timestamp precision a point is recorded with. Points are always sent with
/// nanosecond timestamps, truncated to this precision first so two samples that
/// collide at the coarser precision still collide in the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Seconds,
    Milliseconds,
    Nanoseconds,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl FieldValue {
    /// Floats as written, integers with an `i` suffix, strings double-quoted
    /// with inner quotes and backslashes escaped.
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::String(v) => {
                let escaped = flatten_line_breaks(v)
                    .replace('\\', "\\\\")
                    .replace('"', "\\\"");
                format!("\"{escaped}\"")
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PointError {
    #[error("point has an empty measurement name")]
    EmptyMeasurement,
    #[error("point {measurement} has no fields")]
    NoFields { measurement: String },
    #[error("point {measurement} has a timestamp outside the encodable range")]
    TimestampOutOfRange { measurement: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
    precision: Precision,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
            precision: Precision::Nanoseconds,
        }
    }

    /// Adds a tag. Empty or whitespace-only values are ignored so absent
    /// metadata never shows up as an empty tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.insert_tag(key, value);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>, precision: Precision) -> Self {
        self.timestamp = timestamp;
        self.precision = precision;
        self
    }

    pub fn insert_tag(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return;
        }
        self.tags.insert(key.into(), value.to_string());
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Timestamp in nanoseconds since the epoch, truncated to the point's precision.
    pub fn timestamp_nanos(&self) -> Option<i64> {
        match self.precision {
            Precision::Seconds => self.timestamp.timestamp().checked_mul(1_000_000_000),
            Precision::Milliseconds => self.timestamp.timestamp_millis().checked_mul(1_000_000),
            Precision::Nanoseconds => self.timestamp.timestamp_nanos_opt(),
        }
    }

    /// Encodes the point as one line of InfluxDB line protocol.
    pub fn to_line_protocol(&self) -> Result<String, PointError> {
        if self.measurement.trim().is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if self.fields.is_empty() {
            return Err(PointError::NoFields {
                measurement: self.measurement.clone(),
            });
        }
        let nanos = self
            .timestamp_nanos()
            .ok_or_else(|| PointError::TimestampOutOfRange {
                measurement: self.measurement.clone(),
            })?;

        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_tag_key(key));
            line.push('=');
            line.push_str(&escape_tag_value(value));
        }

        line.push(' ');
        let mut first = true;
        for (key, value) in &self.fields {
            if !first {
                line.push(',');
            }
            first = false;
            line.push_str(&escape_field_key(key));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        let _ = write!(line, " {nanos}");
        Ok(line)
    }
}

/// Line protocol cannot carry raw line breaks anywhere in a point.
fn flatten_line_breaks(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

/// Spaces and commas are escaped with a backslash.
fn escape_measurement(s: &str) -> String {
    flatten_line_breaks(s).replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag_key(s: &str) -> String {
    flatten_line_breaks(s)
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_tag_value(s: &str) -> String {
    flatten_line_breaks(s)
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_field_key(s: &str) -> String {
    flatten_line_breaks(s)
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Encodes a batch, one point per line. Points that cannot be encoded are
/// skipped and reported back alongside the body.
pub fn encode_batch(points: &[Point]) -> (String, Vec<PointError>) {
    let mut body = String::new();
    let mut errors = Vec::new();
    for point in points {
        match point.to_line_protocol() {
            Ok(line) => {
                if !body.is_empty() {
                    body.push('\n');
                }
                body.push_str(&line);
            }
            Err(err) => errors.push(err),
        }
    }
    (body, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 123_456_789).single().expect("ts")
    }

    #[test]
    fn encodes_tags_sorted_and_typed_fields() {
        let point = Point::new("camera_cooler_power")
            .tag("profile_name", "Backyard")
            .tag("camera_name", "ZWO ASI2600MM")
            .field("value", 80.5)
            .timestamp(ts(), Precision::Nanoseconds);

        assert_eq!(
            point.to_line_protocol().unwrap(),
            "camera_cooler_power,camera_name=ZWO\\ ASI2600MM,profile_name=Backyard value=80.5 1700000000123456789"
        );
    }

    #[test]
    fn integer_boolean_and_string_fields() {
        let point = Point::new("events")
            .tag("name", "filter_change")
            .field("filter_to", "Ha \"3nm\"")
            .field("position", 1200_i64)
            .field("safe", true)
            .timestamp(ts(), Precision::Milliseconds);

        assert_eq!(
            point.to_line_protocol().unwrap(),
            "events,name=filter_change filter_to=\"Ha \\\"3nm\\\"\",position=1200i,safe=true 1700000000123000000"
        );
    }

    #[test]
    fn precision_truncates_timestamp() {
        let base = Point::new("m").field("value", 1.0);
        let secs = base.clone().timestamp(ts(), Precision::Seconds);
        let millis = base.clone().timestamp(ts(), Precision::Milliseconds);
        let nanos = base.timestamp(ts(), Precision::Nanoseconds);

        assert_eq!(secs.timestamp_nanos(), Some(1_700_000_000_000_000_000));
        assert_eq!(millis.timestamp_nanos(), Some(1_700_000_000_123_000_000));
        assert_eq!(nanos.timestamp_nanos(), Some(1_700_000_000_123_456_789));
    }

    #[test]
    fn empty_tag_values_are_not_attached() {
        let point = Point::new("image_hfr")
            .tag("target_name", "")
            .tag("sequence_title", "   ")
            .tag("camera_name", "QHY268M")
            .field("value", 2.1);

        assert_eq!(point.tag_value("target_name"), None);
        assert_eq!(point.tag_value("sequence_title"), None);
        assert_eq!(point.tag_value("camera_name"), Some("QHY268M"));
    }

    #[test]
    fn escapes_measurement_and_tag_specials() {
        let point = Point::new("switch ro,1")
            .tag("name", "Dew heater=primary, 12V")
            .field("value", 3.0)
            .timestamp(ts(), Precision::Seconds);

        assert_eq!(
            point.to_line_protocol().unwrap(),
            "switch\\ ro\\,1,name=Dew\\ heater\\=primary\\,\\ 12V value=3 1700000000000000000"
        );
    }

    #[test]
    fn point_without_fields_is_rejected() {
        let err = Point::new("events").tag("name", "x").to_line_protocol().unwrap_err();
        assert_eq!(
            err,
            PointError::NoFields {
                measurement: "events".to_string()
            }
        );
    }

    #[test]
    fn batch_skips_unencodable_points() {
        let points = vec![
            Point::new("a").field("value", 1_i64).timestamp(ts(), Precision::Seconds),
            Point::new("").field("value", 1_i64),
            Point::new("b").field("value", 2_i64).timestamp(ts(), Precision::Seconds),
        ];
        let (body, errors) = encode_batch(&points);
        assert_eq!(body, "a value=1i 1700000000000000000\nb value=2i 1700000000000000000");
        assert_eq!(errors, vec![PointError::EmptyMeasurement]);
    }

    #[test]
    fn field_values_use_line_protocol_syntax() {
        assert_eq!(FieldValue::Float(3.25).to_line_protocol(), "3.25");
        assert_eq!(FieldValue::Integer(-1).to_line_protocol(), "-1i");
        assert_eq!(FieldValue::Boolean(true).to_string(), "true");
        assert_eq!(
            FieldValue::from(r#"C:\lights\"M31".fits"#).to_line_protocol(),
            r#""C:\\lights\\\"M31\".fits""#
        );
    }

    #[test]
    fn line_breaks_never_split_a_point() {
        let point = Point::new("sequence\nnotes")
            .tag("target", "NGC\r\n7000")
            .field("note", "first\nsecond")
            .timestamp(ts(), Precision::Seconds);

        let line = point.to_line_protocol().unwrap();
        assert!(!line.contains('\n') && !line.contains('\r'));
        assert_eq!(
            line,
            "sequence\\ notes,target=NGC\\ \\ 7000 note=\"first second\" 1700000000000000000"
        );
    }
}
