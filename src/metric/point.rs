//! Typed, tagged, timestamped data points.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Tag set of a point, ordered by key.
pub type Tags = BTreeMap<String, String>;

/// Field set of a point, ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

/// Reasons a point cannot be constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PointError {
    #[error("measurement name cannot be empty")]
    EmptyMeasurement,

    #[error("tag keys cannot be empty")]
    EmptyTagKey,

    #[error("tag '{0}' has an empty value")]
    EmptyTagValue(String),

    #[error("a point needs at least one field")]
    NoFields,

    #[error("field keys cannot be empty")]
    EmptyFieldKey,

    #[error("field '{key}' is not finite: {value}")]
    NonFiniteField { key: String, value: f64 },

    #[error("{0} contains a line break")]
    LineBreak(String),

    #[error("{0} ends with a backslash")]
    TrailingBackslash(String),
}

/// A numeric field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// A validated point ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    measurement: String,
    tags: Tags,
    fields: Fields,
    timestamp: DateTime<Utc>,
}

/// Names and tag values must stay on one line and must not end in `\`,
/// which would escape the separator that follows them.
fn check_token(what: &str, value: &str) -> Result<(), PointError> {
    if value.contains(['\n', '\r']) {
        return Err(PointError::LineBreak(format!("{what} '{}'", value.escape_debug())));
    }
    if value.ends_with('\\') {
        return Err(PointError::TrailingBackslash(format!("{what} '{value}'")));
    }
    Ok(())
}

impl MetricPoint {
    /// Build a point, validating names and values.
    ///
    /// # Errors
    /// Returns `PointError` for empty names, empty tag values, a missing
    /// field set, non-finite floats, line breaks anywhere in the point or a
    /// name or tag value ending in a backslash.
    pub fn new(
        measurement: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        check_token("measurement", &measurement)?;

        for (key, value) in &tags {
            if key.is_empty() {
                return Err(PointError::EmptyTagKey);
            }
            if value.is_empty() {
                return Err(PointError::EmptyTagValue(key.clone()));
            }
            check_token("tag key", key)?;
            check_token("tag value", value)?;
        }

        if fields.is_empty() {
            return Err(PointError::NoFields);
        }
        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey);
            }
            check_token("field key", key)?;
            if let FieldValue::Float(v) = value {
                if !v.is_finite() {
                    return Err(PointError::NonFiniteField {
                        key: key.clone(),
                        value: *v,
                    });
                }
            }
        }

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Look up a field value.
    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }
}

/// Points addressed to one database, written in one request at second
/// precision.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    database: String,
    points: Vec<MetricPoint>,
}

impl PointBatch {
    /// Create an empty batch.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            points: Vec::new(),
        }
    }

    /// Batch holding exactly one point.
    pub fn single(database: impl Into<String>, point: MetricPoint) -> Self {
        let mut batch = Self::new(database);
        batch.add_point(point);
        batch
    }

    pub fn add_point(&mut self, point: MetricPoint) {
        self.points.push(point);
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tags() -> Tags {
        Tags::from([
            ("probe".to_string(), "p1".to_string()),
            ("host".to_string(), "h1".to_string()),
        ])
    }

    fn fields() -> Fields {
        Fields::from([
            ("ping_loss".to_string(), FieldValue::Integer(0)),
            ("avg".to_string(), FieldValue::Float(1.5)),
        ])
    }

    #[test]
    fn test_point_new_valid() {
        let point = MetricPoint::new("ping", tags(), fields(), ts()).unwrap();
        assert_eq!(point.measurement(), "ping");
        assert_eq!(point.tag("host"), Some("h1"));
        assert_eq!(point.field("avg"), Some(FieldValue::Float(1.5)));
        assert_eq!(point.timestamp(), ts());
    }

    #[test]
    fn test_point_rejects_empty_measurement() {
        let err = MetricPoint::new("", tags(), fields(), ts()).unwrap_err();
        assert_eq!(err, PointError::EmptyMeasurement);
    }

    #[test]
    fn test_point_rejects_empty_tag_value() {
        let mut tags = tags();
        tags.insert("probe".to_string(), String::new());
        let err = MetricPoint::new("ping", tags, fields(), ts()).unwrap_err();
        assert_eq!(err, PointError::EmptyTagValue("probe".to_string()));
    }

    #[test]
    fn test_point_rejects_missing_fields() {
        let err = MetricPoint::new("ping", tags(), Fields::new(), ts()).unwrap_err();
        assert_eq!(err, PointError::NoFields);
    }

    #[test]
    fn test_point_rejects_non_finite() {
        let mut fields = fields();
        fields.insert("max".to_string(), FieldValue::Float(f64::NAN));
        let err = MetricPoint::new("ping", tags(), fields, ts()).unwrap_err();
        assert!(matches!(err, PointError::NonFiniteField { ref key, .. } if key == "max"));

        let mut fields = self::fields();
        fields.insert("min".to_string(), FieldValue::Float(f64::INFINITY));
        assert!(MetricPoint::new("ping", tags(), fields, ts()).is_err());
    }

    #[test]
    fn test_point_rejects_line_breaks() {
        let mut tags = tags();
        tags.insert("host".to_string(), "a\nb".to_string());
        let err = MetricPoint::new("ping", tags, fields(), ts()).unwrap_err();
        assert!(err.to_string().contains("line break"));
    }

    #[test]
    fn test_point_rejects_trailing_backslash() {
        let mut tags = tags();
        tags.insert("host".to_string(), "h\\".to_string());
        let err = MetricPoint::new("ping", tags, fields(), ts()).unwrap_err();
        assert!(matches!(err, PointError::TrailingBackslash(ref what) if what.contains("tag value")));

        let err = MetricPoint::new("ping\\", self::tags(), fields(), ts()).unwrap_err();
        assert!(matches!(err, PointError::TrailingBackslash(_)));

        let mut tags = self::tags();
        tags.insert("host".to_string(), r"DOMAIN\h1".to_string());
        assert!(MetricPoint::new("ping", tags, fields(), ts()).is_ok());
    }

    #[test]
    fn test_single_point_batch() {
        let point = MetricPoint::new("ping", tags(), fields(), ts()).unwrap();
        let batch = PointBatch::single("telegraf", point.clone());
        assert_eq!(batch.database(), "telegraf");
        assert_eq!(batch.points(), &[point]);
        assert!(!batch.is_empty());
    }
}
