//! Conversion of raw probe samples into metric points.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use super::point::{FieldValue, Fields, MetricPoint, PointError, Tags};
use crate::probe::ProbeSample;

/// How far the probe tool's summary lags behind the moment it describes.
pub const SAMPLING_SKEW: Duration = Duration::seconds(20);

/// Offset added back onto the skewed event time.
pub const POINT_OFFSET: Duration = Duration::seconds(10);

pub const TAG_PROBE: &str = "probe";
pub const TAG_HOST: &str = "host";

pub const FIELD_LOSS: &str = "ping_loss";
pub const FIELD_MIN: &str = "min";
pub const FIELD_AVG: &str = "avg";
pub const FIELD_MAX: &str = "max";

/// Policy for loss and RTT values that do not parse as numbers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OnParseError {
    /// Record the value as 0. A corrupted number looks like a real zero.
    #[default]
    ZeroFill,
    /// Fail the sample.
    Reject,
}

/// Errors raised while turning a sample into a point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// A numeric field could not be parsed under [`OnParseError::Reject`].
    #[error("field '{field}' of host '{host}' is not a number: '{value}'")]
    InvalidNumber {
        host: String,
        field: &'static str,
        value: String,
    },

    /// The point failed validation.
    #[error("invalid point: {0}")]
    Point(#[from] PointError),
}

/// Builds one [`MetricPoint`] per [`ProbeSample`].
///
/// The builder holds only configuration; identical inputs give identical
/// points.
#[derive(Debug, Clone)]
pub struct MetricBuilder {
    measurement: String,
    probe_name: String,
    on_parse_error: OnParseError,
}

impl MetricBuilder {
    pub fn new(measurement: impl Into<String>, probe_name: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            probe_name: probe_name.into(),
            on_parse_error: OnParseError::default(),
        }
    }

    /// Set the numeric parse-failure policy.
    pub fn with_parse_policy(mut self, policy: OnParseError) -> Self {
        self.on_parse_error = policy;
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn probe_name(&self) -> &str {
        &self.probe_name
    }

    pub fn parse_policy(&self) -> OnParseError {
        self.on_parse_error
    }

    /// Timestamp stamped on a point for a cycle captured at `captured_at`.
    pub fn point_time(captured_at: DateTime<Utc>) -> DateTime<Utc> {
        let event_time = captured_at - SAMPLING_SKEW;
        event_time + POINT_OFFSET
    }

    /// Convert a sample into a point.
    ///
    /// # Errors
    /// - `MetricError::InvalidNumber` when a value does not parse and the
    ///   policy is `reject`
    /// - `MetricError::Point` when the resulting point is invalid
    pub fn build(
        &self,
        sample: &ProbeSample,
        captured_at: DateTime<Utc>,
    ) -> Result<MetricPoint, MetricError> {
        let loss: i64 = self.number(sample, FIELD_LOSS, Some(&sample.loss))?;
        let min: f64 = self.number(sample, FIELD_MIN, sample.min_rtt.as_ref())?;
        let avg: f64 = self.number(sample, FIELD_AVG, sample.avg_rtt.as_ref())?;
        let max: f64 = self.number(sample, FIELD_MAX, sample.max_rtt.as_ref())?;

        let tags = Tags::from([
            (TAG_PROBE.to_string(), self.probe_name.clone()),
            (TAG_HOST.to_string(), sample.host.clone()),
        ]);
        let fields = Fields::from([
            (FIELD_LOSS.to_string(), FieldValue::Integer(loss)),
            (FIELD_MIN.to_string(), FieldValue::Float(min)),
            (FIELD_MAX.to_string(), FieldValue::Float(max)),
            (FIELD_AVG.to_string(), FieldValue::Float(avg)),
        ]);

        Ok(MetricPoint::new(
            self.measurement.as_str(),
            tags,
            fields,
            Self::point_time(captured_at),
        )?)
    }

    /// Parse a raw value. Absent values are 0 regardless of policy.
    fn number<T>(
        &self,
        sample: &ProbeSample,
        field: &'static str,
        raw: Option<&String>,
    ) -> Result<T, MetricError>
    where
        T: FromStr + Default,
    {
        let Some(raw) = raw else {
            return Ok(T::default());
        };
        match raw.parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => match self.on_parse_error {
                OnParseError::ZeroFill => {
                    tracing::debug!(
                        host = %sample.host,
                        field,
                        value = %raw,
                        "Unparsable value recorded as zero"
                    );
                    Ok(T::default())
                }
                OnParseError::Reject => Err(MetricError::InvalidNumber {
                    host: sample.host.clone(),
                    field,
                    value: raw.clone(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap()
    }

    fn builder() -> MetricBuilder {
        MetricBuilder::new("ping", "probe-01")
    }

    #[test]
    fn test_build_with_timing() {
        let sample = ProbeSample::new("host1", "10", "9", "10").with_rtt("1.10", "2.20", "3.30");
        let point = builder().build(&sample, captured()).unwrap();

        assert_eq!(point.measurement(), "ping");
        assert_eq!(point.tag(TAG_PROBE), Some("probe-01"));
        assert_eq!(point.tag(TAG_HOST), Some("host1"));
        assert_eq!(point.tags().len(), 2);
        assert_eq!(point.field(FIELD_LOSS), Some(FieldValue::Integer(10)));
        assert_eq!(point.field(FIELD_MIN), Some(FieldValue::Float(1.10)));
        assert_eq!(point.field(FIELD_AVG), Some(FieldValue::Float(2.20)));
        assert_eq!(point.field(FIELD_MAX), Some(FieldValue::Float(3.30)));
    }

    #[test]
    fn test_build_without_timing_zero_fills() {
        let sample = ProbeSample::new("host2", "5", "0", "100");
        let point = builder().build(&sample, captured()).unwrap();

        assert_eq!(point.field(FIELD_LOSS), Some(FieldValue::Integer(100)));
        assert_eq!(point.field(FIELD_MIN), Some(FieldValue::Float(0.0)));
        assert_eq!(point.field(FIELD_AVG), Some(FieldValue::Float(0.0)));
        assert_eq!(point.field(FIELD_MAX), Some(FieldValue::Float(0.0)));
    }

    #[test]
    fn test_point_time_is_ten_seconds_before_capture() {
        let sample = ProbeSample::new("h", "1", "1", "0");
        let point = builder().build(&sample, captured()).unwrap();
        assert_eq!(
            point.timestamp(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 20).unwrap()
        );
        assert_eq!(
            MetricBuilder::point_time(captured()),
            captured() - Duration::seconds(10)
        );
    }

    #[test]
    fn test_zero_fill_policy_on_garbage() {
        let sample = ProbeSample::new("h", "4", "2", "fifty").with_rtt("x", "2.5", "");
        let point = builder().build(&sample, captured()).unwrap();

        assert_eq!(point.field(FIELD_LOSS), Some(FieldValue::Integer(0)));
        assert_eq!(point.field(FIELD_MIN), Some(FieldValue::Float(0.0)));
        assert_eq!(point.field(FIELD_AVG), Some(FieldValue::Float(2.5)));
        assert_eq!(point.field(FIELD_MAX), Some(FieldValue::Float(0.0)));
    }

    #[test]
    fn test_reject_policy_on_garbage() {
        let sample = ProbeSample::new("h", "4", "2", "50").with_rtt("1.0", "oops", "3.0");
        let err = builder()
            .with_parse_policy(OnParseError::Reject)
            .build(&sample, captured())
            .unwrap_err();

        assert_eq!(
            err,
            MetricError::InvalidNumber {
                host: "h".to_string(),
                field: FIELD_AVG,
                value: "oops".to_string(),
            }
        );
    }

    #[test]
    fn test_reject_policy_keeps_absent_timing_at_zero() {
        let sample = ProbeSample::new("h", "5", "0", "100");
        let point = builder()
            .with_parse_policy(OnParseError::Reject)
            .build(&sample, captured())
            .unwrap();
        assert_eq!(point.field(FIELD_MAX), Some(FieldValue::Float(0.0)));
    }

    #[test]
    fn test_nan_is_a_construction_error() {
        let sample = ProbeSample::new("h", "1", "1", "0").with_rtt("NaN", "1", "1");
        let err = builder().build(&sample, captured()).unwrap_err();
        assert!(matches!(
            err,
            MetricError::Point(PointError::NonFiniteField { .. })
        ));
    }

    #[test]
    fn test_empty_probe_name_is_a_construction_error() {
        let sample = ProbeSample::new("h", "1", "1", "0");
        let err = MetricBuilder::new("ping", "")
            .build(&sample, captured())
            .unwrap_err();
        assert_eq!(
            err,
            MetricError::Point(PointError::EmptyTagValue(TAG_PROBE.to_string()))
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let sample = ProbeSample::new("h", "3", "3", "0").with_rtt("1", "2", "3");
        let b = builder();
        assert_eq!(
            b.build(&sample, captured()).unwrap(),
            b.build(&sample, captured()).unwrap()
        );
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(OnParseError::ZeroFill.as_ref(), "zero_fill");
        assert_eq!(
            OnParseError::from_str("REJECT").unwrap(),
            OnParseError::Reject
        );
    }
}
