//! Metric Layer
//!
//! Turns raw [`ProbeSample`](crate::probe::ProbeSample)s into validated
//! [`MetricPoint`]s.
//!
//! - [`MetricBuilder`]: numeric conversion, tagging and timestamping
//! - [`OnParseError`]: what happens to values that do not parse
//! - [`MetricPoint`] / [`PointBatch`]: what the sink receives

mod builder;
mod point;

pub use builder::{
    FIELD_AVG, FIELD_LOSS, FIELD_MAX, FIELD_MIN, MetricBuilder, MetricError, OnParseError,
    POINT_OFFSET, SAMPLING_SKEW, TAG_HOST, TAG_PROBE,
};
pub use point::{FieldValue, Fields, MetricPoint, PointBatch, PointError, Tags};
