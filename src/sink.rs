//! Sink Layer
//!
//! Delivery of metric points to a time-series database.
//!
//! - [`MetricSink`]: what the pipeline writes to
//! - [`InfluxClient`]: InfluxDB implementation on the `influxdb2` client

mod error;
mod influx;

pub use error::SinkError;
pub use influx::InfluxClient;

use crate::metric::PointBatch;

/// Destination for point batches.
///
/// A write is attempted once; callers decide what a failure means.
#[async_trait::async_trait]
pub trait MetricSink: Send + Sync {
    /// Deliver a batch.
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError>;
}

#[async_trait::async_trait]
impl<S: MetricSink + ?Sized> MetricSink for std::sync::Arc<S> {
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError> {
        (**self).write(batch).await
    }
}
