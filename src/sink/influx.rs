//! InfluxDB client.
//!
//! Writes go through the `influxdb2` client to `/api/v2/write`, which
//! InfluxDB 2.x serves natively and 1.8+ serves as a compatibility
//! endpoint. Against 1.x the bucket is the database name and the token is
//! `username:password`.

use std::time::Duration;

use futures::stream;
use influxdb2::Client;
use influxdb2::api::write::TimestampPrecision;
use influxdb2::models::DataPoint;
use url::Url;

use super::{MetricSink, SinkError};
use crate::config::InfluxConfig;
use crate::metric::{FieldValue, MetricPoint, PointBatch};

/// Writes point batches at second precision.
pub struct InfluxClient {
    client: Client,
    address: String,
    username: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for InfluxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxClient")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InfluxClient {
    /// Create a client from sink configuration.
    ///
    /// # Errors
    /// Returns `SinkError::InvalidAddress` if the address is not an http(s) URL.
    pub fn new(config: &InfluxConfig) -> Result<Self, SinkError> {
        let url = Url::parse(&config.address)
            .map_err(|e| SinkError::InvalidAddress(format!("'{}': {}", config.address, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(SinkError::InvalidAddress(format!(
                "'{}': expected an http or https URL",
                config.address
            )));
        }
        // The client appends `/api/v2/...` to the address as given.
        let address = url.as_str().trim_end_matches('/').to_string();

        let username = Some(config.username.clone()).filter(|u| !u.is_empty());
        let token = match &username {
            Some(user) => format!("{}:{}", user, config.password),
            None => String::new(),
        };

        Ok(Self {
            client: Client::new(address.as_str(), config.org.as_str(), token),
            address,
            username,
            timeout: config.timeout,
        })
    }

    /// Base address requests are sent to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check that the server is up.
    ///
    /// # Errors
    /// Returns `SinkError` on transport failure, timeout or a non-success
    /// status.
    pub async fn ping(&self) -> Result<(), SinkError> {
        let health = tokio::time::timeout(self.timeout, self.client.health())
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))??;
        tracing::debug!(
            name = %health.name,
            version = health.version.as_deref().unwrap_or("unknown"),
            "InfluxDB is healthy"
        );
        Ok(())
    }
}

/// Convert a validated point into the client's representation.
fn data_point(point: &MetricPoint) -> Result<DataPoint, SinkError> {
    let mut builder = DataPoint::builder(point.measurement());
    for (key, value) in point.tags() {
        builder = builder.tag(key, value);
    }
    for (key, value) in point.fields() {
        builder = match *value {
            FieldValue::Integer(v) => builder.field(key, v),
            FieldValue::Float(v) => builder.field(key, v),
        };
    }
    builder
        .timestamp(point.timestamp().timestamp())
        .build()
        .map_err(|e| SinkError::InvalidPoint(e.to_string()))
}

#[async_trait::async_trait]
impl MetricSink for InfluxClient {
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        let points = batch
            .points()
            .iter()
            .map(data_point)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::trace!(
            bucket = batch.database(),
            points = points.len(),
            "Writing batch"
        );

        let request = self.client.write_with_precision(
            batch.database(),
            stream::iter(points),
            TimestampPrecision::Seconds,
        );
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))??;
        Ok(())
    }
}
