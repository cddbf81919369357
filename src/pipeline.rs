//! Line-to-point pipeline.
//!
//! A [`Pipeline`] takes probe output one line at a time and, for each data
//! line, parses a sample, builds a point, writes it to the sink in its own
//! batch and then moves on. Nothing is buffered between lines and nothing
//! is retried; the first failure ends the run and is returned to the caller
//! with its [`ErrorClass`](crate::ErrorClass).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::io::AsyncBufRead;

use crate::Error;
use crate::metric::{MetricBuilder, MetricPoint, PointBatch};
use crate::notify::{NoopNotifier, ReadinessNotifier};
use crate::probe::{FpingSummaryGrammar, LineGrammar, ProbeError, read_line_lossy};
use crate::sink::MetricSink;

/// What to do with a data line whose tokens cannot be read.
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
pub enum MalformedLinePolicy {
    /// End the run with a malformed-input error.
    #[default]
    Abort,
    /// Log the line and continue with the next one.
    Skip,
}

/// Source of capture times.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines read from the probe's diagnostic stream.
    pub lines: u64,
    /// Lines that produced a sample.
    pub samples: u64,
    /// Non-data lines.
    pub skipped: u64,
    /// Malformed lines dropped under [`MalformedLinePolicy::Skip`].
    pub discarded: u64,
    /// Points accepted by the sink.
    pub written: u64,
}

/// Result of feeding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Not a data line.
    Skipped,
    /// Malformed data line dropped by policy.
    Discarded,
    /// A point was written.
    Written(MetricPoint),
}

/// Parses, builds and writes, one line at a time.
pub struct Pipeline {
    grammar: Box<dyn LineGrammar>,
    builder: MetricBuilder,
    database: String,
    sink: Box<dyn MetricSink>,
    notifier: Box<dyn ReadinessNotifier>,
    clock: Box<dyn Clock>,
    on_malformed_line: MalformedLinePolicy,
    ready_sent: bool,
    stats: PipelineStats,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("grammar", &self.grammar.name())
            .field("builder", &self.builder)
            .field("database", &self.database)
            .field("on_malformed_line", &self.on_malformed_line)
            .field("ready_sent", &self.ready_sent)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline with the fping grammar, the system clock, no
    /// readiness notifications and the `abort` policy.
    pub fn new(
        builder: MetricBuilder,
        database: impl Into<String>,
        sink: impl MetricSink + 'static,
    ) -> Self {
        Self {
            grammar: Box::new(FpingSummaryGrammar::default()),
            builder,
            database: database.into(),
            sink: Box::new(sink),
            notifier: Box::new(NoopNotifier),
            clock: Box::new(SystemClock),
            on_malformed_line: MalformedLinePolicy::default(),
            ready_sent: false,
            stats: PipelineStats::default(),
        }
    }

    /// Set the readiness notifier.
    pub fn with_notifier(mut self, notifier: Box<dyn ReadinessNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the clock used for capture times.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Set the malformed-line policy.
    pub fn with_malformed_line_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.on_malformed_line = policy;
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Whether the readiness notification has been sent.
    pub fn is_ready(&self) -> bool {
        self.ready_sent
    }

    /// Feed one line.
    ///
    /// The capture time is read from the clock once per data line.
    ///
    /// # Errors
    /// - `Error::Parse` for a malformed data line under `abort`
    /// - `Error::Metric` if the point cannot be built
    /// - `Error::Sink` if the write fails
    pub async fn process_line(&mut self, line: &str) -> Result<LineOutcome, Error> {
        self.stats.lines += 1;

        let sample = match self.grammar.parse(line) {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                tracing::trace!(line, "Skipping non-data line");
                self.stats.skipped += 1;
                return Ok(LineOutcome::Skipped);
            }
            Err(e) => match self.on_malformed_line {
                MalformedLinePolicy::Abort => return Err(e.into()),
                MalformedLinePolicy::Skip => {
                    tracing::warn!(error = %e, grammar = self.grammar.name(), "Discarding malformed line");
                    self.stats.discarded += 1;
                    return Ok(LineOutcome::Discarded);
                }
            },
        };
        self.stats.samples += 1;

        tracing::info!(
            host = %sample.host,
            loss = %sample.loss,
            min = sample.min_rtt.as_deref().unwrap_or(""),
            avg = sample.avg_rtt.as_deref().unwrap_or(""),
            max = sample.max_rtt.as_deref().unwrap_or(""),
            sent = %sample.sent,
            recv = %sample.received,
            "Probe sample"
        );

        let point = self.builder.build(&sample, self.clock.now())?;
        let batch = PointBatch::single(self.database.as_str(), point.clone());
        self.sink.write(&batch).await?;
        self.stats.written += 1;

        tracing::debug!(
            host = %sample.host,
            timestamp = %point.timestamp(),
            "Point written"
        );

        self.mark_ready();
        Ok(LineOutcome::Written(point))
    }

    /// Feed every line of `reader` until end of stream.
    ///
    /// Bytes that are not valid UTF-8 are replaced, so they can at worst
    /// make a line malformed.
    ///
    /// # Errors
    /// Stops at the first error from [`process_line`](Self::process_line)
    /// or from reading.
    pub async fn run<R>(&mut self, mut reader: R) -> Result<PipelineStats, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        while let Some(line) = read_line_lossy(&mut reader, &mut buf)
            .await
            .map_err(ProbeError::Io)?
        {
            self.process_line(&line).await?;
        }
        Ok(self.stats)
    }

    fn mark_ready(&mut self) {
        if self.ready_sent {
            return;
        }
        self.ready_sent = true;
        match self.notifier.notify_ready() {
            Ok(()) => tracing::debug!("Readiness notification sent"),
            Err(e) => tracing::warn!(error = %e, "Failed to send readiness notification"),
        }
    }
}
