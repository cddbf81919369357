//! Per-host record extracted from one line of probe output.

use std::fmt;

/// Raw per-host measurements as printed by the probe tool.
///
/// Values stay textual here; numeric conversion and its failure policy
/// belong to the metric builder. Timing values are `None` when the line had
/// no timing segment, which is different from a reported `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSample {
    /// Probed target, never empty.
    pub host: String,
    /// Packets sent.
    pub sent: String,
    /// Packets received. Not checked against `sent`.
    pub received: String,
    /// Loss percentage with `%` and `,` suffixes removed.
    pub loss: String,
    pub min_rtt: Option<String>,
    pub avg_rtt: Option<String>,
    pub max_rtt: Option<String>,
}

impl ProbeSample {
    /// Create a sample without a timing segment.
    pub fn new(
        host: impl Into<String>,
        sent: impl Into<String>,
        received: impl Into<String>,
        loss: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            sent: sent.into(),
            received: received.into(),
            loss: loss.into(),
            min_rtt: None,
            avg_rtt: None,
            max_rtt: None,
        }
    }

    /// Attach round-trip times in milliseconds.
    pub fn with_rtt(
        mut self,
        min: impl Into<String>,
        avg: impl Into<String>,
        max: impl Into<String>,
    ) -> Self {
        self.min_rtt = Some(min.into());
        self.avg_rtt = Some(avg.into());
        self.max_rtt = Some(max.into());
        self
    }

    /// Whether the line carried a timing segment.
    pub fn has_rtt(&self) -> bool {
        self.min_rtt.is_some() || self.avg_rtt.is_some() || self.max_rtt.is_some()
    }
}

impl fmt::Display for ProbeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<String>| v.as_deref().unwrap_or("-").to_string();
        write!(
            f,
            "host={} sent={} recv={} loss={}% min={} avg={} max={}",
            self.host,
            self.sent,
            self.received,
            self.loss,
            opt(&self.min_rtt),
            opt(&self.avg_rtt),
            opt(&self.max_rtt),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_without_rtt() {
        let sample = ProbeSample::new("host2", "5", "0", "100");
        assert!(!sample.has_rtt());
        assert_eq!(sample.min_rtt, None);
        assert_eq!(
            sample.to_string(),
            "host=host2 sent=5 recv=0 loss=100% min=- avg=- max=-"
        );
    }

    #[test]
    fn test_sample_with_rtt() {
        let sample = ProbeSample::new("host1", "10", "9", "10").with_rtt("1.10", "2.20", "3.30");
        assert!(sample.has_rtt());
        assert_eq!(sample.avg_rtt.as_deref(), Some("2.20"));
    }
}
