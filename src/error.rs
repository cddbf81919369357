//! Crate-level error type and failure classification.
//!
//! Every failure that ends a run maps to an [`ErrorClass`], which `main`
//! turns into a sysexits-style exit code so a supervisor can tell a network
//! hiccup from a broken configuration.

use std::process::ExitCode;

use influxdb2::RequestError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::config::ConfigError;
use crate::metric::MetricError;
use crate::probe::{ParseError, ProbeError};
use crate::sink::SinkError;

/// Broad failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// Bad configuration or credentials; retrying will not help.
    Config,
    /// Network or process trouble that may go away on the next run.
    Transient,
    /// Probe output that does not follow the expected grammar.
    MalformedInput,
    /// A point that should have been valid was not.
    Invariant,
}

impl ErrorClass {
    /// Process exit code (sysexits.h).
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config => 78,
            Self::Transient => 75,
            Self::MalformedInput => 65,
            Self::Invariant => 70,
        }
    }
}

impl From<ErrorClass> for ExitCode {
    fn from(class: ErrorClass) -> Self {
        ExitCode::from(class.exit_code())
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("malformed probe output: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to build metric: {0}")]
    Metric(#[from] MetricError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),
}

impl Error {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::Config,
            Self::Parse(_) => ErrorClass::MalformedInput,
            Self::Metric(MetricError::InvalidNumber { .. }) => ErrorClass::MalformedInput,
            Self::Metric(MetricError::Point(_)) => ErrorClass::Invariant,
            Self::Sink(e) => classify_sink(e),
            Self::Probe(ProbeError::Spawn { source, .. })
                if matches!(
                    source.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                ) =>
            {
                ErrorClass::Config
            }
            Self::Probe(_) => ErrorClass::Transient,
        }
    }
}

fn classify_sink(err: &SinkError) -> ErrorClass {
    match err {
        SinkError::InvalidAddress(_) => ErrorClass::Config,
        SinkError::InvalidPoint(_) => ErrorClass::Invariant,
        SinkError::Timeout(_) => ErrorClass::Transient,
        // 401/403: credentials, 404: unknown database.
        SinkError::Rejected { status, .. } => match status {
            401 | 403 | 404 => ErrorClass::Config,
            408 | 429 | 500..=599 => ErrorClass::Transient,
            _ => ErrorClass::Invariant,
        },
        SinkError::Request(RequestError::ReqwestProcessing { .. }) => ErrorClass::Transient,
        SinkError::Request(_) => ErrorClass::Invariant,
    }
}
