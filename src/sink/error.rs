//! Sink-specific error types.

use std::time::Duration;

use influxdb2::RequestError;
use thiserror::Error;

/// Longest response body kept in a [`SinkError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

/// Errors that can occur while talking to the time-series database.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The configured address is not a usable URL.
    #[error("invalid sink address: {0}")]
    InvalidAddress(String),

    /// The client library refused to build a data point.
    #[error("invalid data point: {0}")]
    InvalidPoint(String),

    /// The request did not finish within the configured timeout.
    #[error("sink request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("sink rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Transport or response decoding failure.
    #[error("sink request failed: {0}")]
    Request(#[source] RequestError),
}

impl SinkError {
    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<RequestError> for SinkError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Http { status, text } => Self::Rejected {
                status: status.as_u16(),
                body: truncate_body(text),
            },
            other => Self::Request(other),
        }
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("  short \n".to_string()), "short");

        let long = "é".repeat(400);
        let cut = truncate_body(long);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_status_only_for_rejections() {
        let err = SinkError::Rejected {
            status: 404,
            body: "database not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(SinkError::Timeout(Duration::from_secs(1)).status(), None);
    }
}
