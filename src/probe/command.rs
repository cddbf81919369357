//! Probe tool invocation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::config::ProbeOptions;

/// fping invocation with a fixed argument shape.
///
/// Arguments are emitted in this order: backoff, timestamps, retry, TOS,
/// summary period, per-target interval, loop mode, extra arguments, hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    program: PathBuf,
    retry: u32,
    summary: Duration,
    interval: Duration,
    extra_args: Vec<String>,
    hosts: Vec<String>,
}

impl ProbeCommand {
    /// Backoff factor between retries (`-B`).
    pub const BACKOFF: &'static str = "1";

    /// Type-of-service byte (`-O`).
    pub const TOS: &'static str = "0";

    /// Create an invocation of `program` against `hosts` with default timing.
    pub fn new(program: impl Into<PathBuf>, hosts: Vec<String>) -> Self {
        let defaults = ProbeOptions::default();
        Self {
            program: program.into(),
            retry: defaults.retry,
            summary: defaults.summary,
            interval: defaults.interval,
            extra_args: Vec::new(),
            hosts,
        }
    }

    /// Build the invocation described by configuration.
    pub fn from_options(options: &ProbeOptions, hosts: &[String]) -> Self {
        Self {
            program: options.binary.clone(),
            retry: options.retry,
            summary: options.summary,
            interval: options.interval,
            extra_args: options.extra_args.clone(),
            hosts: hosts.to_vec(),
        }
    }

    /// Set the retry count.
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Set the summary period.
    pub fn with_summary(mut self, summary: Duration) -> Self {
        self.summary = summary;
        self
    }

    /// Set the per-target interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Path of the executable.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Probe targets in argument order.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// The full argument list, excluding the program.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-B".to_string(),
            Self::BACKOFF.to_string(),
            "-D".to_string(),
            "-r".to_string(),
            self.retry.to_string(),
            "-O".to_string(),
            Self::TOS.to_string(),
            "-Q".to_string(),
            self.summary.as_secs().max(1).to_string(),
            "-p".to_string(),
            self.interval.as_millis().max(1).to_string(),
            "-l".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.extend(self.hosts.iter().cloned());
        args
    }

    /// Command line rendered for logs and `--print-command`.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args());
        parts.join(" ")
    }

    /// Build a spawnable command with both output streams piped.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}
