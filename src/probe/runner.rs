//! Runs the probe tool and feeds its output through a pipeline.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::ProbeCommand;
use crate::Error;
use crate::pipeline::{Pipeline, PipelineStats};

/// Errors from starting or reading the probe tool.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The executable could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An output stream was not piped.
    #[error("probe {0} was not captured")]
    MissingStream(&'static str),

    /// Reading output or waiting for exit failed.
    #[error("probe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawns one probe process and streams it to completion.
///
/// Diagnostic output (stderr) goes through the pipeline line by line;
/// standard output is logged as informational text. Both are read on the
/// current task.
pub struct ProbeRunner {
    command: Command,
    program: String,
}

impl std::fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl ProbeRunner {
    /// Runner for a configured fping invocation.
    pub fn new(command: &ProbeCommand) -> Self {
        Self {
            command: command.to_command(),
            program: command.program().display().to_string(),
        }
    }

    /// Runner for an arbitrary command.
    ///
    /// Both output streams are piped and the child is killed on drop.
    pub fn from_command(mut command: Command) -> Self {
        let program = command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned();
        command
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        Self { command, program }
    }

    /// Start the probe and process its output until it exits.
    ///
    /// A non-zero exit status is logged, not returned: fping exits with 1
    /// whenever a target was unreachable.
    ///
    /// # Errors
    /// Returns the pipeline's error, after killing the child, or a
    /// `ProbeError` if the process cannot be started or read.
    pub async fn run(mut self, pipeline: &mut Pipeline) -> Result<PipelineStats, Error> {
        tracing::info!(program = %self.program, "Starting probe");

        let mut child = self.command.spawn().map_err(|source| ProbeError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ProbeError::MissingStream("stderr"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(ProbeError::MissingStream("stdout"))?;

        let result = tokio::try_join!(pipeline.run(BufReader::new(stderr)), async {
            drain_stdout(stdout).await.map_err(|e| Error::from(ProbeError::Io(e)))
        });

        let (stats, stdout_lines) = match result {
            Ok(done) => done,
            Err(e) => {
                if let Err(kill_err) = child.kill().await {
                    tracing::warn!(error = %kill_err, "Failed to kill probe");
                }
                return Err(e);
            }
        };

        let status = child.wait().await.map_err(ProbeError::Io)?;
        if status.success() {
            tracing::info!(
                program = %self.program,
                written = stats.written,
                stdout_lines,
                "Probe finished"
            );
        } else {
            tracing::warn!(
                program = %self.program,
                status = %status,
                written = stats.written,
                "Probe exited with failure status"
            );
        }
        Ok(stats)
    }
}

/// Read one line, replacing invalid UTF-8 with U+FFFD.
///
/// The trailing `\n` or `\r\n` is removed. Returns `None` at end of stream.
pub(crate) async fn read_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Log every stdout line; returns the number of lines read.
async fn drain_stdout<R: AsyncRead + Unpin>(stdout: R) -> std::io::Result<u64> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut count = 0;
    while let Some(line) = read_line_lossy(&mut reader, &mut buf).await? {
        count += 1;
        tracing::info!(line = %line, "Probe stdout");
    }
    Ok(count)
}
