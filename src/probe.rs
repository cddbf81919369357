//! Probe Layer
//!
//! Everything between the fping executable and a [`ProbeSample`]:
//!
//! - [`ProbeCommand`]: argument assembly
//! - [`ProbeRunner`]: process lifecycle and output streaming
//! - [`LineGrammar`] / [`FpingSummaryGrammar`]: one line in, at most one sample out

mod command;
mod grammar;
mod runner;
mod sample;

pub use command::ProbeCommand;
pub use grammar::{FPING_SUMMARY_LAYOUT, FpingSummaryGrammar, LineGrammar, ParseError, TokenLayout};
pub use runner::{ProbeError, ProbeRunner};
pub(crate) use runner::read_line_lossy;
pub use sample::ProbeSample;
