//! Line grammar for probe tool output.
//!
//! A [`LineGrammar`] turns one line of text into at most one
//! [`ProbeSample`]. The only grammar shipped is [`FpingSummaryGrammar`],
//! which reads the per-host summary lines fping prints on stderr in
//! `-Q`/`-c` mode:
//!
//! ```text
//! host1 : xmt/rcv/%loss = 10/9/10%, min/avg/max = 1.10/2.20/3.30
//! host2 : xmt/rcv/%loss = 5/0/100%
//! ```

use thiserror::Error;

use super::ProbeSample;

/// Errors raised for lines that look like data but cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line has no token at a position the layout requires.
    #[error("missing {token} token at field {index} in line '{line}'")]
    MissingToken {
        token: &'static str,
        index: usize,
        line: String,
    },

    /// A composite token did not split into the expected parts.
    #[error("malformed {token} token '{value}': expected {expected} '/'-separated parts, got {actual}")]
    MalformedToken {
        token: &'static str,
        value: String,
        expected: usize,
        actual: usize,
    },
}

/// Parses one line of probe output.
pub trait LineGrammar: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Parse a line.
    ///
    /// Returns `Ok(None)` for lines that carry no data (blank lines,
    /// timestamp headers) and an error for data lines with broken tokens.
    fn parse(&self, line: &str) -> Result<Option<ProbeSample>, ParseError>;
}

/// Token positions of a whitespace-split summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLayout {
    /// Lines with fewer fields are not data lines.
    pub min_fields: usize,
    /// Index of the host name.
    pub host: usize,
    /// Index of the `sent/received/loss%` token.
    pub counts: usize,
    /// Timing is present only when the field count exceeds this.
    pub timing_after: usize,
    /// Index of the `min/avg/max` token.
    pub timing: usize,
}

/// Field layout of fping 3.x/4.x/5.x summary lines.
pub const FPING_SUMMARY_LAYOUT: TokenLayout = TokenLayout {
    min_fields: 2,
    host: 0,
    counts: 4,
    timing_after: 5,
    timing: 7,
};

const COMPOSITE_PARTS: usize = 3;

/// Grammar for fping per-host summary lines.
#[derive(Debug, Clone, Copy)]
pub struct FpingSummaryGrammar {
    layout: TokenLayout,
}

impl Default for FpingSummaryGrammar {
    fn default() -> Self {
        Self::new(FPING_SUMMARY_LAYOUT)
    }
}

impl FpingSummaryGrammar {
    /// Create a grammar over a custom token layout.
    pub fn new(layout: TokenLayout) -> Self {
        Self { layout }
    }

    /// The token layout in use.
    pub fn layout(&self) -> TokenLayout {
        self.layout
    }
}

fn token<'a>(
    fields: &[&'a str],
    index: usize,
    name: &'static str,
    line: &str,
) -> Result<&'a str, ParseError> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| ParseError::MissingToken {
            token: name,
            index,
            line: line.to_string(),
        })
}

/// Split `a/b/c` into exactly three non-empty parts.
fn split_composite<'a>(value: &'a str, name: &'static str) -> Result<[&'a str; 3], ParseError> {
    let parts: Vec<&str> = value.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(ParseError::MalformedToken {
            token: name,
            value: value.to_string(),
            expected: COMPOSITE_PARTS,
            actual: parts.len(),
        }),
    }
}

impl LineGrammar for FpingSummaryGrammar {
    fn name(&self) -> &str {
        "fping-summary"
    }

    fn parse(&self, line: &str) -> Result<Option<ProbeSample>, ParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < self.layout.min_fields {
            return Ok(None);
        }

        let host = token(&fields, self.layout.host, "host", line)?;
        let counts = token(&fields, self.layout.counts, "xmt/rcv/%loss", line)?;
        let [sent, received, loss] = split_composite(counts, "xmt/rcv/%loss")?;
        let loss = loss.trim_end_matches(['%', ',']);

        let mut sample = ProbeSample::new(host, sent, received, loss);

        if fields.len() > self.layout.timing_after {
            let timing = token(&fields, self.layout.timing, "min/avg/max", line)?;
            let [min, avg, max] = split_composite(timing, "min/avg/max")?;
            sample = sample.with_rtt(min, avg, max);
        }

        Ok(Some(sample))
    }
}
