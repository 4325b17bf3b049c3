//! Terminal diagnostics shared by every subcommand.
//!
//! The run transcript goes to stdout; fatal and per-ticket errors go to
//! stderr as `error: <message>` with an optional indented suggestion.

use std::fmt;
use std::io::{self, Write};
use taskdesk_core::error::ErrorCode;

/// An operator-facing error with an optional remediation hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
    pub suggestion: Option<String>,
    /// Stable `E####` code, when one applies.
    pub error_code: Option<&'static str>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Attach the code and hint from the machine code table.
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(ToString::to_string),
            error_code: Some(code.code()),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Write `error` in the `error: ...` / `  suggestion: ...` layout.
pub fn write_error(out: &mut dyn Write, error: &CliError) -> io::Result<()> {
    match error.error_code {
        Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
        None => writeln!(out, "error: {}", error.message)?,
    }
    if let Some(ref suggestion) = error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

/// Render an error to stderr.
pub fn render_error(error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, error)?;
    Ok(())
}

/// Render `error` to stderr and turn it into the run's failure.
pub fn fail<T>(error: CliError) -> anyhow::Result<T> {
    render_error(&error)?;
    Err(anyhow::anyhow!(error.message))
}
