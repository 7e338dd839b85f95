//! User-facing errors that know how to present themselves.
//!
//! Command line programs driven by the runner report these on the active
//! standard error as a single `Error: ...` line and then exit with the
//! error's code.

use std::{
    fmt,
    io::{self, Write},
};

use thiserror::Error;

use crate::{exit::ExitRequest, stdio};

/// An error that can be shown to the user of a command line program.
pub trait ShowError: fmt::Display {
    /// Exit status used after showing the error.
    fn exit_code(&self) -> i32 {
        1
    }

    /// Message shown after the `Error:` prefix.
    fn format_message(&self) -> String {
        self.to_string()
    }

    /// Write `Error: {message}` and a newline to the active standard error.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    fn show(&self) -> io::Result<()> {
        let mut err = stdio::stderr();
        writeln!(err, "Error: {}", self.format_message())?;
        err.flush()
    }

    /// Termination request carrying [`ShowError::exit_code`].
    fn exit_request(&self) -> ExitRequest {
        ExitRequest::code(self.exit_code())
    }
}

/// A plain message with an exit status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CliError {
    message: String,
    exit_code: i32,
}

impl CliError {
    /// Error with `message` and exit status 1.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: 1,
        }
    }

    /// Use `exit_code` instead of 1.
    #[must_use]
    pub const fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// The bare message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ShowError for CliError {
    fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

/// A file could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{hint}")]
pub struct FileError {
    filename: String,
    hint: String,
}

impl FileError {
    /// Error for `filename`, with an optional explanation.
    #[must_use]
    pub fn new(filename: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            filename: filename.into(),
            hint: hint.unwrap_or_else(|| "unknown error".to_owned()),
        }
    }

    /// Wrap an I/O error raised while opening `filename`.
    #[must_use]
    pub fn from_io(filename: impl Into<String>, err: &io::Error) -> Self {
        Self::new(filename, Some(err.to_string()))
    }

    /// The file that failed to open.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl ShowError for FileError {
    fn format_message(&self) -> String {
        format!("Could not open file '{}': {}", self.filename, self.hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliRunner;
    use serial_test::serial;

    #[test]
    fn file_error_mentions_the_file() {
        let err = FileError::new("missing.txt", None);
        assert_eq!(
            err.format_message(),
            "Could not open file 'missing.txt': unknown error"
        );
        assert_eq!(err.to_string(), "unknown error");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn custom_exit_code_flows_into_request() {
        let err = CliError::new("bad usage").with_exit_code(2);
        assert_eq!(err.exit_request().exit_code(), 2);
        assert_eq!(err.message(), "bad usage");
    }

    #[test]
    #[serial]
    fn show_writes_to_captured_stderr() {
        let result = CliRunner::new()
            .invoke(|| CliError::new("boom").show())
            .expect("invoke");
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.stderr(), "Error: boom\n");
        assert!(result.stdout().is_empty());
    }
}
