//! Sample command line programs driven by the runner in tests.
//!
//! Each fixture is an ordinary entry point: it parses `clirunner::stdio`
//! arguments with clap, reads and writes the runner's standard streams and
//! ends through `clirunner::exit` where a real binary would call
//! `std::process::exit`.

pub mod cat;
pub mod hello;
pub mod prompt;
pub mod raise;
pub mod services;

use std::io::Write;

use clap::Parser;
use clirunner::{exit, stdio};

/// Parse the current argument vector as `P`.
///
/// Usage errors, `--help` and `--version` are rendered the way clap would
/// for a real binary and then end the program with clap's exit code.
#[must_use]
pub fn parse_args<P: Parser>() -> P {
    match P::try_parse_from(stdio::args()) {
        Ok(parsed) => parsed,
        Err(err) => {
            let rendered = err.render().to_string();
            let written = if err.use_stderr() {
                stdio::stderr().write_str(&rendered)
            } else {
                stdio::stdout().write_str(&rendered)
            };
            if let Err(write_err) = written {
                exit(format!("failed to report usage error: {write_err}"));
            }
            exit(err.exit_code())
        }
    }
}

/// Write `line` and a newline to the active standard output.
///
/// # Errors
///
/// Propagates write failures.
pub fn say(line: &str) -> std::io::Result<()> {
    writeln!(stdio::stdout(), "{line}")
}
