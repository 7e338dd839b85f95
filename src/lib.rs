//! In-process runner for command line entry points.
//!
//! [`CliRunner`] calls a program's entry point as if it had been started
//! from a shell: standard input, output and error, the argument vector and
//! selected environment variables are replaced for the duration of the
//! call, and everything the program wrote comes back in an
//! [`InvokeResult`] together with its exit code.
//!
//! Programs read and write through [`stdio`] and end early with
//! [`exit::exit`]:
//!
//! ```
//! use std::io::Write;
//! use clirunner::{CliRunner, InvokeOptions, stdio};
//!
//! fn greet() -> std::io::Result<()> {
//!     let args = stdio::args();
//!     let name = args.get(1).map_or("World", String::as_str);
//!     writeln!(stdio::stdout(), "Hello {name}!")
//! }
//!
//! let result = CliRunner::new()
//!     .invoke_with(greet, InvokeOptions::new().args(["Peter"]))?;
//! assert_eq!(result.exit_code(), 0);
//! assert_eq!(result.output(), "Hello Peter!\n");
//! # Ok::<(), clirunner::RunnerError>(())
//! ```
//!
//! The runner changes process-wide state, so invocations never overlap:
//! concurrent callers wait for each other.

pub mod charset;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod exit;
pub mod fs;
pub mod isolation;
pub mod result;
pub mod runner;
pub mod stdio;
pub mod streams;

pub use charset::Charset;
pub use config::RunnerConfig;
pub use error::RunnerError;
pub use exit::{ExitRequest, ExitValue, exit};
pub use fs::IsolatedFilesystem;
pub use isolation::{EnvOverrides, Input, Isolation};
pub use result::{ExitInfo, Failure, FailureKind, InvokeResult};
pub use runner::{Args, CliRunner, InvokeOptions, Report};
