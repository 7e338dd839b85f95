//! Error types for the runner.
//!
//! Configuration problems are detected before any process-wide state is
//! touched. A target failure only surfaces here when the caller disabled
//! exception catching.

use std::io;

use miette::Diagnostic;
use thiserror::Error;

use crate::charset::EncodeError;

/// Errors raised while preparing or performing an invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The configured charset label is not supported.
    #[error("unknown charset '{label}'")]
    #[diagnostic(
        code(clirunner::unknown_charset),
        help("supported charsets are utf-8, latin-1 and ascii")
    )]
    UnknownCharset {
        /// Label as supplied by the caller.
        label: String,
    },

    /// Text input could not be encoded with the runner's charset.
    #[error("input cannot be encoded: {source}")]
    #[diagnostic(code(clirunner::encode_input))]
    EncodeInput {
        /// Underlying encoding failure.
        #[source]
        source: EncodeError,
    },

    /// A shell-syntax argument string could not be split.
    #[error("cannot split arguments {args:?}: unbalanced quotes or trailing escape")]
    #[diagnostic(code(clirunner::invalid_arguments))]
    InvalidArguments {
        /// The argument string as given.
        args: String,
    },

    /// An environment override names a variable that cannot exist.
    #[error("invalid environment variable name {key:?}")]
    #[diagnostic(
        code(clirunner::invalid_env_key),
        help("names must be non-empty and contain neither '=' nor NUL")
    )]
    InvalidEnvKey {
        /// The rejected name.
        key: String,
    },

    /// An environment override value contains a NUL byte.
    #[error("value for environment variable {key:?} contains a NUL byte")]
    #[diagnostic(code(clirunner::invalid_env_value))]
    InvalidEnvValue {
        /// Variable whose value was rejected.
        key: String,
    },

    /// `invoke` was called from inside a running target.
    #[error("an invocation is already running on this thread")]
    #[diagnostic(
        code(clirunner::reentrant),
        help("process-wide streams can only be isolated once at a time")
    )]
    Reentrant,

    /// The isolated working directory could not be prepared.
    #[error("failed to {action}: {source}")]
    #[diagnostic(code(clirunner::filesystem))]
    Filesystem {
        /// What was being attempted.
        action: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The target failed and exception catching was disabled.
    #[error(transparent)]
    Uncaught(anyhow::Error),
}

impl RunnerError {
    /// Return the target's own error when this is [`RunnerError::Uncaught`].
    ///
    /// # Errors
    ///
    /// Gives `self` back unchanged for every other variant.
    pub fn into_uncaught(self) -> Result<anyhow::Error, Self> {
        match self {
            Self::Uncaught(err) => Ok(err),
            other => Err(other),
        }
    }
}
