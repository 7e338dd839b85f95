//! Explicit termination requests.
//!
//! A target ends itself early with [`exit`], or by returning an
//! [`ExitRequest`] as its error. Inside an invocation the request unwinds
//! back to the runner, which turns it into an exit code; elsewhere [`exit`]
//! terminates the process like `std::process::exit`.

use std::{cell::Cell, fmt, io::Write};

use thiserror::Error;

use crate::stdio;

thread_local! {
    static ACTIVE_INVOCATIONS: Cell<usize> = const { Cell::new(0) };
}

/// Marks an invocation as running on the current thread for as long as it
/// is alive.
#[derive(Debug)]
pub(crate) struct InvocationMarker(());

impl InvocationMarker {
    pub(crate) fn enter() -> Self {
        ACTIVE_INVOCATIONS.set(ACTIVE_INVOCATIONS.get() + 1);
        Self(())
    }
}

impl Drop for InvocationMarker {
    fn drop(&mut self) {
        ACTIVE_INVOCATIONS.set(ACTIVE_INVOCATIONS.get().saturating_sub(1));
    }
}

fn invocation_active() -> bool {
    ACTIVE_INVOCATIONS.get() > 0
}

/// Value carried by an [`ExitRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExitValue {
    /// No value; equivalent to code 0.
    #[default]
    Unset,
    /// Integer exit status.
    Code(i32),
    /// Any other value, rendered as text. Reported on standard output and
    /// mapped to exit status 1.
    Message(String),
}

impl ExitValue {
    /// Exit status this value maps to.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Unset => 0,
            Self::Code(code) => *code,
            Self::Message(_) => 1,
        }
    }

    /// Return `true` when the value is equivalent to a successful exit.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Unset | Self::Code(0))
    }
}

impl fmt::Display for ExitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("None"),
            Self::Code(code) => write!(f, "{code}"),
            Self::Message(message) => f.write_str(message),
        }
    }
}

impl From<()> for ExitValue {
    fn from((): ()) -> Self {
        Self::Unset
    }
}

impl From<i32> for ExitValue {
    fn from(code: i32) -> Self {
        Self::Code(code)
    }
}

impl From<u8> for ExitValue {
    fn from(code: u8) -> Self {
        Self::Code(i32::from(code))
    }
}

impl From<Option<i32>> for ExitValue {
    fn from(code: Option<i32>) -> Self {
        code.map_or(Self::Unset, Self::Code)
    }
}

impl From<f64> for ExitValue {
    fn from(value: f64) -> Self {
        Self::Message(format!("{value:?}"))
    }
}

impl From<&str> for ExitValue {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<String> for ExitValue {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

/// A target's request to stop with a particular status or message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("exit requested with {value}")]
pub struct ExitRequest {
    value: ExitValue,
}

impl ExitRequest {
    /// Request termination with `value`.
    #[must_use]
    pub fn new(value: impl Into<ExitValue>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Request termination with an integer status.
    #[must_use]
    pub const fn code(code: i32) -> Self {
        Self {
            value: ExitValue::Code(code),
        }
    }

    /// The requested value.
    #[must_use]
    pub const fn value(&self) -> &ExitValue {
        &self.value
    }

    /// Exit status the request maps to.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.value.code()
    }
}

/// Stop the running target with `value`.
///
/// On the thread running an invocation this unwinds to the runner with an
/// [`ExitRequest`] payload. Anywhere else, including threads spawned by the
/// target, it writes a message value to standard error and exits the
/// process.
pub fn exit(value: impl Into<ExitValue>) -> ! {
    let request = ExitRequest::new(value);
    if invocation_active() {
        std::panic::panic_any(request);
    }
    if let ExitValue::Message(message) = request.value() {
        let mut err = stdio::stderr();
        if writeln!(err, "{message}").is_err() {
            tracing::debug!("failed to report exit message");
        }
    }
    std::process::exit(request.exit_code())
}
