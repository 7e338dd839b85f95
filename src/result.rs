//! The record produced by one invocation.

use std::{any::Any, backtrace::Backtrace, fmt, sync::Arc};

use crate::{charset::Charset, exit::ExitRequest};

/// How an invocation stopped short of a normal return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The target requested termination.
    Exit,
    /// The target returned an error.
    Error,
    /// The target panicked.
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exit => "exit",
            Self::Error => "error",
            Self::Panic => "panic",
        })
    }
}

/// Original value a [`Failure`] was built from.
pub(crate) enum Payload {
    Exit(ExitRequest),
    Error(anyhow::Error),
    Panic(Box<dyn Any + Send>),
}

/// A captured failure: what kind it was, its message, where it came from
/// and the value that caused it.
pub struct Failure {
    kind: FailureKind,
    message: String,
    location: Option<String>,
    backtrace: Arc<Backtrace>,
    payload: Payload,
}

impl Failure {
    pub(crate) fn new(
        payload: Payload,
        message: String,
        location: Option<String>,
        backtrace: Arc<Backtrace>,
    ) -> Self {
        let kind = match payload {
            Payload::Exit(_) => FailureKind::Exit,
            Payload::Error(_) => FailureKind::Error,
            Payload::Panic(_) => FailureKind::Panic,
        };
        Self {
            kind,
            message,
            location,
            backtrace,
            payload,
        }
    }

    /// Classification of the failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Rendered failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line:column` of a panic, when known.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Backtrace captured when the failure was classified.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// The termination request, when this failure is one.
    #[must_use]
    pub const fn exit_request(&self) -> Option<&ExitRequest> {
        match &self.payload {
            Payload::Exit(request) => Some(request),
            Payload::Error(_) | Payload::Panic(_) => None,
        }
    }

    /// The target's error, when it returned one.
    #[must_use]
    pub const fn error(&self) -> Option<&anyhow::Error> {
        match &self.payload {
            Payload::Error(err) => Some(err),
            Payload::Exit(_) | Payload::Panic(_) => None,
        }
    }

    /// Return `true` when the underlying value is an `E`.
    #[must_use]
    pub fn is<E: fmt::Display + fmt::Debug + Send + Sync + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Borrow the underlying value as an `E`.
    ///
    /// Looks through returned errors, panic payloads and exit requests.
    #[must_use]
    pub fn downcast_ref<E: fmt::Display + fmt::Debug + Send + Sync + 'static>(&self) -> Option<&E> {
        match &self.payload {
            Payload::Exit(request) => (request as &dyn Any).downcast_ref(),
            Payload::Error(err) => err.downcast_ref(),
            Payload::Panic(payload) => payload.downcast_ref(),
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Origin of a termination: its kind, message and backtrace.
#[derive(Debug, Clone)]
pub struct ExitInfo {
    /// Classification of the termination.
    pub kind: FailureKind,
    /// Rendered value or message.
    pub message: String,
    /// Backtrace captured at classification, shared with the [`Failure`].
    pub backtrace: Arc<Backtrace>,
}

/// Captured outcome of one invocation.
///
/// `T` is the value type the target returns on success.
pub struct InvokeResult<T> {
    charset: Charset,
    stdout_bytes: Vec<u8>,
    stderr_bytes: Vec<u8>,
    output_bytes: Vec<u8>,
    return_value: Option<T>,
    exit_code: i32,
    exception: Option<Failure>,
    exit_info: Option<ExitInfo>,
}

/// Everything needed to build an [`InvokeResult`].
pub(crate) struct Captured<T> {
    pub(crate) stdout_bytes: Vec<u8>,
    pub(crate) stderr_bytes: Vec<u8>,
    pub(crate) output_bytes: Vec<u8>,
    pub(crate) return_value: Option<T>,
    pub(crate) exit_code: i32,
    pub(crate) exception: Option<Failure>,
    pub(crate) exit_info: Option<ExitInfo>,
}

impl<T> InvokeResult<T> {
    pub(crate) fn new(charset: Charset, captured: Captured<T>) -> Self {
        Self {
            charset,
            stdout_bytes: captured.stdout_bytes,
            stderr_bytes: captured.stderr_bytes,
            output_bytes: captured.output_bytes,
            return_value: captured.return_value,
            exit_code: captured.exit_code,
            exception: captured.exception,
            exit_info: captured.exit_info,
        }
    }

    /// Raw bytes written to standard output.
    #[must_use]
    pub fn stdout_bytes(&self) -> &[u8] {
        &self.stdout_bytes
    }

    /// Raw bytes written to standard error.
    #[must_use]
    pub fn stderr_bytes(&self) -> &[u8] {
        &self.stderr_bytes
    }

    /// Both channels interleaved as a terminal would show them.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        &self.output_bytes
    }

    /// Standard output decoded with the runner's charset.
    #[must_use]
    pub fn stdout(&self) -> String {
        self.charset.decode_lossy(&self.stdout_bytes)
    }

    /// Standard error decoded with the runner's charset.
    #[must_use]
    pub fn stderr(&self) -> String {
        self.charset.decode_lossy(&self.stderr_bytes)
    }

    /// Combined transcript decoded with the runner's charset.
    #[must_use]
    pub fn output(&self) -> String {
        self.charset.decode_lossy(&self.output_bytes)
    }

    /// Value the target returned, if it returned.
    #[must_use]
    pub const fn return_value(&self) -> Option<&T> {
        self.return_value.as_ref()
    }

    /// Take ownership of the returned value.
    #[must_use]
    pub fn into_return_value(self) -> Option<T> {
        self.return_value
    }

    /// Process exit status the invocation maps to.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// The failure recorded for this invocation, if any.
    #[must_use]
    pub const fn exception(&self) -> Option<&Failure> {
        self.exception.as_ref()
    }

    /// Origin of the termination, absent after a normal return.
    #[must_use]
    pub const fn exit_info(&self) -> Option<&ExitInfo> {
        self.exit_info.as_ref()
    }

    /// Charset used by the text accessors.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }
}

impl<T> fmt::Display for InvokeResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.exception {
            Some(failure) => write!(f, "<Result {failure}>"),
            None => f.write_str("<Result okay>"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for InvokeResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeResult")
            .field("exit_code", &self.exit_code)
            .field("return_value", &self.return_value)
            .field("exception", &self.exception)
            .field("output", &self.output())
            .finish_non_exhaustive()
    }
}
