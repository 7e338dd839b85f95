//! The CLI runner: configuration and single-call invocation.
//!
//! [`CliRunner::invoke`] opens an [`Isolation`] scope, installs the
//! argument vector, calls the target and classifies how it ended:
//!
//! - a normal return keeps the value and exits with 0, unless the value is
//!   a nonzero integer, which is handled as a termination request;
//! - a termination request exits with its code. A message value is written
//!   to standard output and exits with 1;
//! - any other error or panic is recorded with exit code 1, or propagated
//!   once process state is restored when catching is disabled.

mod hook;
mod report;

pub use report::Report;

use std::{
    backtrace::Backtrace,
    io::Write,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::Arc,
};

use tracing::debug;

use crate::{
    charset::Charset,
    config::RunnerConfig,
    error::RunnerError,
    exit::{ExitRequest, ExitValue, InvocationMarker},
    fs::IsolatedFilesystem,
    isolation::{EnvOverrides, Input, Isolation, StreamOptions},
    result::{Captured, ExitInfo, Failure, FailureKind, InvokeResult, Payload},
    stdio,
};

use hook::{PanicCapture, payload_message, take_record};

/// Program name used when none can be derived from the target.
pub const DEFAULT_PROG_NAME: &str = "main";

/// Arguments passed to the target after the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    /// Arguments used verbatim.
    List(Vec<String>),
    /// A command line split with POSIX shell quoting rules.
    Shell(String),
}

impl Args {
    /// Resolve into the argument list.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::InvalidArguments`] when a shell string has
    /// unbalanced quotes or a trailing escape.
    pub fn into_vec(self) -> Result<Vec<String>, RunnerError> {
        match self {
            Self::List(args) => Ok(args),
            Self::Shell(line) => match shlex::split(&line) {
                Some(args) => Ok(args),
                None => Err(RunnerError::InvalidArguments { args: line }),
            },
        }
    }
}

impl From<&str> for Args {
    fn from(line: &str) -> Self {
        Self::Shell(line.to_owned())
    }
}

impl From<String> for Args {
    fn from(line: String) -> Self {
        Self::Shell(line)
    }
}

impl From<Vec<String>> for Args {
    fn from(args: Vec<String>) -> Self {
        Self::List(args)
    }
}

impl From<Vec<&str>> for Args {
    fn from(args: Vec<&str>) -> Self {
        Self::List(args.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for Args {
    fn from(args: &[&str]) -> Self {
        Self::List(args.iter().copied().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Args {
    fn from(args: [&str; N]) -> Self {
        Self::List(args.into_iter().map(str::to_owned).collect())
    }
}

/// Per-call options for [`CliRunner::invoke_with`].
#[derive(Debug)]
pub struct InvokeOptions {
    args: Option<Args>,
    input: Input,
    env: EnvOverrides,
    catch_exceptions: bool,
    prog_name: Option<String>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            args: None,
            input: Input::None,
            env: EnvOverrides::new(),
            catch_exceptions: true,
            prog_name: None,
        }
    }
}

impl InvokeOptions {
    /// Options with no arguments, empty input and exception catching on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments following the program name.
    #[must_use]
    pub fn args(mut self, args: impl Into<Args>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Data for standard input.
    #[must_use]
    pub fn input(mut self, input: impl Into<Input>) -> Self {
        self.input = input.into();
        self
    }

    /// Set `key` for this call only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove `key` for this call only.
    #[must_use]
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env.insert(key.into(), None);
        self
    }

    /// Merge a prepared set of overrides.
    #[must_use]
    pub fn envs(mut self, overrides: EnvOverrides) -> Self {
        self.env.extend(overrides);
        self
    }

    /// Record failures in the result (`true`, the default) or propagate them.
    #[must_use]
    pub const fn catch_exceptions(mut self, catch: bool) -> Self {
        self.catch_exceptions = catch;
        self
    }

    /// Program name placed in `argv[0]`.
    #[must_use]
    pub fn prog_name(mut self, name: impl Into<String>) -> Self {
        self.prog_name = Some(name.into());
        self
    }
}

/// Invokes command line entry points in an isolated environment.
///
/// The runner mutates process-wide state while a call is running, so calls
/// are serialised: only one invocation runs at a time in a process.
#[derive(Debug, Clone, Default)]
pub struct CliRunner {
    charset: Charset,
    env: EnvOverrides,
    echo_stdin: bool,
}

impl CliRunner {
    /// Runner with UTF-8 text, no environment overrides and no echo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a runner from deserialised configuration.
    #[must_use]
    pub fn from_config(config: RunnerConfig) -> Self {
        Self {
            charset: config.charset,
            env: config.env,
            echo_stdin: config.echo_stdin,
        }
    }

    /// Use `charset` for text input and decoded output.
    #[must_use]
    pub const fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Set `key` for every invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove `key` for every invocation.
    #[must_use]
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.env.insert(key.into(), None);
        self
    }

    /// Copy bytes read from standard input into standard output.
    #[must_use]
    pub const fn with_echo_stdin(mut self, echo: bool) -> Self {
        self.echo_stdin = echo;
        self
    }

    /// Configured charset.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Baseline environment overrides.
    #[must_use]
    pub const fn env(&self) -> &EnvOverrides {
        &self.env
    }

    /// Whether standard input is echoed.
    #[must_use]
    pub const fn echo_stdin(&self) -> bool {
        self.echo_stdin
    }

    /// Program name derived from `cli`'s type: the last path segment of a
    /// named function, or [`DEFAULT_PROG_NAME`] for closures.
    #[must_use]
    pub fn get_default_prog_name<F>(&self, _cli: &F) -> String {
        default_prog_name::<F>()
    }

    /// The baseline overrides merged with `overrides`, which win on conflict.
    #[must_use]
    pub fn make_env(&self, overrides: Option<&EnvOverrides>) -> EnvOverrides {
        let mut merged = self.env.clone();
        if let Some(extra) = overrides {
            merged.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        merged
    }

    /// Open an isolation scope without invoking anything.
    ///
    /// # Errors
    ///
    /// See [`Isolation::open`].
    pub fn isolation(
        &self,
        input: impl Into<Input>,
        env: Option<&EnvOverrides>,
    ) -> Result<Isolation, RunnerError> {
        Isolation::open(input.into(), &self.make_env(env), self.stream_options())
    }

    /// Create a temporary directory and make it the working directory.
    ///
    /// When `temp_dir` is given the directory is created inside it and kept
    /// afterwards; otherwise it is removed when the guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Filesystem`] when the directory cannot be
    /// created or entered.
    pub fn isolated_filesystem(
        &self,
        temp_dir: Option<&Path>,
    ) -> Result<IsolatedFilesystem, RunnerError> {
        IsolatedFilesystem::create(temp_dir)
    }

    /// Invoke `cli` with no arguments and empty input.
    ///
    /// # Errors
    ///
    /// See [`CliRunner::invoke_with`].
    pub fn invoke<F, R>(&self, cli: F) -> Result<InvokeResult<R::Value>, RunnerError>
    where
        F: FnOnce() -> R,
        R: Report,
    {
        self.invoke_with(cli, InvokeOptions::new())
    }

    /// Invoke `cli` inside an isolation scope shaped by `options`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before anything runs, or
    /// [`RunnerError::Uncaught`] with the target's error when catching is
    /// disabled. A panic is resumed instead when catching is disabled.
    pub fn invoke_with<F, R>(
        &self,
        cli: F,
        options: InvokeOptions,
    ) -> Result<InvokeResult<R::Value>, RunnerError>
    where
        F: FnOnce() -> R,
        R: Report,
    {
        let InvokeOptions {
            args,
            input,
            env,
            catch_exceptions,
            prog_name,
        } = options;
        let program = prog_name.unwrap_or_else(default_prog_name::<F>);
        let call_args = args.map(Args::into_vec).transpose()?.unwrap_or_default();
        let scope = self.isolation(input, Some(&env))?;

        let outcome = {
            let mut argv = Vec::with_capacity(call_args.len() + 1);
            argv.push(program);
            argv.extend(call_args);
            let _argv = ArgvGuard::install(argv);
            let _marker = InvocationMarker::enter();
            let _hook = PanicCapture::install(!catch_exceptions);
            let caught = panic::catch_unwind(AssertUnwindSafe(|| {
                cli().report().map(|value| {
                    let request = R::exit_request(&value);
                    (value, request)
                })
            }));
            classify(caught, catch_exceptions)
        };

        flush_outputs();
        let stdout_bytes = scope.stdout().contents();
        let stderr_bytes = scope.stderr().contents();
        let output_bytes = scope.output().contents();
        drop(scope);

        match outcome {
            Outcome::Finished(finished) => Ok(InvokeResult::new(
                self.charset,
                Captured {
                    stdout_bytes,
                    stderr_bytes,
                    output_bytes,
                    return_value: finished.return_value,
                    exit_code: finished.exit_code,
                    exception: finished.exception,
                    exit_info: finished.exit_info,
                },
            )),
            Outcome::PropagateError(err) => Err(RunnerError::Uncaught(err)),
            Outcome::PropagatePanic(payload) => panic::resume_unwind(payload),
        }
    }

    const fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            charset: self.charset,
            echo_stdin: self.echo_stdin,
        }
    }
}

fn default_prog_name<F>() -> String {
    let full = std::any::type_name::<F>();
    let anonymous = full.starts_with("fn(")
        || full.starts_with('&')
        || full.contains("{{closure}}")
        || full.contains("dyn ");
    if anonymous {
        return DEFAULT_PROG_NAME.to_owned();
    }
    let base = full.split('<').next().unwrap_or(full);
    let last = base.rsplit("::").next().unwrap_or(base);
    let is_identifier = !last.is_empty()
        && last
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_');
    if is_identifier {
        last.to_owned()
    } else {
        DEFAULT_PROG_NAME.to_owned()
    }
}

/// Installs an argument vector until dropped.
struct ArgvGuard {
    previous: Option<Vec<String>>,
}

impl ArgvGuard {
    fn install(argv: Vec<String>) -> Self {
        debug!(?argv, "argument vector installed");
        Self {
            previous: stdio::replace_args(Some(argv)),
        }
    }
}

impl Drop for ArgvGuard {
    fn drop(&mut self) {
        stdio::replace_args(self.previous.take());
    }
}

fn flush_outputs() {
    for mut handle in [stdio::stdout(), stdio::stderr()] {
        if let Err(err) = handle.flush() {
            debug!(stream = %handle.name(), "flush failed: {err}");
        }
    }
}

struct Finished<T> {
    return_value: Option<T>,
    exit_code: i32,
    exception: Option<Failure>,
    exit_info: Option<ExitInfo>,
}

enum Outcome<T> {
    Finished(Finished<T>),
    PropagateError(anyhow::Error),
    PropagatePanic(Box<dyn std::any::Any + Send>),
}

type Caught<T> = std::thread::Result<anyhow::Result<(T, Option<ExitRequest>)>>;

fn classify<T>(caught: Caught<T>, catch_exceptions: bool) -> Outcome<T> {
    match caught {
        Ok(Ok((value, None))) => {
            debug!(exit_code = 0, "target returned");
            Outcome::Finished(Finished {
                return_value: Some(value),
                exit_code: 0,
                exception: None,
                exit_info: None,
            })
        }
        Ok(Ok((value, Some(request)))) => Outcome::Finished(exited(Some(value), request)),
        Ok(Err(err)) => match err.downcast::<ExitRequest>() {
            Ok(request) => Outcome::Finished(exited(None, request)),
            Err(other) if !catch_exceptions => {
                debug!(error = %other, "target failed; propagating");
                Outcome::PropagateError(other)
            }
            Err(other) => {
                let message = format!("{other:#}");
                Outcome::Finished(failed(Payload::Error(other), message, None, Backtrace::capture()))
            }
        },
        Err(payload) => match payload.downcast::<ExitRequest>() {
            Ok(request) => Outcome::Finished(exited(None, *request)),
            Err(other) if !catch_exceptions => {
                debug!("target panicked; propagating");
                Outcome::PropagatePanic(other)
            }
            Err(other) => {
                let (message, location, backtrace) = take_record().map_or_else(
                    || (payload_message(other.as_ref()), None, Backtrace::capture()),
                    |record| (record.message, record.location, record.backtrace),
                );
                Outcome::Finished(failed(Payload::Panic(other), message, location, backtrace))
            }
        },
    }
}

fn exited<T>(return_value: Option<T>, request: ExitRequest) -> Finished<T> {
    let backtrace = Arc::new(Backtrace::capture());
    let exit_info = Some(ExitInfo {
        kind: FailureKind::Exit,
        message: request.value().to_string(),
        backtrace: Arc::clone(&backtrace),
    });
    let exit_code = request.exit_code();
    if let ExitValue::Message(message) = request.value() {
        let mut out = stdio::stdout();
        if let Err(err) = out.write_str(message).and_then(|()| out.write_str("\n")) {
            debug!("failed to report exit message: {err}");
        }
    }
    debug!(exit_code, value = %request.value(), "target requested exit");
    let exception = (!request.value().is_success()).then(|| {
        let message = request.value().to_string();
        Failure::new(Payload::Exit(request), message, None, backtrace)
    });
    Finished {
        return_value,
        exit_code,
        exception,
        exit_info,
    }
}

fn failed<T>(
    payload: Payload,
    message: String,
    location: Option<String>,
    captured: Backtrace,
) -> Finished<T> {
    let backtrace = Arc::new(captured);
    let failure = Failure::new(payload, message, location, Arc::clone(&backtrace));
    debug!(kind = %failure.kind(), message = failure.message(), "target failed");
    let exit_info = Some(ExitInfo {
        kind: failure.kind(),
        message: failure.message().to_owned(),
        backtrace,
    });
    Finished {
        return_value: None,
        exit_code: 1,
        exception: Some(failure),
        exit_info,
    }
}
