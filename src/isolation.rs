//! Scoped substitution of the process-wide streams and environment.
//!
//! [`Isolation`] installs captured standard streams and applies environment
//! overrides when opened, then puts every previous value back when dropped,
//! whether the scope ends normally, by early return, or by unwinding. Only
//! one scope may be open at a time; opening a second one from another
//! thread blocks until the first closes.

use std::{
    cell::Cell,
    ffi::OsString,
    fmt,
    io::{BufReader, Cursor, Read},
    sync::{Mutex, MutexGuard},
};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    charset::{Charset, EncodeErrors},
    error::RunnerError,
    stdio,
    streams::{
        EchoingStdin, InputSource, STDERR_NAME, STDOUT_NAME, SharedBuffer, StreamMixer,
        TextInput, TextOutput,
    },
};

/// Environment overrides: `Some` sets a variable, `None` removes it.
pub type EnvOverrides = IndexMap<String, Option<String>>;

static SCOPE_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static HOLDS_SCOPE: Cell<bool> = const { Cell::new(false) };
}

/// Exclusive right to mutate process-wide state.
struct ScopeLock {
    _guard: MutexGuard<'static, ()>,
}

impl ScopeLock {
    fn acquire() -> Result<Self, RunnerError> {
        if HOLDS_SCOPE.get() {
            return Err(RunnerError::Reentrant);
        }
        let guard = SCOPE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        HOLDS_SCOPE.set(true);
        Ok(Self { _guard: guard })
    }
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        HOLDS_SCOPE.set(false);
    }
}

/// Data fed to the substituted standard input.
#[derive(Default)]
pub enum Input {
    /// Empty input.
    #[default]
    None,
    /// Text, encoded with the runner's charset.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// An already-open source.
    Stream(Box<dyn InputSource>),
}

impl Input {
    /// Use `source` as standard input.
    #[must_use]
    pub fn stream(source: impl InputSource + 'static) -> Self {
        Self::Stream(Box::new(source))
    }

    /// Use a plain reader as standard input.
    #[must_use]
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::stream(BufReader::new(reader))
    }

    /// Turn the input into a byte source.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::EncodeInput`] when text cannot be represented
    /// in `charset`.
    pub fn into_source(self, charset: Charset) -> Result<Box<dyn InputSource>, RunnerError> {
        Ok(match self {
            Self::None => Box::new(Cursor::new(Vec::new())),
            Self::Text(text) => {
                let bytes = charset
                    .encode(&text, EncodeErrors::Strict)
                    .map_err(|source| RunnerError::EncodeInput { source })?;
                Box::new(Cursor::new(bytes))
            }
            Self::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Self::Stream(source) => source,
        })
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for Input {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Input {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Box<dyn InputSource>> for Input {
    fn from(source: Box<dyn InputSource>) -> Self {
        Self::Stream(source)
    }
}

/// Options shaping the streams an [`Isolation`] installs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    /// Charset for text conversion.
    pub charset: Charset,
    /// Echo standard input into standard output.
    pub echo_stdin: bool,
}

fn validate_overrides(env: &EnvOverrides) -> Result<(), RunnerError> {
    for (key, value) in env {
        if key.is_empty() || key.contains(['=', '\0']) {
            return Err(RunnerError::InvalidEnvKey { key: key.clone() });
        }
        if value.as_deref().is_some_and(|text| text.contains('\0')) {
            return Err(RunnerError::InvalidEnvValue { key: key.clone() });
        }
    }
    Ok(())
}

struct SavedStreams {
    stdin: Option<TextInput>,
    stdout: Option<TextOutput>,
    stderr: Option<TextOutput>,
}

/// An open isolation scope.
///
/// Dropping the scope restores the environment first, then the streams.
pub struct Isolation {
    mixer: StreamMixer,
    saved_env: Vec<(String, Option<OsString>)>,
    saved_streams: Option<SavedStreams>,
    _lock: ScopeLock,
}

impl Isolation {
    /// Open a scope feeding `input` to standard input and applying `env`.
    ///
    /// # Errors
    ///
    /// Fails before touching any process state when `input` cannot be
    /// encoded, an override is not a valid variable, or the calling thread
    /// already holds a scope.
    pub fn open(input: Input, env: &EnvOverrides, options: StreamOptions) -> Result<Self, RunnerError> {
        validate_overrides(env)?;
        let source = input.into_source(options.charset)?;
        let lock = ScopeLock::acquire()?;

        let mixer = StreamMixer::new();
        let stdin = if options.echo_stdin {
            let echoing = EchoingStdin::new(source, mixer.stdout.clone());
            TextInput::new(Box::new(echoing), options.charset).with_chunk_size(1)
        } else {
            TextInput::new(source, options.charset)
        };
        let stdout = TextOutput::new(mixer.stdout.clone(), STDOUT_NAME, options.charset);
        let stderr = TextOutput::new(mixer.stderr.clone(), STDERR_NAME, options.charset)
            .with_errors(EncodeErrors::BackslashReplace);

        let saved_streams = SavedStreams {
            stdin: stdio::replace_stdin(Some(stdin)),
            stdout: stdio::replace_stdout(Some(stdout)),
            stderr: stdio::replace_stderr(Some(stderr)),
        };
        let mut scope = Self {
            mixer,
            saved_env: Vec::with_capacity(env.len()),
            saved_streams: Some(saved_streams),
            _lock: lock,
        };
        scope.apply_env(env);
        debug!(
            charset = %options.charset,
            echo_stdin = options.echo_stdin,
            overrides = env.len(),
            "isolation scope opened"
        );
        Ok(scope)
    }

    fn apply_env(&mut self, env: &EnvOverrides) {
        for (key, value) in env {
            self.saved_env.push((key.clone(), std::env::var_os(key)));
            // SAFETY: `ScopeLock` serialises scopes and `Drop` restores the
            // previous value.
            match value {
                Some(text) => unsafe { std::env::set_var(key, text) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }

    fn restore_env(&mut self) {
        while let Some((key, previous)) = self.saved_env.pop() {
            // SAFETY: the scope lock is still held while restoring.
            match previous {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }

    fn restore_streams(&mut self) {
        if let Some(saved) = self.saved_streams.take() {
            stdio::replace_stdout(saved.stdout);
            stdio::replace_stderr(saved.stderr);
            stdio::replace_stdin(saved.stdin);
        }
    }

    /// Buffer holding standard output only.
    #[must_use]
    pub const fn stdout(&self) -> &SharedBuffer {
        self.mixer.stdout.buffer()
    }

    /// Buffer holding standard error only.
    #[must_use]
    pub const fn stderr(&self) -> &SharedBuffer {
        self.mixer.stderr.buffer()
    }

    /// Buffer holding both channels in write order.
    #[must_use]
    pub const fn output(&self) -> &SharedBuffer {
        &self.mixer.output
    }
}

impl Drop for Isolation {
    fn drop(&mut self) {
        self.restore_env();
        self.restore_streams();
        debug!("isolation scope closed");
    }
}

impl fmt::Debug for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isolation")
            .field("overrides", &self.saved_env.len())
            .field("output", &self.mixer.output.len())
            .finish_non_exhaustive()
    }
}
