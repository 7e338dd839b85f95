//! Process-wide standard stream and argument slots.
//!
//! Programs exercised by the runner read and write through these handles
//! instead of `std::io`. Outside an isolation scope every handle forwards
//! to the real process streams and [`args`] reports `std::env::args`; while
//! a scope is open they reach the substitutes installed by
//! [`Isolation`](crate::isolation::Isolation).

use std::{
    borrow::Cow,
    fmt,
    io::{self, BufRead, Read, Write},
    sync::{Mutex, MutexGuard},
};

use crate::streams::{STDERR_NAME, STDIN_NAME, STDOUT_NAME, TextInput, TextOutput};

static STDIN: Mutex<Option<TextInput>> = Mutex::new(None);
static STDOUT: Mutex<Option<TextOutput>> = Mutex::new(None);
static STDERR: Mutex<Option<TextOutput>> = Mutex::new(None);
static ARGV: Mutex<Option<Vec<String>>> = Mutex::new(None);

fn lock<T>(slot: &'static Mutex<T>) -> MutexGuard<'static, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Install `stream` as standard input, returning the previous occupant.
pub(crate) fn replace_stdin(stream: Option<TextInput>) -> Option<TextInput> {
    std::mem::replace(&mut *lock(&STDIN), stream)
}

/// Install `stream` as standard output, returning the previous occupant.
pub(crate) fn replace_stdout(stream: Option<TextOutput>) -> Option<TextOutput> {
    std::mem::replace(&mut *lock(&STDOUT), stream)
}

/// Install `stream` as standard error, returning the previous occupant.
pub(crate) fn replace_stderr(stream: Option<TextOutput>) -> Option<TextOutput> {
    std::mem::replace(&mut *lock(&STDERR), stream)
}

/// Install `argv` as the argument vector, returning the previous occupant.
pub(crate) fn replace_args(argv: Option<Vec<String>>) -> Option<Vec<String>> {
    std::mem::replace(&mut *lock(&ARGV), argv)
}

/// Return `true` while substitute streams are installed.
#[must_use]
pub fn is_captured() -> bool {
    lock(&STDOUT).is_some()
}

/// Current argument vector, program name first.
#[must_use]
pub fn args() -> Vec<String> {
    lock(&ARGV)
        .clone()
        .unwrap_or_else(|| std::env::args().collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Out,
    Err,
}

impl Channel {
    const fn slot(self) -> &'static Mutex<Option<TextOutput>> {
        match self {
            Self::Out => &STDOUT,
            Self::Err => &STDERR,
        }
    }

    const fn default_name(self) -> &'static str {
        match self {
            Self::Out => STDOUT_NAME,
            Self::Err => STDERR_NAME,
        }
    }

    fn with_stream<R>(
        self,
        installed: impl FnOnce(&mut TextOutput) -> R,
        real: impl FnOnce(&mut dyn Write) -> R,
    ) -> R {
        let mut guard = lock(self.slot());
        match guard.as_mut() {
            Some(stream) => installed(stream),
            None => match self {
                Self::Out => real(&mut io::stdout().lock()),
                Self::Err => real(&mut io::stderr().lock()),
            },
        }
    }
}

/// Handle to the current standard output.
///
/// `write`/`write_all` send raw bytes; formatted writes (`write!`,
/// `writeln!`) and [`OutputHandle::write_str`] are encoded with the active
/// charset.
#[derive(Clone, Copy)]
pub struct OutputHandle {
    channel: Channel,
}

/// Handle to the current standard output.
#[must_use]
pub const fn stdout() -> OutputHandle {
    OutputHandle {
        channel: Channel::Out,
    }
}

/// Handle to the current standard error.
#[must_use]
pub const fn stderr() -> OutputHandle {
    OutputHandle {
        channel: Channel::Err,
    }
}

impl OutputHandle {
    /// Name of the stream currently behind this handle.
    #[must_use]
    pub fn name(&self) -> String {
        self.channel.with_stream(
            |stream| stream.name().to_owned(),
            |_| self.channel.default_name().to_owned(),
        )
    }

    /// Mode of the stream currently behind this handle.
    #[must_use]
    pub fn mode(&self) -> String {
        self.channel
            .with_stream(|stream| stream.mode().to_owned(), |_| "w".to_owned())
    }

    /// Write `text` encoded with the active charset.
    ///
    /// # Errors
    ///
    /// Propagates encoding failures (standard output only; standard error
    /// escapes) and write errors.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.channel.with_stream(
            |stream| stream.write_str(text),
            |real| real.write_all(text.as_bytes()),
        )
    }
}

impl Write for OutputHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel
            .with_stream(|stream| stream.write(buf), |real| real.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel
            .with_stream(TextOutput::flush, |real| real.flush())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let text = args
            .as_str()
            .map_or_else(|| Cow::Owned(args.to_string()), Cow::Borrowed);
        self.write_str(&text)
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("name", &self.channel.default_name())
            .finish_non_exhaustive()
    }
}

/// Handle to the current standard input.
#[derive(Debug, Clone, Copy)]
pub struct InputHandle;

/// Handle to the current standard input.
#[must_use]
pub const fn stdin() -> InputHandle {
    InputHandle
}

impl InputHandle {
    fn with_stream<R>(
        installed: impl FnOnce(&mut TextInput) -> R,
        real: impl FnOnce(&mut io::StdinLock<'static>) -> R,
    ) -> R {
        let mut guard = lock(&STDIN);
        match guard.as_mut() {
            Some(stream) => installed(stream),
            None => real(&mut io::stdin().lock()),
        }
    }

    /// Name of the stream currently behind this handle.
    #[must_use]
    pub fn name(&self) -> String {
        Self::with_stream(|stream| stream.name().to_owned(), |_| STDIN_NAME.to_owned())
    }

    /// Mode of the stream currently behind this handle.
    #[must_use]
    pub fn mode(&self) -> String {
        Self::with_stream(|stream| stream.mode().to_owned(), |_| "r".to_owned())
    }

    /// Append the next line, newline included, to `buf`.
    ///
    /// # Errors
    ///
    /// Propagates read and decoding failures.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match lock(&STDIN).as_mut() {
            Some(stream) => stream.read_line(buf),
            None => io::stdin().lock().read_line(buf),
        }
    }

    /// Append the remaining input to `buf`.
    ///
    /// # Errors
    ///
    /// Propagates read and decoding failures.
    pub fn read_to_string(&mut self, buf: &mut String) -> io::Result<usize> {
        match lock(&STDIN).as_mut() {
            Some(stream) => stream.read_to_string(buf),
            None => io::stdin().lock().read_to_string(buf),
        }
    }

    /// Iterate over the remaining lines without their terminators.
    #[must_use]
    pub const fn lines(self) -> InputLines {
        InputLines { handle: self }
    }

    /// Suspend or resume echoing of input; returns `false` when the current
    /// standard input does not echo.
    pub fn set_echo_paused(&mut self, paused: bool) -> bool {
        Self::with_stream(|stream| stream.set_echo_paused(paused), |_| false)
    }
}

impl Read for InputHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match lock(&STDIN).as_mut() {
            Some(stream) => stream.read(buf),
            None => io::stdin().lock().read(buf),
        }
    }
}

/// Lines read through an [`InputHandle`].
#[derive(Debug)]
pub struct InputLines {
    handle: InputHandle,
}

impl Iterator for InputLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.handle.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                Some(Ok(trimmed.strip_suffix('\r').unwrap_or(trimmed).to_owned()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Write `text` to standard output, then read one line from standard input.
///
/// The returned line has its terminator removed.
///
/// # Errors
///
/// Fails with [`io::ErrorKind::UnexpectedEof`] when input is exhausted, or
/// with any read, write or decoding failure.
pub fn prompt(text: &str) -> io::Result<String> {
    let mut out = stdout();
    out.write_str(text)?;
    out.flush()?;
    let mut line = String::new();
    if stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "end of input while reading a line",
        ));
    }
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    Ok(trimmed.strip_suffix('\r').unwrap_or(trimmed).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        charset::Charset,
        isolation::{EnvOverrides, Input, Isolation, StreamOptions},
    };
    use serial_test::serial;

    #[test]
    #[serial]
    fn formatted_writes_are_encoded_with_the_charset() {
        let options = StreamOptions {
            charset: Charset::Latin1,
            echo_stdin: false,
        };
        let scope = Isolation::open(Input::None, &EnvOverrides::new(), options).expect("open scope");
        let word = "café";
        write!(stdout(), "plain ").expect("literal write");
        writeln!(stdout(), "{word}").expect("formatted write");
        assert_eq!(scope.stdout().contents(), b"plain caf\xe9\n");
    }

    #[test]
    #[serial]
    fn formatted_writes_fail_on_unencodable_text() {
        let options = StreamOptions {
            charset: Charset::Ascii,
            echo_stdin: false,
        };
        let scope = Isolation::open(Input::None, &EnvOverrides::new(), options).expect("open scope");
        let err = write!(stdout(), "{}", 'é').expect_err("strict stdout");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        write!(stderr(), "{}", 'é').expect("stderr escapes");
        assert_eq!(scope.stderr().contents(), b"\\xe9");
    }
}
