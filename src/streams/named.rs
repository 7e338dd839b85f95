//! Text adapters that give the substituted streams stable identities.
//!
//! Target code asking a stream for its name or mode sees `<stdin>`,
//! `<stdout>` or `<stderr>` regardless of which buffer sits underneath.

use std::{
    fmt,
    io::{self, Read, Write},
};

use crate::charset::{Charset, EncodeErrors};

use super::echo::InputSource;

/// Name reported by the substituted standard input.
pub const STDIN_NAME: &str = "<stdin>";
/// Name reported by the substituted standard output.
pub const STDOUT_NAME: &str = "<stdout>";
/// Name reported by the substituted standard error.
pub const STDERR_NAME: &str = "<stderr>";

/// Bytes fetched from the source per refill of the text buffer.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

fn invalid_data(err: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Writable text stream over a byte sink.
pub struct TextOutput {
    sink: Box<dyn Write + Send>,
    name: &'static str,
    charset: Charset,
    errors: EncodeErrors,
}

impl TextOutput {
    /// Wrap `sink`, reporting `name` and encoding text with `charset`.
    #[must_use]
    pub fn new(sink: impl Write + Send + 'static, name: &'static str, charset: Charset) -> Self {
        Self {
            sink: Box::new(sink),
            name,
            charset,
            errors: EncodeErrors::Strict,
        }
    }

    /// Use `errors` for characters the charset cannot represent.
    #[must_use]
    pub const fn with_errors(mut self, errors: EncodeErrors) -> Self {
        self.errors = errors;
        self
    }

    /// Reported stream name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Reported stream mode.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        "w"
    }

    /// Charset applied by [`TextOutput::write_str`].
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Encode `text` and write it to the sink.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::InvalidData`] when `text` cannot be
    /// encoded under the strict policy, or with the sink's own error.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        let bytes = self
            .charset
            .encode(text, self.errors)
            .map_err(invalid_data)?;
        self.sink.write_all(&bytes)
    }
}

impl Write for TextOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl fmt::Debug for TextOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextOutput")
            .field("name", &self.name)
            .field("charset", &self.charset)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Readable text stream over an [`InputSource`].
///
/// Text reads see universal newlines: `\r\n` and a lone `\r` both arrive
/// as `\n`. Byte reads through [`Read`] are untranslated.
///
/// Text reads refill an internal buffer `chunk_size` bytes at a time. With
/// echoing enabled the chunk size is one, so input is echoed only as it is
/// consumed and prompts written between reads stay in order.
pub struct TextInput {
    source: Box<dyn InputSource>,
    pending: Vec<u8>,
    chunk_size: usize,
    charset: Charset,
}

impl TextInput {
    /// Wrap `source`, decoding text with `charset`.
    #[must_use]
    pub fn new(source: Box<dyn InputSource>, charset: Charset) -> Self {
        Self {
            source,
            pending: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            charset,
        }
    }

    /// Refill at most `chunk_size` bytes at a time (minimum one).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Reported stream name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        STDIN_NAME
    }

    /// Reported stream mode.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        "r"
    }

    /// Current refill granularity.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Pause or resume echo on the underlying source.
    pub fn set_echo_paused(&mut self, paused: bool) -> bool {
        self.source.set_echo_paused(paused)
    }

    fn refill(&mut self) -> io::Result<bool> {
        let chunk = self.source.read1(self.chunk_size)?;
        if chunk.is_empty() {
            return Ok(false);
        }
        self.pending.extend_from_slice(&chunk);
        Ok(true)
    }

    /// Length of the first complete line in `pending`, terminator included.
    ///
    /// A `\r` at the very end is not complete until the next byte shows
    /// whether it starts a `\r\n` pair.
    fn complete_line_len(&self) -> Option<usize> {
        let end = self
            .pending
            .iter()
            .position(|&byte| byte == b'\n' || byte == b'\r')?;
        match (self.pending.get(end), self.pending.get(end + 1)) {
            (Some(b'\r'), Some(b'\n')) => Some(end + 2),
            (Some(b'\r'), None) => None,
            _ => Some(end + 1),
        }
    }

    fn next_line_bytes(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(len) = self.complete_line_len() {
                return Ok(self.pending.drain(..len).collect());
            }
            if !self.refill()? {
                return Ok(std::mem::take(&mut self.pending));
            }
        }
    }

    /// Decode `bytes`, translating `\r\n` and lone `\r` to `\n`.
    fn decode(&self, bytes: &[u8]) -> io::Result<String> {
        let text = self.charset.decode(bytes).map_err(invalid_data)?;
        Ok(if text.contains('\r') {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text
        })
    }

    /// Append the next line, including its newline, to `buf`.
    ///
    /// Returns the number of bytes consumed; zero means end of input.
    ///
    /// # Errors
    ///
    /// Fails when the source errors or the line cannot be decoded.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        let bytes = self.next_line_bytes()?;
        buf.push_str(&self.decode(&bytes)?);
        Ok(bytes.len())
    }

    /// Append all remaining input to `buf`.
    ///
    /// # Errors
    ///
    /// Fails when the source errors or the input cannot be decoded.
    pub fn read_to_string(&mut self, buf: &mut String) -> io::Result<usize> {
        while self.refill()? {}
        let bytes = std::mem::take(&mut self.pending);
        buf.push_str(&self.decode(&bytes)?);
        Ok(bytes.len())
    }

    /// Iterate over the remaining lines without their line terminators.
    #[must_use]
    pub fn lines(&mut self) -> TextLines<'_> {
        TextLines { input: self }
    }
}

impl Read for TextInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            let chunk = self.source.read1(buf.len())?;
            return Ok(copy_prefix(buf, &chunk));
        }
        let count = copy_prefix(buf, &self.pending);
        self.pending.drain(..count);
        Ok(count)
    }
}

fn copy_prefix(dest: &mut [u8], src: &[u8]) -> usize {
    let count = dest.len().min(src.len());
    if let (Some(head), Some(bytes)) = (dest.get_mut(..count), src.get(..count)) {
        head.copy_from_slice(bytes);
    }
    count
}

impl fmt::Debug for TextInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextInput")
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.pending.len())
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

/// Lines of a [`TextInput`], with their terminator stripped.
#[derive(Debug)]
pub struct TextLines<'a> {
    input: &'a mut TextInput,
}

impl Iterator for TextLines<'_> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}
