//! Input sources and the echoing wrapper placed in front of them.

use std::{
    fmt,
    io::{self, BufRead, Read, Write},
};

/// Read operations the substituted standard input must support.
///
/// Every `BufRead + Send` type is an input source. [`EchoingStdin`] layers
/// echoing on top of another source through the same interface.
pub trait InputSource: Send {
    /// Read up to `limit` bytes, or everything that remains when `None`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    fn read_chunk(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>>;

    /// Read at most `limit` bytes using at most one fetch from the source.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    fn read1(&mut self, limit: usize) -> io::Result<Vec<u8>>;

    /// Read through the next `\n` (inclusive), capped at `limit` bytes.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    fn read_line(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>>;

    /// Read every remaining line.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line(None)?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// Pause or resume echoing; returns `false` when the source never echoes.
    fn set_echo_paused(&mut self, _paused: bool) -> bool {
        false
    }
}

fn limit_as_u64(limit: usize) -> u64 {
    u64::try_from(limit).unwrap_or(u64::MAX)
}

impl<R: BufRead + Send> InputSource for R {
    fn read_chunk(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match limit {
            Some(max) => self.by_ref().take(limit_as_u64(max)).read_to_end(&mut out)?,
            None => self.read_to_end(&mut out)?,
        };
        Ok(out)
    }

    fn read1(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        let available = self.fill_buf()?;
        let count = available.len().min(limit);
        let out = available.get(..count).map(<[u8]>::to_vec).unwrap_or_default();
        self.consume(count);
        Ok(out)
    }

    fn read_line(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match limit {
            Some(max) => self
                .by_ref()
                .take(limit_as_u64(max))
                .read_until(b'\n', &mut out)?,
            None => self.read_until(b'\n', &mut out)?,
        };
        Ok(out)
    }
}

/// Iterator over the lines of an [`InputSource`].
pub struct SourceLines<'a> {
    source: &'a mut dyn InputSource,
}

impl<'a> SourceLines<'a> {
    /// Iterate lines of `source` until end of input.
    #[must_use]
    pub const fn new(source: &'a mut dyn InputSource) -> Self {
        Self { source }
    }
}

impl Iterator for SourceLines<'_> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.read_line(None) {
            Ok(line) if line.is_empty() => None,
            other => Some(other),
        }
    }
}

/// Input source that copies every byte it delivers into an output sink.
///
/// Only bytes actually returned to the caller are echoed; reaching end of
/// input echoes nothing.
pub struct EchoingStdin {
    input: Box<dyn InputSource>,
    output: Box<dyn Write + Send>,
    paused: bool,
}

impl EchoingStdin {
    /// Wrap `input`, echoing into `output`.
    #[must_use]
    pub fn new(input: Box<dyn InputSource>, output: impl Write + Send + 'static) -> Self {
        Self {
            input,
            output: Box::new(output),
            paused: false,
        }
    }

    /// Return `true` while echoing is suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    fn echo(&mut self, bytes: Vec<u8>) -> io::Result<Vec<u8>> {
        if !self.paused && !bytes.is_empty() {
            self.output.write_all(&bytes)?;
        }
        Ok(bytes)
    }
}

impl InputSource for EchoingStdin {
    fn read_chunk(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        let bytes = self.input.read_chunk(limit)?;
        self.echo(bytes)
    }

    fn read1(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        let bytes = self.input.read1(limit)?;
        self.echo(bytes)
    }

    fn read_line(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        let bytes = self.input.read_line(limit)?;
        self.echo(bytes)
    }

    fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>> {
        self.input
            .read_lines()?
            .into_iter()
            .map(|line| self.echo(line))
            .collect()
    }

    fn set_echo_paused(&mut self, paused: bool) -> bool {
        self.paused = paused;
        true
    }
}

impl fmt::Debug for EchoingStdin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoingStdin")
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{EchoingStdin, InputSource, SourceLines};
    use crate::streams::mixer::SharedBuffer;
    use std::io::Cursor;

    fn echoing(input: &'static [u8]) -> (EchoingStdin, SharedBuffer) {
        let sink = SharedBuffer::new();
        let stdin = EchoingStdin::new(Box::new(Cursor::new(input)), sink.clone());
        (stdin, sink)
    }

    #[test]
    fn echoes_bytes_delivered_not_bytes_requested() {
        let (mut stdin, sink) = echoing(b"abc");
        let chunk = stdin.read_chunk(Some(4096)).expect("read");
        assert_eq!(chunk, b"abc");
        assert_eq!(sink.contents(), b"abc");
    }

    #[test]
    fn end_of_input_echoes_nothing() {
        let (mut stdin, sink) = echoing(b"");
        assert!(stdin.read_chunk(None).expect("read").is_empty());
        assert!(stdin.read1(8).expect("read1").is_empty());
        assert!(stdin.read_line(None).expect("line").is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn every_read_style_echoes_in_order() {
        let (mut stdin, sink) = echoing(b"first\nsecond\nthird\nfourth\n");
        assert_eq!(stdin.read1(2).expect("read1"), b"fi");
        assert_eq!(stdin.read_line(None).expect("line"), b"rst\n");
        assert_eq!(stdin.read_line(Some(3)).expect("capped line"), b"sec");
        assert_eq!(
            stdin.read_lines().expect("lines"),
            vec![b"ond\n".to_vec(), b"third\n".to_vec(), b"fourth\n".to_vec()]
        );
        assert_eq!(sink.contents(), b"first\nsecond\nthird\nfourth\n");
    }

    #[test]
    fn iteration_echoes_each_line() {
        let (mut stdin, sink) = echoing(b"a\nb\n");
        let lines: Vec<_> = SourceLines::new(&mut stdin)
            .collect::<Result<_, _>>()
            .expect("lines");
        assert_eq!(lines, vec![b"a\n".to_vec(), b"b\n".to_vec()]);
        assert_eq!(sink.contents(), b"a\nb\n");
    }

    #[test]
    fn paused_reads_are_not_echoed() {
        let (mut stdin, sink) = echoing(b"secret\nvisible\n");
        assert!(stdin.set_echo_paused(true));
        assert!(stdin.is_paused());
        assert_eq!(stdin.read_line(None).expect("line"), b"secret\n");
        stdin.set_echo_paused(false);
        assert_eq!(stdin.read_line(None).expect("line"), b"visible\n");
        assert_eq!(sink.contents(), b"visible\n");
    }

    #[test]
    fn plain_sources_do_not_support_pausing() {
        let mut source = Cursor::new(b"x".to_vec());
        assert!(!source.set_echo_paused(true));
    }
}
