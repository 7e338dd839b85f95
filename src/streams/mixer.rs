//! Mixing of the two captured output channels into one transcript.
//!
//! Each component sink appends every write to its own buffer and to the
//! shared combined buffer before returning, so the combined buffer always
//! reflects the real call order across both channels.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard},
};

/// Growable byte buffer shared between the scope and the installed streams.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy out everything written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Return `true` when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn append(&self, buf: &[u8]) {
        self.lock().extend_from_slice(buf);
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that duplicates every write into a second buffer.
#[derive(Debug, Clone)]
pub struct CopyingSink {
    own: SharedBuffer,
    copy_to: SharedBuffer,
}

impl CopyingSink {
    /// Create a sink whose writes are also appended to `copy_to`.
    #[must_use]
    pub fn new(copy_to: SharedBuffer) -> Self {
        Self {
            own: SharedBuffer::new(),
            copy_to,
        }
    }

    /// The sink's own accumulated bytes.
    #[must_use]
    pub const fn buffer(&self) -> &SharedBuffer {
        &self.own
    }
}

impl Write for CopyingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.copy_to.write_all(buf)?;
        self.own.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.own.flush()?;
        self.copy_to.flush()
    }
}

/// One combined sink fed by two component sinks.
#[derive(Debug, Clone)]
pub struct StreamMixer {
    /// Interleaved transcript of both components.
    pub output: SharedBuffer,
    /// Component standing in for standard output.
    pub stdout: CopyingSink,
    /// Component standing in for standard error.
    pub stderr: CopyingSink,
}

impl StreamMixer {
    /// Create a mixer with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        let output = SharedBuffer::new();
        Self {
            stdout: CopyingSink::new(output.clone()),
            stderr: CopyingSink::new(output.clone()),
            output,
        }
    }
}

impl Default for StreamMixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::StreamMixer;
    use std::io::Write;

    #[test]
    fn combined_output_follows_call_order() {
        let mut mixer = StreamMixer::new();
        mixer.stdout.write_all(b"one ").expect("write stdout");
        mixer.stderr.write_all(b"two ").expect("write stderr");
        mixer.stdout.write_all(b"three").expect("write stdout");

        assert_eq!(mixer.output.contents(), b"one two three");
        assert_eq!(mixer.stdout.buffer().contents(), b"one three");
        assert_eq!(mixer.stderr.buffer().contents(), b"two ");
    }

    #[test]
    fn write_reports_all_bytes_accepted() {
        let mut mixer = StreamMixer::new();
        let written = mixer.stderr.write(b"abc").expect("write");
        assert_eq!(written, 3);
        mixer.stderr.flush().expect("flush");
        assert_eq!(mixer.output.len(), 3);
        assert!(mixer.stdout.buffer().is_empty());
    }

    #[test]
    fn clones_share_the_same_buffers() {
        let mixer = StreamMixer::new();
        let mut handle = mixer.stdout.clone();
        handle.write_all(b"shared").expect("write");
        assert_eq!(mixer.stdout.buffer().contents(), b"shared");
        assert_eq!(mixer.output.contents(), b"shared");
    }
}
