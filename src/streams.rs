//! Stream building blocks installed into the process-wide slots.

pub mod echo;
pub mod mixer;
pub mod named;

pub use echo::{EchoingStdin, InputSource, SourceLines};
pub use mixer::{CopyingSink, SharedBuffer, StreamMixer};
pub use named::{STDERR_NAME, STDIN_NAME, STDOUT_NAME, TextInput, TextLines, TextOutput};
