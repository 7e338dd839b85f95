//! Diagnostic events emitted while invoking.

use std::{
    io,
    sync::{Arc, Mutex},
};

use clirunner::{CliRunner, InvokeOptions};
use rstest::rstest;
use serial_test::serial;
use tracing::Level;

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn text(&self) -> String {
        let bytes = self.0.lock().expect("log lock").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
#[serial]
fn scope_lifecycle_is_logged() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        CliRunner::new()
            .invoke_with(|| -> anyhow::Result<()> { clirunner::exit(3) }, InvokeOptions::new().env("CLIRUNNER_LOG", "1"))
            .expect("invoke");
    });
    let text = logs.text();
    assert!(text.contains("isolation scope opened"));
    assert!(text.contains("argument vector installed"));
    assert!(text.contains("target requested exit"));
    assert!(text.contains("isolation scope closed"));
}
