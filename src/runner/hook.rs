//! Panic hook installed for the duration of an invocation.
//!
//! The hook records the message, location and backtrace of panics raised
//! on the invoking thread so they can be reported as failures. Termination
//! requests unwind silently. Panics elsewhere, and every panic when the
//! caller wants failures to propagate, still reach the previous hook.

use std::{
    backtrace::Backtrace,
    cell::RefCell,
    panic::{self, PanicHookInfo},
    sync::Arc,
    thread::{self, ThreadId},
};

use crate::exit::ExitRequest;

type Hook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Details of the last panic seen on this thread.
#[derive(Debug)]
pub(crate) struct PanicRecord {
    pub(crate) message: String,
    pub(crate) location: Option<String>,
    pub(crate) backtrace: Backtrace,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicRecord>> = const { RefCell::new(None) };
}

/// Take the panic recorded on this thread, if any.
pub(crate) fn take_record() -> Option<PanicRecord> {
    LAST_PANIC.with_borrow_mut(Option::take)
}

/// Render a panic payload the way the default hook does.
pub(crate) fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_owned())
}

/// Replaces the panic hook until dropped.
pub(crate) struct PanicCapture {
    previous: Option<Arc<Hook>>,
}

impl PanicCapture {
    /// Install the capturing hook; `forward` keeps reporting through the
    /// previous hook as well.
    pub(crate) fn install(forward: bool) -> Self {
        let previous: Arc<Hook> = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);
        let owner: ThreadId = thread::current().id();
        LAST_PANIC.with_borrow_mut(|slot| *slot = None);
        panic::set_hook(Box::new(move |info| {
            if thread::current().id() != owner {
                chained(info);
                return;
            }
            if info.payload().is::<ExitRequest>() {
                return;
            }
            let record = PanicRecord {
                message: payload_message(info.payload()),
                location: info
                    .location()
                    .map(|location| location.to_string()),
                backtrace: Backtrace::capture(),
            };
            LAST_PANIC.with_borrow_mut(|slot| *slot = Some(record));
            if forward {
                chained(info);
            }
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicCapture {
    fn drop(&mut self) {
        if thread::panicking() {
            return;
        }
        drop(panic::take_hook());
        if let Some(hook) = self.previous.take().and_then(Arc::into_inner) {
            panic::set_hook(hook);
        }
    }
}
