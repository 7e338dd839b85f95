//! Temporary working directories for tests that touch the filesystem.

use std::{
    cell::Cell,
    env,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::RunnerError;

static CWD_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static CWD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Exclusive right to change the working directory.
///
/// The outermost guard on a thread takes the process-wide lock; guards
/// nested inside it on the same thread only count themselves.
#[derive(Debug)]
struct CwdLock {
    _guard: Option<MutexGuard<'static, ()>>,
}

impl CwdLock {
    fn acquire() -> Self {
        let depth = CWD_DEPTH.get();
        let guard = (depth == 0).then(|| {
            CWD_LOCK
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        });
        CWD_DEPTH.set(depth + 1);
        Self { _guard: guard }
    }
}

impl Drop for CwdLock {
    fn drop(&mut self) {
        CWD_DEPTH.set(CWD_DEPTH.get().saturating_sub(1));
    }
}

/// Guard holding a temporary working directory.
///
/// Dropping it returns to the previous working directory and, unless the
/// directory was created under an explicit parent, removes it. Removal
/// failures are logged and otherwise ignored.
///
/// Scopes nest on one thread: an inner scope returns to the outer scope's
/// directory when dropped.
#[derive(Debug)]
pub struct IsolatedFilesystem {
    path: PathBuf,
    original: PathBuf,
    owned: Option<TempDir>,
    _lock: CwdLock,
}

impl IsolatedFilesystem {
    /// Create a directory (inside `parent` when given) and change into it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Filesystem`] when the current directory cannot
    /// be read, or the temporary directory cannot be created or entered.
    pub fn create(parent: Option<&Path>) -> Result<Self, RunnerError> {
        let lock = CwdLock::acquire();
        let original = env::current_dir().map_err(|source| RunnerError::Filesystem {
            action: "read the current directory",
            source,
        })?;
        let dir = match parent {
            Some(root) => tempfile::Builder::new().tempdir_in(root),
            None => TempDir::new(),
        }
        .map_err(|source| RunnerError::Filesystem {
            action: "create a temporary directory",
            source,
        })?;
        env::set_current_dir(dir.path()).map_err(|source| RunnerError::Filesystem {
            action: "enter the temporary directory",
            source,
        })?;
        let (path, owned) = if parent.is_some() {
            (dir.keep(), None)
        } else {
            (dir.path().to_path_buf(), Some(dir))
        };
        debug!(path = %path.display(), "entered isolated filesystem");
        Ok(Self {
            path,
            original,
            owned,
            _lock: lock,
        })
    }

    /// The temporary directory, which is also the working directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IsolatedFilesystem {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.original) {
            warn!(
                "failed to restore working directory to {}: {err}",
                self.original.display()
            );
        }
        if let Some(dir) = self.owned.take()
            && let Err(err) = dir.close()
        {
            warn!("failed to remove {}: {err}", self.path.display());
        }
    }
}
