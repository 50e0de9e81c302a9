//! System-wide exclusive access through a lock file.
//!
//! A lock is held while a file exists at an agreed path. It is created
//! with create-new semantics (so exactly one process wins) and holds the
//! owner's PID for post-mortem debugging. Dropping the guard removes it.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use hydro_tidal::io::{ExclusiveAccess, LockFile};
//!
//! let lock = LockFile::new("/tmp/hydro.h5.lock");
//! let _guard = lock.acquire(Duration::from_secs(100), Duration::from_secs(5))?;
//! // ... write the shared store ...
//! ```

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Error type for lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock still held by someone else when the timeout expired
    #[error("Lock file {} not available after {timeout:?}", path.display())]
    Timeout { path: PathBuf, timeout: Duration },

    /// Lock file could not be created or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Something that grants exclusive access until the returned guard drops.
pub trait ExclusiveAccess {
    /// Guard type; access is released when it drops.
    type Guard;

    /// Acquire, retrying every `retry_interval` until `timeout` elapses.
    fn acquire(
        &self,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Result<Self::Guard, LockError>;
}

/// Lock backed by a file at a fixed path.
#[derive(Clone, Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Lock file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try once to take the lock.
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(&self) -> Result<Option<LockGuard>, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                debug!(path = %self.path.display(), "lock acquired");
                Ok(Some(LockGuard {
                    path: self.path.clone(),
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ExclusiveAccess for LockFile {
    type Guard = LockGuard;

    fn acquire(&self, timeout: Duration, retry_interval: Duration) -> Result<LockGuard, LockError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire()? {
                return Ok(guard);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    path: self.path.clone(),
                    timeout,
                });
            }
            thread::sleep(retry_interval.min(deadline - now));
        }
    }
}

/// Held lock; removes the lock file on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        } else {
            debug!(path = %self.path.display(), "lock released");
        }
    }
}
