//! core::ops::lock
//!
//! Exclusive commit lock for one class repository.
//!
//! # Architecture
//!
//! The commit lock ensures only one writer builds and finalizes a revision
//! in a given repository at a time. Writers in other threads or other
//! processes block until the lock is free, so concurrent commits land as
//! sequential revisions instead of racing on the tip.
//!
//! The lock is **repository-scoped**: it lives at
//! `<location>/chronicle.lock`. Commits to different repositories never
//! contend.
//!
//! # Invariants
//!
//! - Lock is held only for revision construction and tip advance
//! - Lock is automatically released on drop (RAII pattern)
//! - Acquisition blocks, unbounded unless a timeout is given
//!
//! # Example
//!
//! ```ignore
//! use chronicle::core::ops::lock::CommitLock;
//!
//! let lock = CommitLock::acquire(&location, None)?;
//!
//! // Build and finalize the revision while holding the lock
//! // ...
//!
//! // Lock automatically released when dropped
//! drop(lock);
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::PathResolver;
use crate::core::types::RepositoryLocation;

/// Interval between attempts when waiting with a timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock was not released within the allowed wait.
    #[error("timed out after {waited:?} waiting for commit lock")]
    Timeout {
        /// How long we waited.
        waited: Duration,
    },

    /// Failed to create the lock file.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on one repository's tip.
///
/// The lock is automatically released when this guard is dropped, even
/// if the commit fails or panics halfway through.
#[derive(Debug)]
pub struct CommitLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl CommitLock {
    /// Acquire the commit lock for `location`.
    ///
    /// With `timeout = None` this blocks until the lock is free. With
    /// `Some(limit)` it polls until `limit` has elapsed.
    ///
    /// The repository directory must already exist.
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if `limit` elapsed while another writer held the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(
        location: &RepositoryLocation,
        timeout: Option<Duration>,
    ) -> Result<Self, LockError> {
        let path = PathResolver::lock_path(location);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match timeout {
            None => file
                .lock_exclusive()
                .map_err(|e| LockError::AcquireFailed(e.to_string()))?,
            Some(limit) => Self::wait_for(&file, limit)?,
        }

        tracing::debug!(path = %path.display(), "commit lock acquired");
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    fn wait_for(file: &File, limit: Duration) -> Result<(), LockError> {
        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(LockError::Timeout { waited });
                    }
                    thread::sleep(POLL_INTERVAL.min(limit - waited));
                }
                Err(e) => return Err(LockError::AcquireFailed(e.to_string())),
            }
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// This is called automatically on drop.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
            tracing::debug!(path = %self.path.display(), "commit lock released");
        }
        Ok(())
    }
}

impl Drop for CommitLock {
    fn drop(&mut self) {
        // Closing the file releases the OS lock anyway.
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn location(dir: &TempDir) -> RepositoryLocation {
        RepositoryLocation::new(dir.path())
    }

    #[test]
    fn lock_acquire_succeeds() {
        let temp = TempDir::new().expect("create temp dir");
        let lock = CommitLock::acquire(&location(&temp), None).expect("acquire lock");
        assert!(lock.is_held());
        assert!(lock.path().exists());
        assert_eq!(lock.path(), temp.path().join("chronicle.lock"));
    }

    #[test]
    fn second_acquire_times_out() {
        let temp = TempDir::new().expect("create temp dir");
        let _held = CommitLock::acquire(&location(&temp), None).expect("first acquire");

        let result = CommitLock::acquire(&location(&temp), Some(Duration::from_millis(50)));
        match result {
            Err(LockError::Timeout { waited }) => assert!(waited >= Duration::from_millis(50)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().expect("create temp dir");
        {
            let lock = CommitLock::acquire(&location(&temp), None).expect("first acquire");
            assert!(lock.is_held());
        }

        let lock2 = CommitLock::acquire(&location(&temp), Some(Duration::from_millis(50)))
            .expect("second acquire");
        assert!(lock2.is_held());
    }

    #[test]
    fn multiple_release_calls_are_safe() {
        let temp = TempDir::new().expect("create temp dir");
        let mut lock = CommitLock::acquire(&location(&temp), None).expect("acquire");

        lock.release().expect("first release");
        lock.release().expect("second release should be ok");
        assert!(!lock.is_held());
    }

    #[test]
    fn blocked_writer_proceeds_after_release() {
        let temp = TempDir::new().expect("create temp dir");
        let loc = location(&temp);
        let held = CommitLock::acquire(&loc, None).expect("first acquire");

        let (tx, rx) = mpsc::channel();
        let waiter_loc = loc.clone();
        let waiter = thread::spawn(move || {
            let lock = CommitLock::acquire(&waiter_loc, None).expect("blocking acquire");
            tx.send(()).expect("send");
            drop(lock);
        });

        // The waiter cannot get through while we hold the lock.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(held);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter should acquire after release");
        waiter.join().expect("join");
    }

    #[test]
    fn different_locations_do_not_contend() {
        let a = TempDir::new().expect("create temp dir");
        let b = TempDir::new().expect("create temp dir");

        let _lock_a = CommitLock::acquire(&location(&a), None).expect("acquire a");
        let lock_b = CommitLock::acquire(&location(&b), Some(Duration::from_millis(10)))
            .expect("acquire b");
        assert!(lock_b.is_held());
    }

    #[test]
    fn missing_directory_fails_to_create() {
        let temp = TempDir::new().expect("create temp dir");
        let missing = RepositoryLocation::new(temp.path().join("absent"));
        let result = CommitLock::acquire(&missing, None);
        assert!(matches!(result, Err(LockError::CreateFailed(_))));
    }

    #[test]
    fn error_display_formatting() {
        let err = LockError::Timeout {
            waited: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("timed out"));

        let err = LockError::CreateFailed("test".into());
        assert!(err.to_string().contains("create"));

        let err = LockError::AcquireFailed("test".into());
        assert!(err.to_string().contains("acquire"));

        let err = LockError::ReleaseFailed("test".into());
        assert!(err.to_string().contains("release"));
    }
}
