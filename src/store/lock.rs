//! Advisory store locking
//!
//! The share store is guarded by a BSD `flock` on its directory. Readers,
//! including mountd, hold it shared; writers hold it exclusive. Acquisition
//! never blocks in the kernel: a contended attempt reports a notice, sleeps
//! for the retry interval and tries again, with no retry cap.

use crate::error::{StoreError, StoreResult};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Lock strength requested for a store open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of concurrent holders
    Shared,
    /// Single holder, excludes shared holders too
    Exclusive,
}

impl LockMode {
    fn nonblocking(self) -> FlockArg {
        match self {
            LockMode::Shared => FlockArg::LockSharedNonblock,
            LockMode::Exclusive => FlockArg::LockExclusiveNonblock,
        }
    }
}

/// Held advisory lock; released on drop
pub struct StoreLock {
    _flock: Flock<File>,
    mode: LockMode,
}

impl StoreLock {
    /// Strength this lock was taken with
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLock")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Try once to lock `path`, returning `None` if another holder conflicts
pub fn try_acquire(path: &Path, mode: LockMode) -> StoreResult<Option<StoreLock>> {
    let file = open_for_lock(path)?;

    match Flock::lock(file, mode.nonblocking()) {
        Ok(flock) => Ok(Some(StoreLock {
            _flock: flock,
            mode,
        })),
        Err((_, Errno::EWOULDBLOCK)) => Ok(None),
        Err((_, errno)) => Err(StoreError::Lock {
            path: path.to_path_buf(),
            reason: errno.desc().to_string(),
        }),
    }
}

/// Lock `path`, polling every `retry_interval` until the lock is granted
pub fn acquire(path: &Path, mode: LockMode, retry_interval: Duration) -> StoreResult<StoreLock> {
    let mut file = open_for_lock(path)?;

    loop {
        match Flock::lock(file, mode.nonblocking()) {
            Ok(flock) => {
                debug!(path = %path.display(), ?mode, "Store lock acquired");
                return Ok(StoreLock {
                    _flock: flock,
                    mode,
                });
            }
            Err((unlocked, Errno::EWOULDBLOCK)) => {
                warn!(
                    "{}: Database locked, retrying in {:?}",
                    path.display(),
                    retry_interval
                );
                file = unlocked;
                thread::sleep(retry_interval);
            }
            Err((_, errno)) => {
                return Err(StoreError::Lock {
                    path: path.to_path_buf(),
                    reason: errno.desc().to_string(),
                });
            }
        }
    }
}

fn open_for_lock(path: &Path) -> StoreResult<File> {
    File::open(path).map_err(|e| StoreError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;
    use tempfile::tempdir;

    #[test]
    fn test_shared_locks_coexist() {
        let dir = tempdir().unwrap();
        let first = try_acquire(dir.path(), LockMode::Shared).unwrap();
        let second = try_acquire(dir.path(), LockMode::Shared).unwrap();
        assert!(first.is_some());
        assert_eq!(second.map(|l| l.mode()), Some(LockMode::Shared));
    }

    #[test]
    fn test_exclusive_conflicts() {
        let dir = tempdir().unwrap();
        let held = try_acquire(dir.path(), LockMode::Exclusive).unwrap();
        assert!(held.is_some());

        assert!(try_acquire(dir.path(), LockMode::Shared).unwrap().is_none());
        assert!(try_acquire(dir.path(), LockMode::Exclusive).unwrap().is_none());

        drop(held);
        assert!(try_acquire(dir.path(), LockMode::Exclusive).unwrap().is_some());
    }

    #[test]
    fn test_shared_blocks_exclusive() {
        let dir = tempdir().unwrap();
        let _reader = try_acquire(dir.path(), LockMode::Shared).unwrap().unwrap();
        assert!(try_acquire(dir.path(), LockMode::Exclusive).unwrap().is_none());
    }

    #[test]
    fn test_acquire_retries_until_released() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let held = try_acquire(&path, LockMode::Exclusive).unwrap().unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let started = Instant::now();
            let lock = acquire(&path, LockMode::Exclusive, Duration::from_millis(20));
            tx.send(()).unwrap();
            (lock.map(|l| l.mode()), started.elapsed())
        });

        // Still waiting while the holder keeps the lock
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
        drop(held);

        let (mode, waited) = waiter.join().unwrap();
        assert_eq!(mode.unwrap(), LockMode::Exclusive);
        assert!(waited >= Duration::from_millis(150));
    }

    #[test]
    fn test_missing_path_is_open_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = try_acquire(&missing, LockMode::Shared).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }
}
