//! Share store handle
//!
//! Wraps a RocksDB database holding one record per export path. Keys are the
//! raw path bytes, so the default bytewise comparator gives the listing order.

use crate::error::{key_text, StoreError, StoreResult};
use crate::store::lock::{self, LockMode, StoreLock};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between attempts while another process holds the store lock
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// What the caller intends to do with the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenIntent {
    /// Queries and listing only
    ReadOnly,
    /// Mutate an existing store
    Mutate,
    /// Mutate, creating the store first if needed
    CreateIfMissing,
    /// Create if needed, then drop every record
    TruncateAndCreate,
}

impl OpenIntent {
    /// Lock strength this intent requires
    pub fn lock_mode(self) -> LockMode {
        match self {
            OpenIntent::ReadOnly => LockMode::Shared,
            _ => LockMode::Exclusive,
        }
    }

    pub fn is_writable(self) -> bool {
        self != OpenIntent::ReadOnly
    }

    pub fn creates(self) -> bool {
        matches!(
            self,
            OpenIntent::CreateIfMissing | OpenIntent::TruncateAndCreate
        )
    }
}

/// Options for opening the share store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub intent: OpenIntent,
    /// Take the advisory lock; disabling it is unsafe with a live mountd
    pub locking: bool,
    pub retry_interval: Duration,
}

impl StoreOptions {
    pub fn new(intent: OpenIntent) -> Self {
        Self {
            intent,
            locking: true,
            retry_interval: LOCK_RETRY_INTERVAL,
        }
    }
}

/// Engine options for the share store (tiny, rarely written)
fn db_options(create: bool) -> Options {
    let mut opts = Options::default();
    opts.create_if_missing(create);
    opts.set_keep_log_file_num(2);
    opts.set_max_open_files(64);
    opts
}

/// Open share store handle
///
/// Field order matters: the database closes before the lock is released.
#[derive(Debug)]
pub struct ShareDb {
    db: DB,
    path: PathBuf,
    writable: bool,
    lock: Option<StoreLock>,
}

impl ShareDb {
    /// Open the store at `path`, waiting for the advisory lock if needed
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let intent = options.intent;

        if intent.creates() {
            fs::create_dir_all(path).map_err(|e| open_error(path, e.to_string()))?;
        }

        let lock = if options.locking {
            Some(lock::acquire(path, intent.lock_mode(), options.retry_interval)?)
        } else {
            None
        };

        let db = if intent.is_writable() {
            DB::open(&db_options(intent.creates()), path)
        } else {
            DB::open_for_read_only(&db_options(false), path, false)
        }
        .map_err(|e| open_error(path, e.to_string()))?;

        let handle = Self {
            db,
            path: path.to_path_buf(),
            writable: intent.is_writable(),
            lock,
        };

        if intent == OpenIntent::TruncateAndCreate {
            handle.truncate()?;
        }

        debug!(path = %path.display(), ?intent, locked = options.locking, "Share store opened");
        Ok(handle)
    }

    /// Store location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock held by this handle, if locking was enabled
    pub fn lock_mode(&self) -> Option<LockMode> {
        self.lock.as_ref().map(StoreLock::mode)
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Get the stored value for `key`
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.db.get(key).map_err(|e| StoreError::Lookup {
            key: key_text(key),
            reason: e.to_string(),
        })
    }

    /// Insert or overwrite the value for `key`
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.ensure_writable()?;
        self.db.put(key, value).map_err(|e| StoreError::Update {
            key: key_text(key),
            reason: e.to_string(),
        })
    }

    /// Delete `key`, failing with `NotFound` if it is absent
    pub fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.ensure_writable()?;

        // RocksDB deletes are blind; the exclusive lock keeps this check valid
        if self.get(key)?.is_none() {
            return Err(StoreError::NotFound { key: key_text(key) });
        }

        self.db.delete(key).map_err(|e| StoreError::Delete {
            key: key_text(key),
            reason: e.to_string(),
        })
    }

    /// Iterate all records from the first key, in key byte order
    pub fn scan(&self) -> impl Iterator<Item = StoreResult<(Vec<u8>, Vec<u8>)>> + '_ {
        self.db.iterator(IteratorMode::Start).map(|result| {
            let (key, value) = result.map_err(|e| StoreError::Scan {
                reason: e.to_string(),
            })?;
            Ok((key.into_vec(), value.into_vec()))
        })
    }

    /// Flush and release the store
    pub fn close(mut self) -> StoreResult<()> {
        if self.writable {
            self.flush()?;
            self.writable = false;
        }
        debug!(path = %self.path.display(), "Share store closed");
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush().map_err(|e| StoreError::Flush {
            reason: e.to_string(),
        })
    }

    fn truncate(&self) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        let mut removed = 0usize;

        for result in self.db.iterator(IteratorMode::Start) {
            let (key, _) = result.map_err(|e| StoreError::Truncate {
                reason: e.to_string(),
            })?;
            batch.delete(key);
            removed += 1;
        }

        self.db.write(batch).map_err(|e| StoreError::Truncate {
            reason: e.to_string(),
        })?;

        debug!(path = %self.path.display(), removed, "Share store truncated");
        Ok(())
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }
}

// Dropped without close(), e.g. on an error path
impl Drop for ShareDb {
    fn drop(&mut self) {
        if self.writable {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "Share store flush failed");
            }
        }
    }
}

fn open_error(path: &Path, reason: String) -> StoreError {
    StoreError::Open {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_store(dir: &Path) -> ShareDb {
        ShareDb::open(dir, StoreOptions::new(OpenIntent::CreateIfMissing)).unwrap()
    }

    #[test]
    fn test_intent_lock_modes() {
        assert_eq!(OpenIntent::ReadOnly.lock_mode(), LockMode::Shared);
        assert_eq!(OpenIntent::Mutate.lock_mode(), LockMode::Exclusive);
        assert_eq!(OpenIntent::CreateIfMissing.lock_mode(), LockMode::Exclusive);
        assert_eq!(OpenIntent::TruncateAndCreate.lock_mode(), LockMode::Exclusive);
        assert!(!OpenIntent::ReadOnly.is_writable());
        assert!(!OpenIntent::Mutate.creates());
        assert!(OpenIntent::TruncateAndCreate.creates());
    }

    #[test]
    fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let db = create_store(&dir.path().join("exports.db"));
        assert_eq!(db.lock_mode(), Some(LockMode::Exclusive));

        db.put(b"/export/a", b"rw").unwrap();
        assert_eq!(db.get(b"/export/a").unwrap(), Some(b"rw".to_vec()));

        db.delete(b"/export/a").unwrap();
        assert_eq!(db.get(b"/export/a").unwrap(), None);

        let err = db.delete(b"/export/a").unwrap_err();
        assert!(err.is_not_found());
        db.close().unwrap();
    }

    #[test]
    fn test_scan_in_key_order() {
        let dir = tempdir().unwrap();
        let db = create_store(&dir.path().join("exports.db"));

        db.put(b"/b", b"ro").unwrap();
        db.put(b"/a", b"rw").unwrap();
        db.put(b"/a/sub", b"").unwrap();

        let keys: Vec<Vec<u8>> = db.scan().map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec![b"/a".to_vec(), b"/a/sub".to_vec(), b"/b".to_vec()]);
    }

    #[test]
    fn test_readonly_missing_store_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.db");

        let err = ShareDb::open(&missing, StoreOptions::new(OpenIntent::ReadOnly)).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(!missing.exists());
    }

    #[test]
    fn test_readonly_rejects_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");
        create_store(&path).close().unwrap();

        let db = ShareDb::open(&path, StoreOptions::new(OpenIntent::ReadOnly)).unwrap();
        assert_eq!(db.lock_mode(), Some(LockMode::Shared));
        assert!(matches!(db.put(b"/a", b"rw"), Err(StoreError::ReadOnly)));
        assert!(matches!(db.delete(b"/a"), Err(StoreError::ReadOnly)));
    }

    #[test]
    fn test_drop_without_close_keeps_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");

        let db = create_store(&path);
        db.put(b"/export/a", b"ro").unwrap();
        drop(db);

        let db = ShareDb::open(&path, StoreOptions::new(OpenIntent::ReadOnly)).unwrap();
        assert_eq!(db.get(b"/export/a").unwrap(), Some(b"ro".to_vec()));
    }

    #[test]
    fn test_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");

        let db = create_store(&path);
        db.put(b"/export/a", b"rw\0async").unwrap();
        db.close().unwrap();

        let db = ShareDb::open(&path, StoreOptions::new(OpenIntent::Mutate)).unwrap();
        assert_eq!(db.get(b"/export/a").unwrap(), Some(b"rw\0async".to_vec()));
    }

    #[test]
    fn test_truncate_empties_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");

        let db = create_store(&path);
        db.put(b"/a", b"rw").unwrap();
        db.put(b"/b", b"ro").unwrap();
        db.close().unwrap();

        let db = ShareDb::open(&path, StoreOptions::new(OpenIntent::TruncateAndCreate)).unwrap();
        assert_eq!(db.scan().count(), 0);
        db.close().unwrap();

        let db = ShareDb::open(&path, StoreOptions::new(OpenIntent::ReadOnly)).unwrap();
        assert_eq!(db.get(b"/a").unwrap(), None);
    }

    #[test]
    fn test_unlocked_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");
        create_store(&path).close().unwrap();

        let options = StoreOptions {
            locking: false,
            ..StoreOptions::new(OpenIntent::ReadOnly)
        };
        let db = ShareDb::open(&path, options).unwrap();
        assert_eq!(db.lock_mode(), None);
    }

    #[test]
    fn test_open_waits_for_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports.db");
        let writer = create_store(&path);
        writer.put(b"/a", b"rw").unwrap();

        let reader_path = path.clone();
        let reader = std::thread::spawn(move || {
            let options = StoreOptions {
                retry_interval: Duration::from_millis(20),
                ..StoreOptions::new(OpenIntent::ReadOnly)
            };
            let db = ShareDb::open(&reader_path, options).unwrap();
            db.get(b"/a").unwrap()
        });

        std::thread::sleep(Duration::from_millis(100));
        writer.close().unwrap();

        assert_eq!(reader.join().unwrap(), Some(b"rw".to_vec()));
    }
}
