//! Share store module
//!
//! Persistent record of exported mountpoints, shared with mountd.
//!
//! # Module Structure
//!
//! - `lock`: advisory `flock` on the store directory with retry-on-contention
//! - `handle`: RocksDB handle with lookup, upsert, delete and ordered scan

pub mod handle;
pub mod lock;

pub use handle::{OpenIntent, ShareDb, StoreOptions, LOCK_RETRY_INTERVAL};
pub use lock::{LockMode, StoreLock};
