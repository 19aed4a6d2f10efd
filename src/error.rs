//! Error types for sharedb
//!
//! This module defines the error hierarchy for the share tool:
//! - Configuration and usage errors (rejected before the store is touched)
//! - Share store errors (open, lock, lookup, update, delete, scan)
//! - Command-level errors (missing record, unsupported operation)
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Every store error names the key it was working on and carries the
//!   engine's own error text
//! - anyhow is only used at the binary boundary

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a share command
#[derive(Error, Debug)]
pub enum ShareError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Share store errors
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The share to delete does not exist
    #[error("{key}: no such share")]
    RecordNotFound { key: String },

    /// A known gap in the command set
    #[error("{0} is not yet implemented")]
    Unimplemented(&'static str),

    /// Writing listing output failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl ShareError {
    /// True for operations the tool knowingly refuses, as opposed to failures
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, ShareError::Unimplemented(_))
    }
}

/// Share store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store could not be opened
    #[error("{}: Unable to open: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Advisory lock failed for a reason other than contention
    #[error("{}: Unable to lock: {reason}", path.display())]
    Lock { path: PathBuf, reason: String },

    /// Key is not present
    #[error("{key}: not found")]
    NotFound { key: String },

    /// Mutation attempted through a read-only handle
    #[error("store was opened read-only")]
    ReadOnly,

    /// Point lookup failed
    #[error("{key}: DB lookup failed: {reason}")]
    Lookup { key: String, reason: String },

    /// Upsert failed
    #[error("{key}: DB update failed: {reason}")]
    Update { key: String, reason: String },

    /// Delete failed
    #[error("{key}: DB delete failed: {reason}")]
    Delete { key: String, reason: String },

    /// Sequential scan failed
    #[error("DB scan failed: {reason}")]
    Scan { reason: String },

    /// Truncating the store failed
    #[error("DB truncate failed: {reason}")]
    Truncate { reason: String },

    /// Flushing on close failed
    #[error("DB flush failed: {reason}")]
    Flush { reason: String },
}

impl StoreError {
    /// Check if this error only reports a missing key
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Mountpoint argument was empty
    #[error("Mountpoint must not be empty")]
    EmptyMountpoint,

    /// A path flag was given an empty value
    #[error("Missing argument to -{flag}")]
    EmptyPath { flag: char },

    /// A flag-like word where the mountpoint belongs
    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

/// Render a raw key for messages
pub(crate) fn key_text(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Result type alias for ShareError
pub type Result<T> = std::result::Result<T, ShareError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;
