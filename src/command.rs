//! Share command processing
//!
//! One invocation opens the share store, applies at most one record-level
//! operation, optionally notifies mountd, optionally lists the store, and
//! closes it again.

use crate::codec::ShareOptions;
use crate::config::{Action, ShareConfig};
use crate::error::{key_text, Result, ShareError, StoreError};
use crate::merge;
use crate::notify::{NotifyOutcome, PeerNotifier};
use crate::store::ShareDb;
use std::io::Write;
use tracing::{debug, info, warn};

/// What a command did, beyond its listing output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Options that were already present and left alone
    pub skipped: Vec<Vec<u8>>,

    /// Listing totals, if the store was scanned
    pub listing: Option<ListSummary>,

    /// mountd notification result, if one was requested
    pub notified: Option<NotifyOutcome>,
}

/// Totals from a full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    /// Distinct mountpoints visited
    pub records: usize,

    /// `key<TAB>option` lines written
    pub lines: usize,
}

/// Runs one share command against the store
pub struct CommandProcessor {
    config: ShareConfig,
}

impl CommandProcessor {
    pub fn new(config: ShareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Run the configured command, writing listing lines to `out`
    pub fn run<W: Write>(&self, out: &mut W) -> Result<CommandOutcome> {
        // Refused before the store is opened so nothing is touched
        if let Action::DeleteOptions { .. } = self.config.action {
            return Err(delete_options_unimplemented());
        }

        let db = ShareDb::open(&self.config.db_path, self.config.store_options())?;
        let mut outcome = CommandOutcome::default();

        match &self.config.action {
            Action::List => {}
            Action::Delete { key } => delete_record(&db, key)?,
            Action::DeleteOptions { .. } => return Err(delete_options_unimplemented()),
            Action::Merge { key, options } => outcome.skipped = add_merge(&db, key, options)?,
            Action::Replace { key, options } => outcome.skipped = replace(&db, key, options)?,
        }

        if self.config.signal {
            outcome.notified = Some(PeerNotifier::new(&self.config.pid_file).notify());
        }

        if self.config.scans() {
            outcome.listing = Some(list(&db, out, self.config.print, self.config.debug > 0)?);
        }

        db.close()?;
        Ok(outcome)
    }
}

fn delete_options_unimplemented() -> ShareError {
    ShareError::Unimplemented("Deleting matching options")
}

/// Remove a whole share
pub fn delete_record(db: &ShareDb, key: &[u8]) -> Result<()> {
    match db.delete(key) {
        Err(StoreError::NotFound { key }) => Err(ShareError::RecordNotFound { key }),
        other => Ok(other?),
    }
}

/// Append options to a share, creating it if absent; returns skipped options
pub fn add_merge(db: &ShareDb, key: &[u8], options: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let existing = db.get(key)?.unwrap_or_default();
    let (value, report) = merge::merge(&existing, options);

    report_skips(key, &report);
    db.put(key, &value)?;

    debug!(key = %key_text(key), added = report.added, "Share options merged");
    Ok(report.skipped)
}

/// Overwrite a share's options; returns options dropped as duplicates
pub fn replace(db: &ShareDb, key: &[u8], options: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    let (normalized, report) = merge::normalize(options);

    report_skips(key, &report);
    db.put(key, &normalized.encode())?;

    debug!(key = %key_text(key), options = normalized.len(), "Share options replaced");
    Ok(report.skipped)
}

fn report_skips(key: &[u8], report: &merge::MergeReport) {
    for option in &report.skipped {
        info!("{}: {}: Already in share", key_text(key), key_text(option));
    }
    for option in &report.rejected {
        warn!(
            "{}: {}: Ignoring option with embedded NUL",
            key_text(key),
            option.escape_ascii()
        );
    }
}

/// Write every share as `key<TAB>option` lines, in key order
pub fn list<W: Write>(db: &ShareDb, out: &mut W, print: bool, dump: bool) -> Result<ListSummary> {
    let mut summary = ListSummary::default();

    for record in db.scan() {
        let (key, value) = record?;
        summary.records += 1;

        if !print {
            continue;
        }

        for option in ShareOptions::decode(&value).iter() {
            out.write_all(&key)?;
            out.write_all(b"\t")?;
            out.write_all(option)?;
            out.write_all(b"\n")?;
            summary.lines += 1;
        }

        if dump {
            debug!(
                key = %key.escape_ascii(),
                value = %value.escape_ascii(),
                "Raw share record"
            );
        }
    }

    Ok(summary)
}
