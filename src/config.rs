//! Configuration types for sharedb
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Selection of the share action, store open intent and lock mode

use crate::error::ConfigError;
use crate::store::{OpenIntent, StoreOptions};
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

/// Default share store location
pub const DEFAULT_DB_PATH: &str = "/etc/zfs/exports.db";

/// Default mountd pid file
pub const DEFAULT_PID_FILE: &str = "/var/run/mountd.pid";

/// Manage the NFS share database read by mountd
#[derive(Parser, Debug, Clone)]
#[command(
    name = "share",
    version,
    about = "Manage the NFS share database read by mountd",
    long_about = "Maintains the share database: one record per exported mountpoint,\n\
                  holding that mountpoint's export options (per exports(5)).\n\n\
                  Without a mountpoint the database is listed.\n\
                  With a mountpoint and options, the options replace the share's\n\
                  options, or are appended to them with -a.\n\
                  With -r and only a mountpoint, the share is removed.",
    after_help = "EXAMPLES:\n    \
        share -c /export/home -maproot=root -network 10.0.0.0/8\n    \
        share -a -s /export/home sec=krb5\n    \
        share -r -s /export/old\n    \
        share -p -D /tmp/exports.db"
)]
pub struct CliArgs {
    /// Increase verbosity level
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Increase debugging level
    #[arg(short = 'd', long, action = ArgAction::Count)]
    pub debug: u8,

    /// Print DB entries
    #[arg(short = 'p', long)]
    pub print: bool,

    /// Create ShareDB if not existing
    #[arg(short = 'c', long)]
    pub create: bool,

    /// Truncate ShareDB to zero entries
    #[arg(short = 'z', long)]
    pub truncate: bool,

    /// Append share options to share
    #[arg(short = 'a', long, conflicts_with = "remove")]
    pub add: bool,

    /// Remove share
    #[arg(short = 'r', long)]
    pub remove: bool,

    /// Unlocked database access (unsafe!)
    #[arg(short = 'u', long)]
    pub unlocked: bool,

    /// Send signal to mountd
    #[arg(short = 's', long)]
    pub signal: bool,

    /// ShareDB path
    #[arg(
        short = 'D',
        long = "db",
        env = "SHAREDB_PATH",
        default_value = DEFAULT_DB_PATH,
        value_name = "PATH"
    )]
    pub db_path: PathBuf,

    /// Mountd pidfile path
    #[arg(
        short = 'P',
        long = "pidfile",
        env = "SHAREDB_PIDFILE",
        default_value = DEFAULT_PID_FILE,
        value_name = "PATH"
    )]
    pub pid_file: PathBuf,

    /// Exported mountpoint followed by its export options
    ///
    /// Flag parsing stops at the mountpoint; every later word is an option,
    /// even one that looks like a flag (`-ro`, `-p`).
    #[arg(
        value_name = "MOUNTPOINT",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub args: Vec<OsString>,
}

/// The record-level operation one invocation performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No mountpoint: only list
    List,
    /// Remove the whole share
    Delete { key: Vec<u8> },
    /// Remove individual options (not implemented)
    DeleteOptions { key: Vec<u8>, options: Vec<Vec<u8>> },
    /// Append options not already present
    Merge { key: Vec<u8>, options: Vec<Vec<u8>> },
    /// Overwrite the share's options
    Replace { key: Vec<u8>, options: Vec<Vec<u8>> },
}

impl Action {
    /// Mountpoint this action works on
    pub fn key(&self) -> Option<&[u8]> {
        match self {
            Action::List => None,
            Action::Delete { key }
            | Action::DeleteOptions { key, .. }
            | Action::Merge { key, .. }
            | Action::Replace { key, .. } => Some(key.as_slice()),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Share store path
    pub db_path: PathBuf,

    /// mountd pid file
    pub pid_file: PathBuf,

    /// Record-level operation
    pub action: Action,

    /// Print listing lines
    pub print: bool,

    /// Verbosity level
    pub verbose: u8,

    /// Debug level
    pub debug: u8,

    /// Create the store if missing
    pub create: bool,

    /// Drop all records on open
    pub truncate: bool,

    /// Take the advisory store lock
    pub locking: bool,

    /// Signal mountd afterwards
    pub signal: bool,

    /// Opens for writing even without a mountpoint
    write_flags: bool,
}

impl ShareConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { flag: 'D' });
        }
        if args.pid_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { flag: 'P' });
        }

        let mut words = args.args.into_iter().map(OsStringExt::into_vec);

        let action = match words.next() {
            None => Action::List,
            Some(key) => {
                if key.is_empty() {
                    return Err(ConfigError::EmptyMountpoint);
                }
                if key.starts_with(b"-") {
                    return Err(ConfigError::UnknownOption(
                        String::from_utf8_lossy(&key).into_owned(),
                    ));
                }

                let options: Vec<Vec<u8>> = words.collect();

                if args.remove {
                    if options.is_empty() {
                        Action::Delete { key }
                    } else {
                        Action::DeleteOptions { key, options }
                    }
                } else if args.add {
                    Action::Merge { key, options }
                } else {
                    Action::Replace { key, options }
                }
            }
        };

        // A bare listing always prints; -p adds a listing to any action
        let print = args.print || action == Action::List;

        Ok(Self {
            db_path: args.db_path,
            pid_file: args.pid_file,
            action,
            print,
            verbose: args.verbose,
            debug: args.debug,
            create: args.create,
            truncate: args.truncate,
            locking: !args.unlocked,
            signal: args.signal,
            write_flags: args.add || args.remove,
        })
    }

    /// Intended use of the store for this invocation
    pub fn open_intent(&self) -> OpenIntent {
        if self.truncate {
            OpenIntent::TruncateAndCreate
        } else if self.create {
            OpenIntent::CreateIfMissing
        } else if self.write_flags || self.action.key().is_some() {
            OpenIntent::Mutate
        } else {
            OpenIntent::ReadOnly
        }
    }

    /// Store open options for this invocation
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            locking: self.locking,
            ..StoreOptions::new(self.open_intent())
        }
    }

    /// Whether a full scan runs (to print, or to count under -v)
    pub fn scans(&self) -> bool {
        self.print || self.verbose > 0
    }
}
