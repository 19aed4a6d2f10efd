//! sharedb - NFS share database for mountd
//!
//! Maintains the database of exported mountpoints and their export options
//! that mountd reads at startup and on SIGHUP. Each record maps one
//! mountpoint to the list of option strings used to export it.
//!
//! # Features
//!
//! - **Ordered store**: RocksDB keyed by mountpoint bytes, so listings come
//!   out in path order.
//!
//! - **Duplicate-free merging**: appending options skips anything already
//!   on the share and reports each skip.
//!
//! - **Safe with a live mountd**: shared/exclusive advisory locking on the
//!   store, waiting out contention instead of failing.
//!
//! - **Reload notification**: SIGHUP to the pid in mountd's pid file.
//!
//! # Architecture
//!
//! ```text
//!   share [-a|-r] <mountpoint> [<option> ...]
//!              │
//!              ▼
//!   ┌──────────────────────┐      ┌──────────────────┐
//!   │   CommandProcessor   │─────▶│  codec / merge   │
//!   │ (one op per process) │      │  NUL-joined list │
//!   └──────────┬───────────┘      └──────────────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐      ┌──────────────────┐
//!   │       ShareDb        │◀────▶│  flock on store  │◀──── mountd (shared)
//!   │  RocksDB, key order  │      │  dir, retry 1s   │
//!   └──────────┬───────────┘      └──────────────────┘
//!              │
//!              ▼
//!   ┌──────────────────────┐
//!   │     PeerNotifier     │──── SIGHUP ───▶ mountd
//!   └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Create the database and export a filesystem
//! share -c /export/home -maproot=root -network 10.0.0.0/8
//!
//! # Add an option and tell mountd
//! share -a -s /export/home sec=krb5
//!
//! # List everything
//! share -p
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod merge;
pub mod notify;
pub mod store;

pub use codec::ShareOptions;
pub use command::{CommandOutcome, CommandProcessor, ListSummary};
pub use config::{Action, CliArgs, ShareConfig};
pub use error::{Result, ShareError, StoreError};
pub use merge::MergeReport;
pub use notify::{NotifyOutcome, PeerNotifier};
pub use store::{OpenIntent, ShareDb, StoreOptions};
