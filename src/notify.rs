//! mountd notification
//!
//! After the share store changes, mountd is sent SIGHUP so it reloads its
//! exports. The daemon's pid comes from its pid file. Every failure here is
//! swallowed: a missing daemon must never fail a share command.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of a notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Pid file missing or unreadable
    NoPidFile,
    /// Pid file did not start with a usable process id
    InvalidPid,
    /// SIGHUP delivered
    Signalled(i32),
    /// kill(2) failed, typically ESRCH for a stale pid file
    SignalFailed { pid: i32, errno: Errno },
}

/// Sends the reload signal to the daemon named in a pid file
#[derive(Debug, Clone)]
pub struct PeerNotifier {
    pid_file: PathBuf,
}

impl PeerNotifier {
    pub fn new<P: AsRef<Path>>(pid_file: P) -> Self {
        Self {
            pid_file: pid_file.as_ref().to_path_buf(),
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Signal the daemon; best effort
    pub fn notify(&self) -> NotifyOutcome {
        let outcome = match fs::read(&self.pid_file) {
            Err(_) => NotifyOutcome::NoPidFile,
            Ok(contents) => match parse_pid(&contents) {
                None => NotifyOutcome::InvalidPid,
                Some(pid) => match signal::kill(Pid::from_raw(pid), Signal::SIGHUP) {
                    Ok(()) => NotifyOutcome::Signalled(pid),
                    Err(errno) => NotifyOutcome::SignalFailed { pid, errno },
                },
            },
        };

        debug!(pid_file = %self.pid_file.display(), ?outcome, "mountd notification");
        outcome
    }
}

/// Parse the leading unsigned decimal of a pid file
///
/// Leading whitespace is skipped and anything after the digits is ignored.
/// Zero is refused, since kill(0) would target our own process group.
pub fn parse_pid(contents: &[u8]) -> Option<i32> {
    let start = contents.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &contents[start..];
    let end = rest
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());

    let digits = std::str::from_utf8(&rest[..end]).ok()?;
    let pid: u32 = digits.parse().ok()?;

    i32::try_from(pid).ok().filter(|pid| *pid > 0)
}
