//! PID file access
//!
//! The supervisor owns the PID file: it is written when the daemon is
//! spawned and removed once a stop schedule sees the process exit.

use std::io::ErrorKind;
use std::path::Path;

use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::SupervisorError;

/// Read the PID recorded in `path`
///
/// Returns `Ok(None)` when the file does not exist. An unreadable file or
/// one that does not hold a positive PID is an error.
pub fn read_pid(path: &Path) -> Result<Option<Pid>, SupervisorError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SupervisorError::PidFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    let first = contents.split_whitespace().next().unwrap_or_default();
    match first.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(Some(Pid::from_raw(pid))),
        _ => Err(SupervisorError::PidFile {
            path: path.to_path_buf(),
            reason: format!("invalid pid '{}'", first),
        }),
    }
}

/// Remove `path`, ignoring a file that is already gone
pub fn remove(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed pid file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove pid file"),
    }
}
