//! OS-backed process supervision
//!
//! Spawns the daemon with a double-fork (stdio on `/dev/null`, PID file
//! written by the grandchild before it execs the daemon), signals it by the
//! PID in its PID file, and classifies its run state the way LSB
//! `pidofproc` does.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use daemonize::{Daemonize, Outcome};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

use super::{pidfile, Schedule, ScheduleStep, SignalOutcome, Supervisor};
use crate::config::ServiceIdentity;
use crate::error::SupervisorError;
use crate::types::RunState;

/// Interval between liveness checks while waiting on the daemon
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Supervises the daemon through its PID file and POSIX signals
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    start_timeout: Duration,
    poll_interval: Duration,
}

impl ProcessSupervisor {
    /// Create a supervisor that waits up to `start_timeout` for a spawned daemon
    pub fn new(start_timeout: Duration) -> Self {
        Self {
            start_timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Find the live daemon process named by `pid_file`, if any
    fn running_pid(
        &self,
        service: &ServiceIdentity,
        pid_file: &Path,
    ) -> Result<Option<Pid>, SupervisorError> {
        let Some(pid) = pidfile::read_pid(pid_file)? else {
            return Ok(None);
        };

        if !is_alive(pid) {
            debug!(pid = pid.as_raw(), "Pid file names a process that is gone");
            return Ok(None);
        }

        if !runs_executable(pid, service.path()) {
            warn!(
                pid = pid.as_raw(),
                executable = %service.path().display(),
                "Pid file names a process running another executable"
            );
            return Ok(None);
        }

        Ok(Some(pid))
    }

    /// Wait up to `grace` for `pid` to exit; true if it did
    ///
    /// A grace period too long to represent as a deadline waits indefinitely.
    fn wait_for_exit(&self, pid: Pid, grace: Duration) -> bool {
        let deadline = Instant::now().checked_add(grace);
        loop {
            if !is_alive(pid) {
                return true;
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            std::thread::sleep(pause);
        }
    }

    /// Wait for the spawned daemon to appear in its PID file and exec
    fn await_startup(
        &self,
        service: &ServiceIdentity,
        pid_file: &Path,
    ) -> Result<Pid, SupervisorError> {
        let started = Instant::now();
        let mut last_pid = None;

        loop {
            if let Some(pid) = pidfile::read_pid(pid_file).ok().flatten() {
                if !is_alive(pid) {
                    return Err(SupervisorError::ExitedDuringStartup { pid: pid.as_raw() });
                }
                if runs_executable(pid, service.path()) {
                    return Ok(pid);
                }
                last_pid = Some(pid);
            }

            if started.elapsed() >= self.start_timeout {
                debug!(last_pid = ?last_pid.map(Pid::as_raw), "Gave up waiting for daemon");
                return Err(SupervisorError::StartupTimeout {
                    waited: self.start_timeout,
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Supervisor for ProcessSupervisor {
    fn spawn(
        &self,
        service: &ServiceIdentity,
        args: &[String],
        pid_file: &Path,
    ) -> Result<(), SupervisorError> {
        if let Some(parent) = pid_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SupervisorError::PidFile {
                path: pid_file.to_path_buf(),
                reason: format!("failed to create pid file directory: {}", e),
            })?;
        }

        // A stale file would satisfy the startup poll before the new PID lands.
        pidfile::remove(pid_file);

        let daemonize = Daemonize::new()
            .pid_file(pid_file)
            .working_directory("/")
            .umask(0o022);

        match daemonize.execute() {
            Outcome::Parent(Ok(parent)) => {
                if parent.first_child_exit_code != 0 {
                    return Err(SupervisorError::SpawnFailed {
                        reason: format!(
                            "daemonizing child exited with code {}",
                            parent.first_child_exit_code
                        ),
                    });
                }
                let pid = self.await_startup(service, pid_file)?;
                info!(
                    service = service.name(),
                    pid = pid.as_raw(),
                    "Daemon started"
                );
                Ok(())
            }
            Outcome::Parent(Err(e)) => Err(SupervisorError::SpawnFailed {
                reason: e.to_string(),
            }),
            Outcome::Child(Ok(_)) => {
                // Only returns if exec failed.
                let e = Command::new(service.path()).args(args).exec();
                error!(executable = %service.path().display(), error = %e, "Failed to exec daemon");
                pidfile::remove(pid_file);
                std::process::exit(1);
            }
            Outcome::Child(Err(e)) => {
                error!(error = %e, "Failed to daemonize");
                std::process::exit(1);
            }
        }
    }

    fn signal(
        &self,
        service: &ServiceIdentity,
        pid_file: &Path,
        schedule: &Schedule,
    ) -> Result<SignalOutcome, SupervisorError> {
        let Some(pid) = self.running_pid(service, pid_file)? else {
            return Ok(SignalOutcome::NoProcess);
        };

        let exited = || {
            if schedule.waits_for_exit() {
                pidfile::remove(pid_file);
                SignalOutcome::Stopped
            } else {
                SignalOutcome::NoProcess
            }
        };

        for step in schedule.steps() {
            match *step {
                ScheduleStep::Signal(signal) => {
                    debug!(pid = pid.as_raw(), signal = %signal, "Sending signal");
                    match kill(pid, signal) {
                        Ok(()) => {}
                        Err(Errno::ESRCH) => return Ok(exited()),
                        Err(errno) => {
                            return Err(SupervisorError::SignalFailed {
                                signal,
                                pid: pid.as_raw(),
                                errno,
                            })
                        }
                    }
                }
                ScheduleStep::Timeout(grace) => {
                    if self.wait_for_exit(pid, grace) {
                        info!(pid = pid.as_raw(), "Daemon exited");
                        return Ok(exited());
                    }
                    debug!(
                        pid = pid.as_raw(),
                        grace_secs = grace.as_secs(),
                        "Daemon still running after grace period"
                    );
                }
            }
        }

        if schedule.waits_for_exit() {
            Err(SupervisorError::StillRunning {
                pid: pid.as_raw(),
                waited: schedule.total_wait(),
            })
        } else {
            Ok(SignalOutcome::Delivered)
        }
    }

    fn query(&self, service: &ServiceIdentity, pid_file: &Path, lock_file: &Path) -> RunState {
        match pidfile::read_pid(pid_file) {
            Ok(Some(pid)) => {
                if is_alive(pid) && runs_executable(pid, service.path()) {
                    RunState::Running
                } else {
                    RunState::NotRunningPidFileExists
                }
            }
            Ok(None) if lock_file.exists() => RunState::NotRunningLockFileExists,
            Ok(None) => RunState::NotRunning,
            Err(e) => {
                warn!(error = %e, "Cannot determine daemon state");
                RunState::Unknown
            }
        }
    }
}

/// Whether a process with `pid` exists
///
/// A process owned by another user still counts as alive. A zombie does not,
/// since an orphaned daemon may never be reaped inside a container.
pub fn is_alive(pid: Pid) -> bool {
    match kill(pid, None) {
        Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
        Err(_) => false,
    }
}

fn is_zombie(pid: Pid) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid.as_raw())) else {
        return false;
    };
    // The state field follows the parenthesised command name.
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .is_some_and(|state| state == "Z")
}

/// Whether `pid` is running `executable`
///
/// Compares `/proc/<pid>/exe` with the canonical executable path. When the
/// link cannot be read (another user's process, no procfs) the PID file is
/// trusted.
pub fn runs_executable(pid: Pid, executable: &Path) -> bool {
    let link = match std::fs::read_link(format!("/proc/{}/exe", pid.as_raw())) {
        Ok(link) => link,
        Err(_) => return true,
    };

    // The kernel appends " (deleted)" once the binary is replaced on disk.
    let link = match link.to_str().and_then(|s| s.strip_suffix(" (deleted)")) {
        Some(stripped) => PathBuf::from(stripped),
        None => link,
    };

    let expected = std::fs::canonicalize(executable).unwrap_or_else(|_| executable.to_path_buf());
    link == expected
}
