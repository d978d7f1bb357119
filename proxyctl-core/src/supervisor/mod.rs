//! Process supervision
//!
//! The controller drives the daemon only through the [`Supervisor`] trait:
//! spawn it, signal it along an escalation schedule, and query its run
//! state. [`ProcessSupervisor`] implements it against real OS processes;
//! tests substitute their own implementation.

use std::path::Path;

use crate::config::ServiceIdentity;
use crate::error::SupervisorError;
use crate::types::RunState;

pub mod pidfile;
pub mod process;
pub mod schedule;

pub use process::ProcessSupervisor;
pub use schedule::{Schedule, ScheduleStep};

/// Result of walking a signal schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// No live process matched the PID file; nothing was signalled
    NoProcess,
    /// Signals were sent and the schedule does not wait for an exit
    Delivered,
    /// The process exited within the schedule
    Stopped,
}

/// Narrow process-control interface used by the controller
pub trait Supervisor {
    /// Start the daemon in the background with `args`, recording its PID in `pid_file`
    ///
    /// Returns once the daemon is confirmed running.
    fn spawn(
        &self,
        service: &ServiceIdentity,
        args: &[String],
        pid_file: &Path,
    ) -> Result<(), SupervisorError>;

    /// Signal the daemon named by `pid_file`, escalating along `schedule`
    fn signal(
        &self,
        service: &ServiceIdentity,
        pid_file: &Path,
        schedule: &Schedule,
    ) -> Result<SignalOutcome, SupervisorError>;

    /// Classify whether the daemon is alive right now
    fn query(&self, service: &ServiceIdentity, pid_file: &Path, lock_file: &Path) -> RunState;
}
