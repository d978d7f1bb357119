//! Action and run-state types shared by the controller and the supervisor
//!
//! Numeric codes follow the LSB init script conventions, extended with the
//! operation-specific failure codes the controller reports.

use std::fmt;
use std::str::FromStr;

use crate::error::ArgumentError;

/// Exit codes reported by the controller
pub mod exit_code {
    /// Action completed (or was already in the requested state)
    pub const SUCCESS: i32 = 0;
    /// Missing, extra or unknown command-line argument
    pub const INVALID_ARGUMENT: i32 = 2;
    /// Action requires super-user privileges
    pub const SUPER_USER_ONLY: i32 = 4;
    /// Daemon executable could not be found
    pub const DAEMON_NOT_FOUND: i32 = 5;
    /// Defaults file or environment holds an invalid value
    pub const CONFIG_INVALID: i32 = 6;
    pub const RELOADING_FAILED: i32 = 150;
    pub const RESTART_STOP_FAILED: i32 = 151;
    pub const RESTART_START_FAILED: i32 = 152;
    pub const START_FAILED: i32 = 153;
    pub const STOP_FAILED: i32 = 154;
}

/// A service-control verb accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    Stop,
    Restart,
    TryRestart,
    Reload,
    ForceReload,
    Status,
    Help,
}

impl Action {
    /// Every action, in the order shown in the usage line
    pub const ALL: [Action; 8] = [
        Action::Start,
        Action::Stop,
        Action::Restart,
        Action::TryRestart,
        Action::Reload,
        Action::ForceReload,
        Action::Status,
        Action::Help,
    ];

    /// The command-line spelling of this action
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::TryRestart => "try-restart",
            Action::Reload => "reload",
            Action::ForceReload => "force-reload",
            Action::Status => "status",
            Action::Help => "help",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ArgumentError::Unknown(s.to_string()))
    }
}

/// The parsed command line: an action, or the reason there is none
///
/// Argument errors are carried rather than raised so the controller can
/// report them at the right point of its startup sequence.
pub type Request = Result<Action, ArgumentError>;

/// Point-in-time classification of the managed daemon
///
/// Computed fresh on every invocation and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Daemon is running
    Running,
    /// Not running, but a PID file is left behind
    NotRunningPidFileExists,
    /// Not running, but a lock file is left behind
    NotRunningLockFileExists,
    /// Not running
    NotRunning,
    /// State could not be determined
    Unknown,
}

impl RunState {
    /// LSB status exit code for this state
    pub fn code(self) -> i32 {
        match self {
            RunState::Running => 0,
            RunState::NotRunningPidFileExists => 1,
            RunState::NotRunningLockFileExists => 2,
            RunState::NotRunning => 3,
            RunState::Unknown => 4,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::NotRunningPidFileExists => write!(f, "not running but pid file exists"),
            RunState::NotRunningLockFileExists => write!(f, "not running but lock file exists"),
            RunState::NotRunning => write!(f, "not running"),
            RunState::Unknown => write!(f, "in an unknown state"),
        }
    }
}
