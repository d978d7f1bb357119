//! Error types for the proxyctl init controller
//!
//! Every error is terminal for the current invocation. Each top-level
//! variant maps to a fixed exit code so init frameworks and monitoring can
//! branch on the outcome without parsing text.

use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

use crate::types::{exit_code, Action};

/// Main error type for the controller
#[derive(Error, Debug)]
pub enum CtlError {
    /// Wrong arity or unrecognized action
    #[error("{0}")]
    InvalidArgument(#[from] ArgumentError),

    /// Caller lacks the privileges an action requires
    #[error("{action} can only be run by the super-user")]
    SuperUserOnly { action: Action },

    /// Daemon executable is not installed
    #[error("{0}")]
    DaemonNotFound(#[from] ResolutionError),

    /// Defaults file or environment could not be used
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A start/stop/reload operation failed
    #[error("{0}")]
    Operation(#[from] OperationError),
}

impl CtlError {
    /// The exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CtlError::InvalidArgument(_) => exit_code::INVALID_ARGUMENT,
            CtlError::SuperUserOnly { .. } => exit_code::SUPER_USER_ONLY,
            CtlError::DaemonNotFound(_) => exit_code::DAEMON_NOT_FOUND,
            CtlError::Config(_) => exit_code::CONFIG_INVALID,
            CtlError::Operation(e) => e.exit_code(),
        }
    }
}

/// Command-line argument errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("no action given")]
    Missing,

    #[error("unexpected argument '{0}'")]
    Unexpected(String),

    #[error("unknown action '{0}'")]
    Unknown(String),
}

/// Executable resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("{name} executable not found in {search_path}")]
    NotFound { name: String, search_path: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Failures of the process-control operations behind each action
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("failed to start {name}: {source}")]
    StartFailed { name: String, source: SupervisorError },

    #[error("failed to stop {name}: {source}")]
    StopFailed { name: String, source: SupervisorError },

    #[error("failed to reload {name}: {source}")]
    ReloadingFailed { name: String, source: SupervisorError },

    #[error("failed to stop {name} for restart: {source}")]
    RestartStopFailed { name: String, source: SupervisorError },

    #[error("failed to start {name} for restart: {source}")]
    RestartStartFailed { name: String, source: SupervisorError },
}

impl OperationError {
    pub fn exit_code(&self) -> i32 {
        match self {
            OperationError::StartFailed { .. } => exit_code::START_FAILED,
            OperationError::StopFailed { .. } => exit_code::STOP_FAILED,
            OperationError::ReloadingFailed { .. } => exit_code::RELOADING_FAILED,
            OperationError::RestartStopFailed { .. } => exit_code::RESTART_STOP_FAILED,
            OperationError::RestartStartFailed { .. } => exit_code::RESTART_START_FAILED,
        }
    }

    /// The supervisor failure behind this operation
    pub fn cause(&self) -> &SupervisorError {
        match self {
            OperationError::StartFailed { source, .. }
            | OperationError::StopFailed { source, .. }
            | OperationError::ReloadingFailed { source, .. }
            | OperationError::RestartStopFailed { source, .. }
            | OperationError::RestartStartFailed { source, .. } => source,
        }
    }
}

/// Process supervision errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("cannot use pid file {}: {reason}", .path.display())]
    PidFile { path: PathBuf, reason: String },

    #[error("failed to spawn daemon: {reason}")]
    SpawnFailed { reason: String },

    #[error("daemon did not come up within {} ms", .waited.as_millis())]
    StartupTimeout { waited: Duration },

    #[error("daemon (pid {pid}) exited during startup")]
    ExitedDuringStartup { pid: i32 },

    #[error("failed to send {signal} to pid {pid}: {errno}")]
    SignalFailed { signal: Signal, pid: i32, errno: Errno },

    #[error("pid {pid} still running after {}s", .waited.as_secs())]
    StillRunning { pid: i32, waited: Duration },
}
