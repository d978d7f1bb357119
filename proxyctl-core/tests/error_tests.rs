//! Unit tests for error types and exit-code mapping

use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use proxyctl_core::error::{
    ArgumentError, ConfigError, CtlError, OperationError, ResolutionError, SupervisorError,
};
use proxyctl_core::types::{exit_code, Action};

fn supervisor_error() -> SupervisorError {
    SupervisorError::StillRunning {
        pid: 4242,
        waited: Duration::from_secs(40),
    }
}

#[test]
fn test_argument_error_display() {
    assert_eq!(ArgumentError::Missing.to_string(), "no action given");
    assert_eq!(
        ArgumentError::Unknown("bogus".to_string()).to_string(),
        "unknown action 'bogus'"
    );
    assert_eq!(
        ArgumentError::Unexpected("now".to_string()).to_string(),
        "unexpected argument 'now'"
    );
}

#[test]
fn test_resolution_error_display() {
    let error = ResolutionError::NotFound {
        name: "proxyd".to_string(),
        search_path: "/usr/sbin:/usr/bin".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "proxyd executable not found in /usr/sbin:/usr/bin"
    );
}

#[test]
fn test_supervisor_error_display() {
    assert_eq!(supervisor_error().to_string(), "pid 4242 still running after 40s");

    let error = SupervisorError::SignalFailed {
        signal: Signal::SIGHUP,
        pid: 17,
        errno: Errno::EPERM,
    };
    assert!(error.to_string().starts_with("failed to send SIGHUP to pid 17"));

    let error = SupervisorError::PidFile {
        path: PathBuf::from("/run/proxyd.pid"),
        reason: "invalid pid 'abc'".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "cannot use pid file /run/proxyd.pid: invalid pid 'abc'"
    );
}

#[test]
fn test_exit_codes() {
    let cases: Vec<(CtlError, i32)> = vec![
        (ArgumentError::Missing.into(), 2),
        (CtlError::SuperUserOnly { action: Action::TryRestart }, 4),
        (
            ResolutionError::NotFound {
                name: "proxyd".to_string(),
                search_path: "/bin".to_string(),
            }
            .into(),
            5,
        ),
        (
            ConfigError::InvalidValue {
                key: "VERBOSE".to_string(),
                value: "maybe".to_string(),
                reason: "expected yes or no".to_string(),
            }
            .into(),
            6,
        ),
        (
            OperationError::ReloadingFailed {
                name: "proxyd".to_string(),
                source: supervisor_error(),
            }
            .into(),
            150,
        ),
        (
            OperationError::RestartStopFailed {
                name: "proxyd".to_string(),
                source: supervisor_error(),
            }
            .into(),
            151,
        ),
        (
            OperationError::RestartStartFailed {
                name: "proxyd".to_string(),
                source: supervisor_error(),
            }
            .into(),
            152,
        ),
        (
            OperationError::StartFailed {
                name: "proxyd".to_string(),
                source: supervisor_error(),
            }
            .into(),
            153,
        ),
        (
            OperationError::StopFailed {
                name: "proxyd".to_string(),
                source: supervisor_error(),
            }
            .into(),
            154,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error.exit_code(), expected, "exit code for {:?}", error);
    }
}

#[test]
fn test_exit_code_constants() {
    assert_eq!(exit_code::SUCCESS, 0);
    assert_eq!(exit_code::INVALID_ARGUMENT, 2);
    assert_eq!(exit_code::SUPER_USER_ONLY, 4);
    assert_eq!(exit_code::DAEMON_NOT_FOUND, 5);
    assert_eq!(exit_code::RELOADING_FAILED, 150);
    assert_eq!(exit_code::STOP_FAILED, 154);
}

#[test]
fn test_operation_error_keeps_source() {
    use std::error::Error;

    let error = OperationError::StopFailed {
        name: "proxyd".to_string(),
        source: supervisor_error(),
    };
    assert_eq!(
        error.to_string(),
        "failed to stop proxyd: pid 4242 still running after 40s"
    );
    assert!(error.source().is_some());
}

#[test]
fn test_ctl_error_from_config() {
    let io_error = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad bytes");
    let error: CtlError = ConfigError::Io {
        path: PathBuf::from("/etc/default/proxyd"),
        source: io_error,
    }
    .into();
    assert!(matches!(error, CtlError::Config(_)));
    assert_eq!(
        error.to_string(),
        "Configuration error: failed to read /etc/default/proxyd: bad bytes"
    );
}
