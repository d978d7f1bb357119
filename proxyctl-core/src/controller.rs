//! Service controller
//!
//! Runs one invocation: resolve the daemon executable, validate the
//! request, check privileges, query the run state and dispatch the action.
//! Every path ends in an exit code.

use std::io::Write;

use tracing::{debug, info};

use crate::config::{RuntimeConfig, ServiceIdentity};
use crate::error::{CtlError, OperationError, SupervisorError};
use crate::report::Reporter;
use crate::supervisor::{Schedule, SignalOutcome, Supervisor};
use crate::types::{exit_code, Action, Request, RunState};

/// Privileges of the invoking user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    superuser: bool,
}

impl Caller {
    /// The user running this process, judged by effective uid
    pub fn current() -> Self {
        Self {
            superuser: nix::unistd::geteuid().is_root(),
        }
    }

    pub fn superuser() -> Self {
        Self { superuser: true }
    }

    pub fn unprivileged() -> Self {
        Self { superuser: false }
    }

    pub fn is_superuser(&self) -> bool {
        self.superuser
    }
}

/// Successful end of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action completed or was already satisfied
    Done,
    /// Run state reported by `status`
    Status(RunState),
    /// Usage was printed
    Help,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Done | Outcome::Help => exit_code::SUCCESS,
            Outcome::Status(state) => state.code(),
        }
    }
}

/// Dispatches a single request against the managed daemon
pub struct ServiceController<'a, S: Supervisor, W: Write, E: Write> {
    config: &'a RuntimeConfig,
    caller: Caller,
    supervisor: &'a S,
    reporter: &'a mut Reporter<W, E>,
}

impl<'a, S: Supervisor, W: Write, E: Write> ServiceController<'a, S, W, E> {
    pub fn new(
        config: &'a RuntimeConfig,
        caller: Caller,
        supervisor: &'a S,
        reporter: &'a mut Reporter<W, E>,
    ) -> Self {
        Self {
            config,
            caller,
            supervisor,
            reporter,
        }
    }

    /// Handle `request`, report any failure, and return the exit code
    pub fn run(&mut self, request: Request) -> i32 {
        match self.execute(request) {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                // An operation failure completes the pending progress line.
                let completed = match &e {
                    CtlError::Operation(op) => {
                        self.reporter.end_msg_failed(&op.cause().to_string())
                    }
                    _ => false,
                };
                if !completed {
                    self.reporter.failure(&e.to_string());
                }
                if matches!(e, CtlError::InvalidArgument(_)) {
                    self.reporter.usage(self.config.service_name(), true);
                }
                e.exit_code()
            }
        }
    }

    /// Handle `request` without reporting the final error
    pub fn execute(&mut self, request: Request) -> Result<Outcome, CtlError> {
        let name = self.config.service_name();

        let service = match ServiceIdentity::resolve(name, self.config.search_path()) {
            Ok(service) => service,
            Err(e) if request == Ok(Action::Stop) => {
                self.reporter
                    .warning(&format!("{}; nothing to stop", e));
                return Ok(Outcome::Done);
            }
            Err(e) => return Err(e.into()),
        };

        let action = request?;
        debug!(%action, service = service.name(), "Dispatching action");

        if action == Action::Help {
            self.reporter.usage(name, false);
            return Ok(Outcome::Help);
        }

        if action == Action::TryRestart && !self.caller.is_superuser() {
            return Err(CtlError::SuperUserOnly { action });
        }

        let state = self.query(&service);
        debug!(%state, "Queried run state");

        match action {
            Action::Start => self.start(&service, state),
            Action::Stop => self.stop(&service, state),
            Action::Restart => self.restart(&service, state),
            Action::TryRestart => self.try_restart(&service, state),
            Action::Reload | Action::ForceReload => self.reload(&service, state),
            Action::Status => {
                self.reporter.status_of_proc(service.name(), state);
                Ok(Outcome::Status(state))
            }
            Action::Help => Ok(Outcome::Help),
        }
    }

    fn query(&self, service: &ServiceIdentity) -> RunState {
        self.supervisor
            .query(service, self.config.pid_file(), self.config.lock_file())
    }

    fn spawn(&self, service: &ServiceIdentity) -> Result<(), SupervisorError> {
        self.supervisor
            .spawn(service, self.config.daemon_args(), self.config.pid_file())
    }

    fn stop_daemon(&self, service: &ServiceIdentity) -> Result<SignalOutcome, SupervisorError> {
        self.supervisor
            .signal(service, self.config.pid_file(), self.config.stop_schedule())
    }

    fn start(&mut self, service: &ServiceIdentity, state: RunState) -> Result<Outcome, CtlError> {
        if state.is_running() {
            self.reporter
                .info(&format!("{} already started", service.name()));
            return Ok(Outcome::Done);
        }

        self.reporter
            .daemon_msg(&format!("Starting {}", self.config.description()), service.name());

        match self.spawn(service) {
            Ok(()) => {
                self.reporter.end_msg();
                Ok(Outcome::Done)
            }
            Err(source) => {
                Err(OperationError::StartFailed {
                    name: service.name().to_string(),
                    source,
                }
                .into())
            }
        }
    }

    fn stop(&mut self, service: &ServiceIdentity, state: RunState) -> Result<Outcome, CtlError> {
        if !state.is_running() {
            self.reporter
                .info(&format!("{} already stopped", service.name()));
            return Ok(Outcome::Done);
        }

        self.reporter
            .daemon_msg(&format!("Stopping {}", self.config.description()), service.name());

        match self.stop_daemon(service) {
            Ok(outcome) => {
                debug!(?outcome, "Stop schedule finished");
                self.reporter.end_msg();
                Ok(Outcome::Done)
            }
            Err(source) => {
                Err(OperationError::StopFailed {
                    name: service.name().to_string(),
                    source,
                }
                .into())
            }
        }
    }

    fn restart(&mut self, service: &ServiceIdentity, state: RunState) -> Result<Outcome, CtlError> {
        self.reporter.daemon_msg(
            &format!("Restarting {}", self.config.description()),
            service.name(),
        );

        if state.is_running() {
            if let Err(source) = self.stop_daemon(service) {
                return Err(OperationError::RestartStopFailed {
                    name: service.name().to_string(),
                    source,
                }
                .into());
            }

            let delay = self.config.restart_delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        match self.spawn(service) {
            Ok(()) => {
                info!(service = service.name(), "Daemon restarted");
                self.reporter.end_msg();
                Ok(Outcome::Done)
            }
            Err(source) => {
                Err(OperationError::RestartStartFailed {
                    name: service.name().to_string(),
                    source,
                }
                .into())
            }
        }
    }

    fn try_restart(
        &mut self,
        service: &ServiceIdentity,
        state: RunState,
    ) -> Result<Outcome, CtlError> {
        if !state.is_running() {
            self.reporter
                .info(&format!("{} is not running, not restarting", service.name()));
            return Ok(Outcome::Done);
        }
        self.restart(service, state)
    }

    fn reload(&mut self, service: &ServiceIdentity, state: RunState) -> Result<Outcome, CtlError> {
        if !state.is_running() {
            self.reporter
                .info(&format!("{} is not running, nothing to reload", service.name()));
            return Ok(Outcome::Done);
        }

        self.reporter.daemon_msg(
            &format!("Reloading {}", self.config.description()),
            service.name(),
        );

        let schedule = Schedule::signal_only(self.config.reload_signal());
        match self
            .supervisor
            .signal(service, self.config.pid_file(), &schedule)
        {
            Ok(outcome) => {
                debug!(?outcome, signal = %self.config.reload_signal(), "Reload signal sent");
                self.reporter.end_msg();
                Ok(Outcome::Done)
            }
            Err(source) => {
                Err(OperationError::ReloadingFailed {
                    name: service.name().to_string(),
                    source,
                }
                .into())
            }
        }
    }
}
