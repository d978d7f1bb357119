//! Service control command
//!
//! Loads configuration from the system and the environment, then hands the
//! request to the controller backed by real OS processes.

use proxyctl_core::config::{ConfigSources, RuntimeConfig};
use proxyctl_core::controller::{Caller, ServiceController};
use proxyctl_core::error::CtlError;
use proxyctl_core::report::Reporter;
use proxyctl_core::supervisor::ProcessSupervisor;
use proxyctl_core::types::Request;
use tracing::{debug, error};

/// Run one service-control request and return the exit code
pub fn run_service(request: Request) -> i32 {
    let sources = ConfigSources::from_env();
    debug!(
        service = %sources.service_name,
        defaults_file = %sources.defaults_file.display(),
        "Loading configuration"
    );

    let config = match RuntimeConfig::load(&sources) {
        Ok(config) => config,
        Err(e) => {
            let e = CtlError::from(e);
            error!(error = %e, "Configuration could not be loaded");
            Reporter::stdio(false).failure(&e.to_string());
            return e.exit_code();
        }
    };

    let supervisor = ProcessSupervisor::new(config.start_timeout());
    let mut reporter = Reporter::stdio(config.verbose());
    let mut controller =
        ServiceController::new(&config, Caller::current(), &supervisor, &mut reporter);
    controller.run(request)
}
