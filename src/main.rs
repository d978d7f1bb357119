//! proxyctl - init controller for a background network proxy daemon
//!
//! Starts, stops, restarts, reloads and reports the status of the daemon
//! with the exit codes expected by traditional init frameworks.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use proxyctl_core::error::ArgumentError;
use proxyctl_core::init_logging;
use proxyctl_core::types::{Action, Request};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "proxyctl")]
#[command(version)]
#[command(about = "Control the proxy daemon like an LSB init script")]
struct Cli {
    /// One of: start, stop, restart, try-restart, reload, force-reload, status, help
    #[arg(value_name = "ACTION", value_parser = parse_action)]
    action: Option<Action>,
}

fn parse_action(value: &str) -> Result<Action, ArgumentError> {
    value.parse()
}

/// Turn the clap parse result into a request
///
/// `--help` is the `help` action; every other parse error is carried as an
/// argument error so it is reported with the controller's exit code.
fn request_from(parsed: Result<Cli, clap::Error>) -> Request {
    match parsed {
        Ok(Cli {
            action: Some(action),
        }) => Ok(action),
        Ok(Cli { action: None }) => Err(ArgumentError::Missing),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Ok(Action::Help)
            }
            ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
                Err(ArgumentError::Unknown(context(&e, ContextKind::InvalidValue)))
            }
            _ => Err(ArgumentError::Unexpected(context(&e, ContextKind::InvalidArg))),
        },
    }
}

fn context(e: &clap::Error, kind: ContextKind) -> String {
    match e.get(kind) {
        Some(ContextValue::String(value)) => value.clone(),
        Some(other) => other.to_string(),
        None => e.kind().to_string(),
    }
}

fn main() {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let parsed = Cli::try_parse();
    if let Err(e) = &parsed {
        if e.kind() == ErrorKind::DisplayVersion {
            let _ = e.print();
            std::process::exit(0);
        }
    }

    let exit_code = cli::service::run_service(request_from(parsed));
    std::process::exit(exit_code);
}
