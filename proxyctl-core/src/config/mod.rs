//! Configuration module
//!
//! Resolves the controller's runtime configuration once at startup with the
//! precedence built-in defaults < init-framework verbosity file < service
//! defaults file < process environment. The resulting [`RuntimeConfig`] has
//! no setters; it is passed by reference to everything that needs it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::Signal;
use tracing::debug;

use crate::error::{ConfigError, ResolutionError};
use crate::supervisor::schedule::{parse_signal, Schedule};

pub mod defaults_file;

/// Service managed when `PROXYCTL_SERVICE` is not set
pub const DEFAULT_SERVICE_NAME: &str = "proxyd";

/// Directories searched for the daemon executable, in order
pub const DEFAULT_SEARCH_PATH: &str =
    "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Init-framework file carrying the system-wide `VERBOSE` setting
pub const INIT_VARS_FILE: &str = "/etc/default/rcS";

/// Stop escalation: graceful quit, terminate after 30s, force-kill after 5s more
pub const DEFAULT_STOP_SCHEDULE: &str = "QUIT/30/TERM/5/KILL/5";

pub const DEFAULT_RESTART_DELAY_MS: u64 = 100;
pub const DEFAULT_START_TIMEOUT_SECS: u64 = 5;

/// Environment variables read by the controller itself
pub mod env {
    pub const SERVICE: &str = "PROXYCTL_SERVICE";
    pub const SEARCH_PATH: &str = "PROXYCTL_SEARCH_PATH";
    pub const DEFAULTS_FILE: &str = "PROXYCTL_DEFAULTS_FILE";
    pub const INIT_VARS: &str = "PROXYCTL_INIT_VARS";
}

/// Keys understood in defaults files and the environment
pub mod keys {
    pub const NAME: &str = "NAME";
    pub const DAEMON_ARGS: &str = "DAEMON_ARGS";
    pub const PIDFILE: &str = "PIDFILE";
    pub const LOCKFILE: &str = "LOCKFILE";
    pub const VERBOSE: &str = "VERBOSE";
    pub const DESC: &str = "DESC";
    pub const STOP_SCHEDULE: &str = "STOP_SCHEDULE";
    pub const RELOAD_SIGNAL: &str = "RELOAD_SIGNAL";
    pub const RESTART_DELAY_MS: &str = "RESTART_DELAY_MS";
    pub const START_TIMEOUT: &str = "START_TIMEOUT";

    /// Keys the process environment may override
    pub const OVERRIDABLE: [&str; 9] = [
        DAEMON_ARGS,
        PIDFILE,
        LOCKFILE,
        VERBOSE,
        DESC,
        STOP_SCHEDULE,
        RELOAD_SIGNAL,
        RESTART_DELAY_MS,
        START_TIMEOUT,
    ];
}

/// Where configuration is read from
#[derive(Debug, Clone)]
pub struct ConfigSources {
    /// Name of the managed service and its executable
    pub service_name: String,

    /// Colon-separated directories searched for the executable
    pub search_path: String,

    /// Init-framework verbosity file
    pub init_vars: PathBuf,

    /// Service defaults file
    pub defaults_file: PathBuf,

    /// Snapshot of the process environment
    pub environment: HashMap<String, String>,
}

impl ConfigSources {
    /// Sources for `service_name` with the system locations and an empty environment
    pub fn for_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            init_vars: PathBuf::from(INIT_VARS_FILE),
            defaults_file: Path::new("/etc/default").join(service_name),
            environment: HashMap::new(),
        }
    }

    /// Sources described by the current process environment
    pub fn from_env() -> Self {
        let environment: HashMap<String, String> = std::env::vars().collect();

        let service_name = environment
            .get(env::SERVICE)
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

        let mut sources = Self::for_service(&service_name);
        if let Some(search_path) = environment.get(env::SEARCH_PATH) {
            sources.search_path = search_path.clone();
        }
        if let Some(path) = environment.get(env::DEFAULTS_FILE) {
            sources.defaults_file = PathBuf::from(path);
        }
        if let Some(path) = environment.get(env::INIT_VARS) {
            sources.init_vars = PathBuf::from(path);
        }
        sources.environment = environment;
        sources
    }
}

/// Runtime configuration, frozen after [`RuntimeConfig::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    service_name: String,
    search_path: String,
    description: String,
    daemon_args: Vec<String>,
    pid_file: PathBuf,
    lock_file: PathBuf,
    verbose: bool,
    stop_schedule: Schedule,
    reload_signal: Signal,
    restart_delay: Duration,
    start_timeout: Duration,
}

impl RuntimeConfig {
    /// Resolve the configuration from its layered sources
    pub fn load(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let name = sources.service_name.as_str();
        let mut vars = HashMap::from([(keys::NAME.to_string(), name.to_string())]);

        // Only the verbosity setting is taken from the init-framework file.
        let mut init_vars = HashMap::new();
        defaults_file::apply_file(&sources.init_vars, &mut init_vars)?;
        if let Some(verbose) = init_vars.remove(keys::VERBOSE) {
            vars.insert(keys::VERBOSE.to_string(), verbose);
        }

        defaults_file::apply_file(&sources.defaults_file, &mut vars)?;

        for key in keys::OVERRIDABLE {
            if let Some(value) = sources.environment.get(key) {
                debug!(key, "Environment overrides configuration value");
                vars.insert(key.to_string(), value.clone());
            }
        }

        let lookup = |key: &str| vars.get(key).map(String::as_str);

        let config = Self {
            service_name: name.to_string(),
            search_path: sources.search_path.clone(),
            description: lookup(keys::DESC)
                .filter(|desc| !desc.is_empty())
                .unwrap_or(name)
                .to_string(),
            daemon_args: lookup(keys::DAEMON_ARGS)
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            pid_file: lookup(keys::PIDFILE)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("/run/{}.pid", name))),
            lock_file: lookup(keys::LOCKFILE)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| Path::new("/run/lock").join(name)),
            verbose: match lookup(keys::VERBOSE) {
                Some(value) => parse_flag(keys::VERBOSE, value)?,
                None => false,
            },
            stop_schedule: match lookup(keys::STOP_SCHEDULE) {
                Some(value) => parse_with(keys::STOP_SCHEDULE, value, str::parse::<Schedule>)?,
                None => parse_with(
                    keys::STOP_SCHEDULE,
                    DEFAULT_STOP_SCHEDULE,
                    str::parse::<Schedule>,
                )?,
            },
            reload_signal: match lookup(keys::RELOAD_SIGNAL) {
                Some(value) => parse_with(keys::RELOAD_SIGNAL, value, parse_signal)?,
                None => Signal::SIGHUP,
            },
            restart_delay: Duration::from_millis(match lookup(keys::RESTART_DELAY_MS) {
                Some(value) => parse_number(keys::RESTART_DELAY_MS, value)?,
                None => DEFAULT_RESTART_DELAY_MS,
            }),
            start_timeout: Duration::from_secs(match lookup(keys::START_TIMEOUT) {
                Some(value) => parse_number(keys::START_TIMEOUT, value)?,
                None => DEFAULT_START_TIMEOUT_SECS,
            }),
        };

        debug!(
            service = %config.service_name,
            pid_file = %config.pid_file.display(),
            verbose = config.verbose,
            stop_schedule = %config.stop_schedule,
            "Loaded runtime configuration"
        );

        Ok(config)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    /// Human-readable description used in progress lines
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Arguments passed to the daemon, split like unquoted shell words
    pub fn daemon_args(&self) -> &[String] {
        &self.daemon_args
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    /// Whether progress and success lines are shown
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn stop_schedule(&self) -> &Schedule {
        &self.stop_schedule
    }

    pub fn reload_signal(&self) -> Signal {
        self.reload_signal
    }

    /// Pause between the stop and start phases of a restart
    pub fn restart_delay(&self) -> Duration {
        self.restart_delay
    }

    /// How long a start waits for the daemon to show up
    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected yes or no".to_string(),
        }),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    parse_with(key, value, |v| {
        v.trim()
            .parse::<u64>()
            .map_err(|e| format!("expected a whole number: {}", e))
    })
}

fn parse_with<T, E: ToString>(
    key: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Name and resolved executable path of the managed daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    name: String,
    path: PathBuf,
}

impl ServiceIdentity {
    /// Build an identity from an already resolved executable path
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Resolve `name` against the colon-separated `search_path`
    pub fn resolve(name: &str, search_path: &str) -> Result<Self, ResolutionError> {
        let not_found = || ResolutionError::NotFound {
            name: name.to_string(),
            search_path: search_path.to_string(),
        };

        if name.is_empty() || name.contains('/') {
            return Err(not_found());
        }

        let path = which::which_in(name, Some(search_path), "/").map_err(|e| {
            debug!(name, search_path, error = %e, "Executable lookup failed");
            not_found()
        })?;

        debug!(name, path = %path.display(), "Resolved daemon executable");
        Ok(Self::new(name, path))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
