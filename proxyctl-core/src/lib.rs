//! Core library for the proxyctl init controller
//!
//! This crate provides configuration loading, run-state detection, process
//! supervision and LSB-style status reporting for a single background
//! network proxy daemon.

pub mod error;
pub mod types;

pub mod config;
pub mod controller;
pub mod report;
pub mod supervisor;

/// Environment variable selecting the diagnostic log level
pub const LOG_LEVEL_ENV: &str = "PROXYCTL_LOG";

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when started by systemd.
/// Otherwise diagnostics go to stderr, below the status lines, at the level
/// named by `PROXYCTL_LOG` (default `warn`).
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match std::env::var(LOG_LEVEL_ENV) {
        Ok(value) => value.parse::<LevelFilter>()?,
        Err(_) => LevelFilter::WARN,
    };

    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            let journal_layer =
                tracing_journald::layer()?.with_syslog_identifier("proxyctl".to_string());
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(level)
                .init();
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(level)
        .init();

    Ok(())
}
