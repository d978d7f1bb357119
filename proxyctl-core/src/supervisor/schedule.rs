//! Signal escalation schedules
//!
//! Uses the start-stop-daemon `--retry` notation: `QUIT/30/TERM/5/KILL/5`
//! sends QUIT, waits up to 30 seconds, sends TERM, waits 5 more seconds,
//! then sends KILL and waits 5 seconds. A lone number `N` is shorthand for
//! `TERM/N/KILL/N`. Signals are names (`TERM`, `SIGTERM`) or `-<number>`.
//! A schedule with any timeout must end with one.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use nix::sys::signal::Signal;

/// One step of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStep {
    /// Send a signal
    Signal(Signal),
    /// Wait up to this long for the process to exit
    Timeout(Duration),
}

/// Ordered signal/timeout steps applied to a running daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    steps: Vec<ScheduleStep>,
}

impl Schedule {
    /// A schedule that sends `signal` and does not wait for an exit
    pub fn signal_only(signal: Signal) -> Self {
        Self {
            steps: vec![ScheduleStep::Signal(signal)],
        }
    }

    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }

    /// Whether the schedule waits for the process to exit
    pub fn waits_for_exit(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, ScheduleStep::Timeout(_)))
    }

    /// Sum of all timeouts in the schedule, saturating at [`Duration::MAX`]
    pub fn total_wait(&self) -> Duration {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ScheduleStep::Timeout(timeout) => Some(*timeout),
                ScheduleStep::Signal(_) => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("schedule is empty".to_string());
        }

        if let Ok(seconds) = s.parse::<u64>() {
            let timeout = ScheduleStep::Timeout(Duration::from_secs(seconds));
            return Ok(Self {
                steps: vec![
                    ScheduleStep::Signal(Signal::SIGTERM),
                    timeout,
                    ScheduleStep::Signal(Signal::SIGKILL),
                    timeout,
                ],
            });
        }

        let mut steps = Vec::new();
        for item in s.split('/') {
            let item = item.trim();
            let step = if !item.is_empty() && item.bytes().all(|b| b.is_ascii_digit()) {
                let seconds = item
                    .parse::<u64>()
                    .map_err(|e| format!("invalid timeout '{}': {}", item, e))?;
                ScheduleStep::Timeout(Duration::from_secs(seconds))
            } else {
                ScheduleStep::Signal(parse_signal(item)?)
            };
            steps.push(step);
        }

        if !matches!(steps.first(), Some(ScheduleStep::Signal(_))) {
            return Err("schedule must start with a signal".to_string());
        }

        // A retrying schedule must give the last signal time to take effect.
        let schedule = Self { steps };
        if schedule.waits_for_exit()
            && matches!(schedule.steps.last(), Some(ScheduleStep::Signal(_)))
        {
            return Err("schedule must end with a timeout".to_string());
        }
        Ok(schedule)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match step {
                ScheduleStep::Signal(signal) => {
                    let name = signal.as_str();
                    f.write_str(name.strip_prefix("SIG").unwrap_or(name))?
                }
                ScheduleStep::Timeout(timeout) => write!(f, "{}", timeout.as_secs())?,
            }
        }
        Ok(())
    }
}

/// Parse a signal given as a name (`HUP`, `SIGHUP`) or number (`1`, `-1`)
pub fn parse_signal(value: &str) -> Result<Signal, String> {
    let value = value.trim();
    let numeric = value.strip_prefix('-').unwrap_or(value);

    if !numeric.is_empty() && numeric.bytes().all(|b| b.is_ascii_digit()) {
        let number = numeric
            .parse::<i32>()
            .map_err(|e| format!("invalid signal number '{}': {}", value, e))?;
        return Signal::try_from(number).map_err(|_| format!("unknown signal number {}", number));
    }

    let upper = value.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };
    name.parse::<Signal>()
        .map_err(|_| format!("unknown signal '{}'", value))
}
