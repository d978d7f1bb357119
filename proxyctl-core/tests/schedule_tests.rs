//! Tests for signal escalation schedules

use std::time::Duration;

use nix::sys::signal::Signal;
use proxyctl_core::config::DEFAULT_STOP_SCHEDULE;
use proxyctl_core::supervisor::{Schedule, ScheduleStep};

#[test]
fn test_default_stop_schedule() {
    let schedule: Schedule = DEFAULT_STOP_SCHEDULE.parse().unwrap();

    assert_eq!(
        schedule.steps(),
        &[
            ScheduleStep::Signal(Signal::SIGQUIT),
            ScheduleStep::Timeout(Duration::from_secs(30)),
            ScheduleStep::Signal(Signal::SIGTERM),
            ScheduleStep::Timeout(Duration::from_secs(5)),
            ScheduleStep::Signal(Signal::SIGKILL),
            ScheduleStep::Timeout(Duration::from_secs(5)),
        ]
    );
    assert!(schedule.waits_for_exit());
    assert_eq!(schedule.total_wait(), Duration::from_secs(40));
    assert_eq!(schedule.to_string(), DEFAULT_STOP_SCHEDULE);
}

#[test]
fn test_bare_timeout_shorthand() {
    let schedule: Schedule = "10".parse().unwrap();
    assert_eq!(schedule.to_string(), "TERM/10/KILL/10");
}

#[test]
fn test_numeric_signal_needs_dash() {
    let schedule: Schedule = "-1/2".parse().unwrap();
    assert_eq!(
        schedule.steps(),
        &[
            ScheduleStep::Signal(Signal::SIGHUP),
            ScheduleStep::Timeout(Duration::from_secs(2)),
        ]
    );
}

#[test]
fn test_signal_only_schedule() {
    let schedule = Schedule::signal_only(Signal::SIGHUP);
    assert!(!schedule.waits_for_exit());
    assert_eq!(schedule.total_wait(), Duration::ZERO);
    assert_eq!(schedule.to_string(), "HUP");
}

#[test]
fn test_invalid_schedules() {
    for input in [
        "",
        "30/TERM",
        "TERM//5",
        "BOGUS/5",
        "TERM/5/NOPE",
        "QUIT/30/TERM",
        "TERM/5/KILL",
    ] {
        assert!(
            input.parse::<Schedule>().is_err(),
            "{:?} should be rejected",
            input
        );
    }
}

#[test]
fn test_signal_without_timeouts_is_accepted() {
    let schedule: Schedule = "TERM".parse().unwrap();
    assert!(!schedule.waits_for_exit());
    assert_eq!(schedule.steps(), &[ScheduleStep::Signal(Signal::SIGTERM)]);
}

#[test]
fn test_total_wait_saturates() {
    let schedule: Schedule = "TERM/18446744073709551615/KILL/5".parse().unwrap();
    assert_eq!(schedule.total_wait(), Duration::MAX);

    let schedule: Schedule = "18446744073709551615".parse().unwrap();
    assert_eq!(schedule.total_wait(), Duration::MAX);
}
