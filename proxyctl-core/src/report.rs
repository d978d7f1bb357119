//! LSB-style status lines
//!
//! Mirrors the `lsb-base` init-functions: progress and success lines are
//! only shown when `VERBOSE` is on, warnings and failures are always shown,
//! and `status_of_proc` output is always shown since it is what the caller
//! asked for.

use std::io::{self, Write};

use colored::Colorize;

use crate::types::{Action, RunState};

/// Writes human-readable status lines to an output and an error stream
pub struct Reporter<W: Write, E: Write> {
    out: W,
    err: E,
    verbose: bool,
    pending: Option<String>,
}

impl Reporter<io::Stdout, io::Stderr> {
    /// Reporter on the process's standard streams
    pub fn stdio(verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), verbose)
    }
}

impl<W: Write, E: Write> Reporter<W, E> {
    pub fn new(out: W, err: E, verbose: bool) -> Self {
        Self {
            out,
            err,
            verbose,
            pending: None,
        }
    }

    /// Begin a progress line such as `Starting proxy daemon: proxyd`
    ///
    /// The line is completed by [`Reporter::end_msg`] or
    /// [`Reporter::end_msg_failed`].
    pub fn daemon_msg(&mut self, description: &str, name: &str) {
        self.pending = Some(format!("{}: {}", description, name));
    }

    /// Complete the pending progress line as done
    pub fn end_msg(&mut self) {
        let Some(message) = self.pending.take() else {
            return;
        };
        if self.verbose {
            let _ = writeln!(self.out, "[ {} ] {}.", "ok".green(), message);
        }
    }

    /// Complete the pending progress line as failed with `reason`
    ///
    /// Returns whether a line was written. Without a pending line, or when
    /// not verbose, nothing is written and the caller reports the failure.
    pub fn end_msg_failed(&mut self, reason: &str) -> bool {
        let Some(message) = self.pending.take() else {
            return false;
        };
        if !self.verbose {
            return false;
        }
        let _ = writeln!(self.err, "[{}] {} failed: {}", "FAIL".red(), message, reason);
        true
    }

    /// Informational line, shown when verbose
    pub fn info(&mut self, message: &str) {
        if self.verbose {
            let _ = writeln!(self.out, "[{}] {}", "info".cyan(), message);
        }
    }

    /// Warning line, always shown
    pub fn warning(&mut self, message: &str) {
        let _ = writeln!(self.err, "[{}] {}", "warn".yellow(), message);
    }

    /// Failure line, always shown
    pub fn failure(&mut self, message: &str) {
        let _ = writeln!(self.err, "[{}] {}", "FAIL".red(), message);
    }

    /// Report the run state of `name`, like LSB `status_of_proc`
    pub fn status_of_proc(&mut self, name: &str, state: RunState) {
        let message = match state {
            RunState::Unknown => format!("could not access PID file for {}", name),
            _ => format!("{} is {}", name, state),
        };

        let _ = if state.is_running() {
            writeln!(self.out, "[ {} ] {}.", "ok".green(), message)
        } else {
            writeln!(self.out, "[{}] {} ... failed!", "FAIL".red(), message)
        };
    }

    /// Print the usage line for `/etc/init.d/<name>`
    pub fn usage(&mut self, name: &str, to_stderr: bool) {
        let verbs: Vec<&str> = Action::ALL.iter().map(|action| action.as_str()).collect();
        let line = format!("Usage: /etc/init.d/{} {{{}}}", name, verbs.join("|"));

        let _ = if to_stderr {
            writeln!(self.err, "{}", line)
        } else {
            writeln!(self.out, "{}", line)
        };
    }

    /// Output and error streams, for inspection once reporting is done
    pub fn streams(&self) -> (&W, &E) {
        (&self.out, &self.err)
    }
}
