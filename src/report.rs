//! Human-readable progress output.
//!
//! [`Reporter`] is the line-oriented sink workers write trial events to. Each
//! event is written as one whole line under a lock so lines from concurrent
//! workers never interleave. Output is gated on verbosity:
//!
//! | event                | minimum verbosity |
//! |----------------------|-------------------|
//! | connection failure   | 0                 |
//! | success              | 0                 |
//! | failed attempt       | 1                 |
//! | attempt started      | 2                 |
//! | parsed pair          | 3                 |
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use colored::*;

use crate::coordinator::RunSummary;
use crate::credential::Credential;

pub struct Reporter {
    verbosity: u8,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Reporter {
    pub fn new(verbosity: u8, out: Box<dyn Write + Send>) -> Self {
        Self {
            verbosity,
            out: Mutex::new(out),
        }
    }

    pub fn stdout(verbosity: u8) -> Self {
        Self::new(verbosity, Box::new(io::stdout()))
    }

    /// Discard everything; used where only the outcome matters.
    pub fn sink() -> Self {
        Self::new(0, Box::new(io::sink()))
    }

    fn line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    pub fn parsed(&self, c: &Credential) {
        if self.verbosity >= 3 {
            self.line(&format!("username: {} password: {}", c.username, c.password));
        }
    }

    pub fn trying(&self, host: &str, c: &Credential) {
        if self.verbosity >= 2 {
            self.line(&format!("Trying: {} {}", host, c));
        }
    }

    pub fn failed(&self, c: &Credential) {
        if self.verbosity >= 1 {
            self.line(&format!("Failed: {}", c));
        }
    }

    pub fn connection_failed(&self, c: &Credential) {
        self.line(&format!("Connection failed, not tried: {}", c));
    }

    pub fn success(&self, c: &Credential) {
        self.line(&format!(
            "{} Username: {} Password: {}",
            "Success!".bold().green(),
            c.username,
            c.password
        ));
    }

    pub fn summary(&self, summary: &RunSummary) {
        self.line(&render_summary(summary));
    }
}

fn format_elapsed(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}

pub fn render_summary(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Trial Summary".bold().cyan()));
    out.push_str(&format!("Workers: {}\n", summary.workers));
    out.push_str(&format!("Lines consumed: {}\n", summary.lines_consumed));
    out.push_str(&format!("Malformed lines: {}\n", summary.malformed_lines));
    out.push_str(&format!("Attempts: {}\n", stats.attempts));
    out.push_str(&format!("Failed logins: {}\n", stats.failures));
    out.push_str(&format!(
        "Connection failures: {} ({})\n",
        stats.connection_failures,
        stats.connection_failure_percentage()
    ));
    out.push_str(&format!("Elapsed: {}\n", format_elapsed(summary.elapsed)));
    match &summary.found {
        Some(c) => out.push_str(&format!("Result: found {}", c)),
        None => out.push_str("Result: no valid credential found"),
    }
    out
}
