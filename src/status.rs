//! Per-poll status reporting.

use crate::domain::PollReport;
use crate::domain::format_idle;

/// Receives one report per poll cycle.
pub trait StatusSink: Send {
    fn report(&mut self, report: &PollReport);
}

/// Prints a human-readable status line to stdout.
#[derive(Debug, Default)]
pub struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn report(&mut self, report: &PollReport) {
        println!("{}", status_line(report));
    }
}

/// Discards reports (`--quiet`).
#[derive(Debug, Default)]
pub struct SilentStatus;

impl StatusSink for SilentStatus {
    fn report(&mut self, _report: &PollReport) {}
}

/// Format a report as shown on the console.
pub fn status_line(report: &PollReport) -> String {
    match report.idle {
        Some(idle) => format!(
            "Idle time: {} / {}",
            format_idle(idle),
            format_idle(report.threshold)
        ),
        None => format!(
            "Idle time: unknown (query failed) / {}",
            format_idle(report.threshold)
        ),
    }
}
