//! Domain types for autosleepd.

use std::fmt;
use std::time::Duration;

/// How a monitor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The suspend request was accepted by the OS.
    Suspended,
    /// Cancellation was signalled before the threshold was reached.
    CancelledByUser,
    /// The suspend request failed. Not retried.
    FailedFatal(String),
}

impl Outcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Suspended | Self::CancelledByUser => 0,
            Self::FailedFatal(_) => 1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspended => f.write_str("suspended"),
            Self::CancelledByUser => f.write_str("cancelled by user"),
            Self::FailedFatal(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Decision from the threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendDecision {
    /// Idle time reached the threshold.
    Suspend,
    /// Keep polling.
    Wait,
}

/// Level-triggered, inclusive threshold check.
///
/// Only the current measurement matters; there is no memory of earlier polls.
pub fn decide(idle: Duration, threshold: Duration) -> SuspendDecision {
    if idle >= threshold {
        SuspendDecision::Suspend
    } else {
        SuspendDecision::Wait
    }
}

/// What a single poll observed, handed to the status hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// 1-based poll counter.
    pub poll: u64,

    /// Measured idle time, `None` when the query failed.
    pub idle: Option<Duration>,

    /// Configured threshold.
    pub threshold: Duration,
}

impl PollReport {
    /// Idle time used for the decision. A failed query counts as active.
    pub fn effective_idle(&self) -> Duration {
        self.idle.unwrap_or(Duration::ZERO)
    }
}

/// Render a duration as "M min S sec".
pub fn format_idle(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{} min {} sec", secs / 60, secs % 60)
}
