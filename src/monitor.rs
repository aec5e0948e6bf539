//! Idle monitor loop.
//!
//! Polls an [`IdleSource`], reports every measurement, and hands off to a
//! [`SuspendAction`] once the idle time reaches the threshold:
//! - each poll is an independent, level-triggered check of the fresh value
//! - a failed query counts as zero idle time and never suspends
//! - suspend is requested at most once, after which the loop ends
//! - cancellation is honoured between polls, during a query and during the sleep

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::domain::Outcome;
use crate::domain::PollReport;
use crate::domain::SuspendDecision;
use crate::domain::decide;
use crate::domain::format_idle;
use crate::idle::IdleError;
use crate::idle::IdleSource;
use crate::power::SuspendAction;
use crate::status::StatusSink;

/// Default upper bound on a single idle query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Invalid monitor parameters.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MonitorError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Idle threshold and poll cadence for one run.
#[derive(Debug, Clone, Copy)]
pub struct IdleMonitor {
    threshold: Duration,
    interval: Duration,
    query_timeout: Duration,
}

impl IdleMonitor {
    /// Create a monitor. Both durations must be non-zero.
    pub fn new(threshold: Duration, interval: Duration) -> Result<Self, MonitorError> {
        if threshold.is_zero() {
            return Err(MonitorError::ZeroDuration("idle threshold"));
        }
        if interval.is_zero() {
            return Err(MonitorError::ZeroDuration("poll interval"));
        }
        Ok(Self {
            threshold,
            interval,
            query_timeout: QUERY_TIMEOUT,
        })
    }

    /// Override the per-query time limit.
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until suspend is requested or `cancel` fires.
    pub async fn run(
        &self,
        idle: &mut dyn IdleSource,
        suspend: &mut dyn SuspendAction,
        status: &mut dyn StatusSink,
        cancel: &CancellationToken,
    ) -> Outcome {
        info!(
            "Idle monitor started: backend={}, suspend={}, threshold={:?}, interval={:?}",
            idle.name(),
            suspend.name(),
            self.threshold,
            self.interval
        );

        let mut poll: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("Cancelled before poll {}", poll + 1);
                return Outcome::CancelledByUser;
            }

            poll += 1;
            let measured = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Cancelled during idle query");
                    return Outcome::CancelledByUser;
                }
                result = query(idle, self.query_timeout) => result,
            };

            let report = PollReport {
                poll,
                idle: measured,
                threshold: self.threshold,
            };
            status.report(&report);

            let current = report.effective_idle();
            debug!("Poll {}: idle {}", poll, format_idle(current));

            if decide(current, self.threshold) == SuspendDecision::Suspend {
                info!(
                    "Idle for {} (threshold {}), suspending",
                    format_idle(current),
                    format_idle(self.threshold)
                );
                return match suspend.suspend().await {
                    Ok(()) => Outcome::Suspended,
                    Err(e) => {
                        error!("{}", e);
                        Outcome::FailedFatal(e.to_string())
                    }
                };
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Cancelled while waiting for next poll");
                    return Outcome::CancelledByUser;
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

/// Ask `idle` for the idle time, giving up after `timeout`.
///
/// A timeout is reported as [`IdleError::QueryFailed`].
pub async fn bounded_query(
    idle: &mut dyn IdleSource,
    timeout: Duration,
) -> Result<Duration, IdleError> {
    match tokio::time::timeout(timeout, idle.idle_time()).await {
        Ok(result) => result,
        Err(_) => Err(IdleError::QueryFailed(format!(
            "no answer within {timeout:?}"
        ))),
    }
}

/// One monitor poll. `None` means the measurement is unusable.
async fn query(idle: &mut dyn IdleSource, timeout: Duration) -> Option<Duration> {
    match bounded_query(idle, timeout).await {
        Ok(duration) => Some(duration),
        Err(e) => {
            warn!("{}; assuming user is active", e);
            None
        }
    }
}
