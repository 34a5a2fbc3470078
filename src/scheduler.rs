//! Periodic session runner.
//!
//! Runs a job once immediately and then on a fixed interval until cancelled.
//! Each run gets a fresh controller; nothing carries over between runs.

use crate::domain::models::SessionReport;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> anyhow::Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("Schedule interval must be greater than zero");
        }
        Ok(Self { interval })
    }

    /// Run `job` every interval until `cancel` fires. A job holding the same
    /// token is interrupted along with the schedule rather than awaited to
    /// completion. Returns the number of runs started.
    pub async fn run<F, Fut>(&self, cancel: &CancellationToken, mut job: F) -> u64
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<SessionReport>>,
    {
        info!("Scheduler started, running every {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut runs = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            runs += 1;
            info!("Run #{} starting", runs);
            match job().await {
                Ok(report) if report.is_complete_success() => {
                    info!("Run #{} succeeded: {}", runs, report)
                }
                Ok(report) => warn!("Run #{} finished: {}", runs, report),
                Err(e) => error!("Run #{} failed: {:#}", runs, e),
            }
        }

        info!("Scheduler stopped after {} runs", runs);
        runs
    }
}
