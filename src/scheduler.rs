//! Interval trigger for the collector.
//!
//! The scheduler is a background tokio task owned by `main`: [`start`]
//! spawns it and [`SchedulerHandle::stop`] ends it. The first run happens one
//! full period after start, and ticks missed while a run was in progress
//! are dropped rather than replayed.

use crate::collector::{Collector, RunOutcome, Trigger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Period between scheduled collection runs.
pub const COLLECTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop and wait for it. A run already in
    /// progress finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

pub fn start(collector: Arc<Collector>, period: Duration) -> SchedulerHandle {
    let (shutdown, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match collector.try_run(Trigger::Scheduled).await {
                        Ok(RunOutcome::Completed(report)) => info!(
                            collected = report.collected,
                            rows_appended = report.rows_appended,
                            skipped = ?report.skipped_keywords,
                            "Scheduled trend collection finished"
                        ),
                        Ok(RunOutcome::Busy) => {}
                        Err(e) => error!(error = %e, "Scheduled trend collection failed"),
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopped");
    });

    SchedulerHandle { shutdown, task }
}
