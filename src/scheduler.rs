//! Reminder scheduler
//!
//! Runs a [`ReminderJob`] on a fixed interval in a background tokio task. The
//! first run happens one full interval after `start()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::utils::{GreenTwinError, Result};

/// Periodic job run by the scheduler
pub trait ReminderJob: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run once; returns the number of reminders that came due
    fn run(&self) -> Result<usize>;
}

/// Checks for due care reminders
///
/// Reminder rules are not modelled yet, so every run finds nothing due.
#[derive(Debug, Default)]
pub struct DueReminderCheck {
    runs: AtomicU64,
}

impl DueReminderCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed checks
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ReminderJob for DueReminderCheck {
    fn name(&self) -> &str {
        "due-reminder-check"
    }

    fn run(&self) -> Result<usize> {
        info!("[{}] Checking for due reminders...", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// Background runner for a single reminder job
pub struct ReminderScheduler {
    interval: Duration,
    job: Arc<dyn ReminderJob>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(interval: Duration, job: Arc<dyn ReminderJob>) -> Self {
        Self {
            interval,
            job,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the background loop; must be called inside a tokio runtime
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(GreenTwinError::Scheduler(
                "scheduler is already running".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(GreenTwinError::Scheduler(
                "interval must be positive".to_string(),
            ));
        }

        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();
        let job = Arc::clone(&self.job);
        let period = self.interval;
        let first_tick = Instant::now() + period;

        self.handle = Some(tokio::spawn(async move {
            run_loop(job, first_tick, period, cancel).await;
        }));

        info!(
            "Scheduler started: '{}' every {:?}",
            self.job.name(),
            self.interval
        );
        Ok(())
    }

    /// Cancel the loop and wait for it to finish; no-op when stopped
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.cancel.cancel();
        if let Err(e) = handle.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
        info!("Scheduler stopped");
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    job: Arc<dyn ReminderJob>,
    first_tick: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                match job.run() {
                    Ok(due) => info!("Job '{}' finished, {} reminders due", job.name(), due),
                    Err(e) => error!("Job '{}' failed: {}", job.name(), e),
                }
            }
        }
    }
}
