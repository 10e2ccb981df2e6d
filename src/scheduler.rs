//! Single-flight job runner and the repeating schedule that drives it

use crate::config::Schedule;
use crate::error::{Error, Result};
use crate::fleet::{FleetProcessor, JobRunResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Snapshot of the runner for status reporting
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub is_running: bool,
    pub runs_completed: u64,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub last_succeeded: usize,
    pub last_failed: usize,
    pub last_error: Option<String>,
    pub last_results: Vec<JobRunResult>,
}

/// Clears the run flag when the run ends, however it ends
pub(crate) struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Runs the fleet over the configured tokens, at most one run at a time
pub struct JobRunner {
    fleet: FleetProcessor,
    tokens: Vec<String>,
    running: Arc<AtomicBool>,
    status: Mutex<RunStatus>,
}

impl JobRunner {
    pub fn new(fleet: FleetProcessor, tokens: Vec<String>) -> Self {
        Self {
            fleet,
            tokens,
            running: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(RunStatus::default()),
        }
    }

    pub fn fleet(&self) -> &FleetProcessor {
        &self.fleet
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> RunStatus {
        let mut status = self.lock_status().clone();
        status.is_running = self.is_running();
        status
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn begin(&self) -> Result<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::RunRejected)?;
        Ok(RunGuard {
            flag: self.running.clone(),
        })
    }

    /// Run now and wait for it, unless a run is already active
    pub async fn try_run(&self) -> Result<Vec<JobRunResult>> {
        let _guard = self.begin()?;
        self.execute().await
    }

    /// Start a run in the background, unless a run is already active
    pub fn trigger(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let guard = self.begin()?;
        let runner = self.clone();

        Ok(tokio::spawn(async move {
            let _guard = guard;
            // Outcome is already recorded in the status
            let _ = runner.execute().await;
        }))
    }

    async fn execute(&self) -> Result<Vec<JobRunResult>> {
        self.lock_status().last_started = Some(Utc::now());
        tracing::info!("Burn job started ({} tokens)", self.tokens.len());

        let outcome = self.fleet.run_all(&self.tokens).await;

        let mut status = self.lock_status();
        status.last_finished = Some(Utc::now());
        status.runs_completed += 1;
        match &outcome {
            Ok(results) => {
                status.last_succeeded = results.iter().filter(|r| r.success).count();
                status.last_failed = results.len() - status.last_succeeded;
                status.last_error = None;
                status.last_results = results.clone();
                tracing::info!(
                    "Burn job finished: {} succeeded, {} failed",
                    status.last_succeeded,
                    status.last_failed
                );
            }
            Err(e) => {
                status.last_succeeded = 0;
                status.last_failed = 0;
                status.last_error = Some(e.to_string());
                status.last_results.clear();
                tracing::error!("Burn job failed: {}", e);
            }
        }
        drop(status);

        outcome
    }
}

/// Time from `now` until the next `hour_utc:00:00`, strictly in the future
pub fn until_next_daily(now: DateTime<Utc>, hour_utc: u32) -> Duration {
    let today = now
        .date_naive()
        .and_hms_opt(hour_utc.min(23), 0, 0)
        .unwrap_or_default()
        .and_utc();
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Drives a [`JobRunner`] on its configured schedule
pub struct Scheduler {
    runner: Arc<JobRunner>,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(runner: Arc<JobRunner>, schedule: Schedule) -> Self {
        Self { runner, schedule }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Loop forever; a run's outcome never changes the schedule
    pub async fn run(self) {
        match self.schedule {
            Schedule::Interval {
                minutes,
                run_on_start,
            } => {
                let period = Duration::from_secs(minutes.max(1) * 60);
                let start = if run_on_start {
                    Instant::now()
                } else {
                    Instant::now() + period
                };
                tracing::info!("Burn job scheduled every {} minutes", minutes);

                let mut ticks = tokio::time::interval_at(start, period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticks.tick().await;
                    self.tick().await;
                }
            }
            Schedule::Daily {
                hour_utc,
                run_on_start,
            } => {
                tracing::info!("Burn job scheduled daily at {:02}:00 UTC", hour_utc);
                if run_on_start {
                    self.tick().await;
                }
                loop {
                    let wait = until_next_daily(Utc::now(), hour_utc);
                    tracing::debug!("Next burn job in {}s", wait.as_secs());
                    tokio::time::sleep(wait).await;
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        match self.runner.try_run().await {
            Ok(_) => {}
            Err(Error::RunRejected) => {
                tracing::warn!("Skipping scheduled run, previous run still active")
            }
            // Already logged by the runner; the next tick retries
            Err(_) => {}
        }
    }
}
