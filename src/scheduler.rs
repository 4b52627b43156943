use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{PacingMode, SchedulerSettings};
use crate::models::{CheckerConfig, DealResult};
use crate::plugins::traits::CheckerBox;
use crate::utils::error::Result;
use crate::utils::time::minutes;

/// A qualifying check result on its way to the alert router.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub checker_id: usize,
    pub label: String,
    pub result: DealResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub checker_id: usize,
    pub label: String,
    pub site: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub deals_found: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Active,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub failing_jobs: usize,
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub deals_found: u64,
    pub uptime_seconds: u64,
}

/// Base interval with symmetric jitter, both in minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitteredInterval {
    pub base_m: f64,
    pub jitter_m: f64,
}

impl JitteredInterval {
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self {
            base_m: config.check_interval_m,
            jitter_m: config.check_interval_jitter_m,
        }
    }

    /// Draws `base + U(-jitter, +jitter)` minutes. May be negative when jitter > base.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.jitter_m > 0.0 {
            self.base_m + rng.gen_range(-self.jitter_m..=self.jitter_m)
        } else {
            self.base_m
        }
    }
}

/// Decides how long a scheduled unit sleeps after each check.
pub struct TickPacer {
    interval: JitteredInterval,
    mode: PacingMode,
    current_m: f64,
    rng: StdRng,
}

impl TickPacer {
    pub fn new(interval: JitteredInterval, mode: PacingMode) -> Self {
        Self::with_rng(interval, mode, StdRng::from_entropy())
    }

    pub fn with_rng(interval: JitteredInterval, mode: PacingMode, mut rng: StdRng) -> Self {
        let current_m = interval.draw(&mut rng);
        Self {
            interval,
            mode,
            current_m,
            rng,
        }
    }

    /// Interval (minutes) the next check is measured against.
    pub fn current_interval_m(&self) -> f64 {
        self.current_m
    }

    /// Sleep before the next check, given how long the last one took.
    ///
    /// Returns `None` when the check overran its interval: the next check starts at once
    /// and the interval is not redrawn. Otherwise a fresh interval is drawn first.
    pub fn after_check(&mut self, elapsed: Duration) -> Option<Duration> {
        let remaining_s = self.current_m * 60.0 - elapsed.as_secs_f64();
        if remaining_s <= 0.0 {
            return None;
        }

        self.current_m = self.interval.draw(&mut self.rng);
        Some(match self.mode {
            PacingMode::FullInterval => minutes(self.current_m.abs()),
            PacingMode::Remaining => minutes(self.current_m).saturating_sub(elapsed),
        })
    }
}

/// Sleep multiplier after `consecutive_failures` failed checks: 1, 2, 4, ... capped at
/// `max`.
pub fn backoff_multiplier(consecutive_failures: u32, max: u32) -> u32 {
    if consecutive_failures == 0 {
        return 1;
    }
    2u32.saturating_pow(consecutive_failures - 1).clamp(1, max.max(1))
}

/// Runs one independent periodic task per checker.
pub struct CheckScheduler {
    settings: SchedulerSettings,
    jobs: Arc<RwLock<HashMap<String, JobInfo>>>, // label -> JobInfo
    handles: Vec<(String, JoinHandle<()>)>,
    start_time: DateTime<Utc>,
}

impl CheckScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            settings,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            handles: Vec::new(),
            start_time: Utc::now(),
        }
    }

    /// Spawns the periodic task for `checker`. Deal results are forwarded on `reports`,
    /// which never blocks the check loop on a slow consumer.
    pub async fn schedule(
        &mut self,
        checker_id: usize,
        checker: CheckerBox,
        reports: mpsc::UnboundedSender<CheckReport>,
    ) -> Result<()> {
        let label = checker.label().to_string();
        let interval = JitteredInterval::from_config(checker.config());
        let pacer = TickPacer::new(interval, self.settings.pacing);

        let job_info = JobInfo {
            checker_id,
            label: label.clone(),
            site: checker.site().to_string(),
            status: JobStatus::Active,
            created_at: Utc::now(),
            last_run: None,
            next_run: None,
            run_count: 0,
            success_count: 0,
            error_count: 0,
            deals_found: 0,
            consecutive_failures: 0,
            last_error: None,
        };
        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(label.clone(), job_info);
        }

        let jobs = Arc::clone(&self.jobs);
        let backoff_max = self.settings.failure_backoff_max;
        let handle = tokio::spawn(async move {
            Self::run_checker(checker_id, checker, pacer, backoff_max, jobs, reports).await;
        });
        self.handles.push((label.clone(), handle));

        tracing::info!(
            "Scheduled {} every {}m (±{}m)",
            label,
            interval.base_m,
            interval.jitter_m
        );
        Ok(())
    }

    async fn run_checker(
        checker_id: usize,
        mut checker: CheckerBox,
        mut pacer: TickPacer,
        backoff_max: u32,
        jobs: Arc<RwLock<HashMap<String, JobInfo>>>,
        reports: mpsc::UnboundedSender<CheckReport>,
    ) {
        let label = checker.label().to_string();

        loop {
            tracing::debug!("Checking product {}", label);
            let started = Instant::now();
            let outcome = checker.check_product().await;
            let elapsed = started.elapsed();

            let failures = Self::record_run(&jobs, &label, &outcome).await;
            match outcome {
                Ok(result) => {
                    tracing::info!(
                        "Checked {}: {} at ${} (deal: {})",
                        label,
                        result.name,
                        result.price,
                        result.deal
                    );
                    if result.deal {
                        let report = CheckReport {
                            checker_id,
                            label: label.clone(),
                            result,
                        };
                        if reports.send(report).is_err() {
                            tracing::info!("Alert router gone; stopping checks for {}", label);
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Check failed for {} ({} in a row): {}", label, failures, e);
                }
            }

            if let Some(sleep) = pacer.after_check(elapsed) {
                let sleep = sleep.saturating_mul(backoff_multiplier(failures, backoff_max));
                Self::record_next_run(&jobs, &label, sleep).await;
                tracing::debug!("{} sleeping {}s", label, sleep.as_secs());
                tokio::time::sleep(sleep).await;
            } else {
                tracing::warn!(
                    "Check for {} took {}s, longer than its {:.1}m interval; running again now",
                    label,
                    elapsed.as_secs(),
                    pacer.current_interval_m()
                );
            }
        }
    }

    /// Updates job bookkeeping and returns the consecutive failure count.
    async fn record_run(
        jobs: &Arc<RwLock<HashMap<String, JobInfo>>>,
        label: &str,
        outcome: &Result<DealResult>,
    ) -> u32 {
        let mut jobs = jobs.write().await;
        let Some(job_info) = jobs.get_mut(label) else {
            return 0;
        };

        job_info.last_run = Some(Utc::now());
        job_info.run_count += 1;
        match outcome {
            Ok(result) => {
                job_info.success_count += 1;
                job_info.consecutive_failures = 0;
                job_info.last_error = None;
                job_info.status = JobStatus::Active;
                if result.deal {
                    job_info.deals_found += 1;
                }
            }
            Err(e) => {
                job_info.error_count += 1;
                job_info.consecutive_failures += 1;
                job_info.last_error = Some(e.to_string());
                job_info.status = JobStatus::Error;
            }
        }
        job_info.consecutive_failures
    }

    async fn record_next_run(jobs: &Arc<RwLock<HashMap<String, JobInfo>>>, label: &str, sleep: Duration) {
        let mut jobs = jobs.write().await;
        if let Some(job_info) = jobs.get_mut(label) {
            job_info.next_run = chrono::Duration::from_std(sleep)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d));
        }
    }

    /// Aborts every scheduled unit immediately; in-flight checks are not awaited.
    pub async fn shutdown(&mut self) {
        for (label, handle) in &self.handles {
            handle.abort();
            tracing::debug!("Cancelled scheduled checks for {}", label);
        }

        for (label, handle) in self.handles.drain(..) {
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::warn!("Scheduled task for {} ended abnormally: {}", label, e),
            }
        }

        tracing::info!("Check scheduler shut down");
    }

    pub fn scheduled_count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_running(&self, label: &str) -> bool {
        self.handles
            .iter()
            .any(|(l, handle)| l == label && !handle.is_finished())
    }

    pub async fn get_job_info(&self, label: &str) -> Option<JobInfo> {
        let jobs = self.jobs.read().await;
        jobs.get(label).cloned()
    }

    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.read().await;
        let mut list: Vec<JobInfo> = jobs.values().cloned().collect();
        list.sort_by_key(|j| j.checker_id);
        list
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let jobs = self.jobs.read().await;
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            total_jobs: jobs.len(),
            active_jobs: jobs.values().filter(|j| j.status == JobStatus::Active).count(),
            failing_jobs: jobs.values().filter(|j| j.status == JobStatus::Error).count(),
            completed_runs: jobs.values().map(|j| j.success_count).sum(),
            failed_runs: jobs.values().map(|j| j.error_count).sum(),
            deals_found: jobs.values().map(|j| j.deals_found).sum(),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }
}
