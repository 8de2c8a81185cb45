//! Caller-side bounded wait for a dispatched job
//!
//! The job store has no change notification, so the caller sleeps, reads
//! and repeats until the job is terminal or the deadline passes. Each read
//! triggers a detached bridge sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use scanforge_core::config::PollingConfig;
use scanforge_core::domain::{JobId, JobStatus, ScanJob};
use scanforge_core::{JobWorkflow, WorkflowError};

use super::bridge::Bridge;
use super::responses::{ScanFailure, ScanReport};

pub struct PollingOrchestrator {
    workflow: JobWorkflow,
    bridge: Option<Arc<Bridge>>,
    config: PollingConfig,
}

impl PollingOrchestrator {
    pub fn new(workflow: JobWorkflow, bridge: Option<Arc<Bridge>>, config: PollingConfig) -> Self {
        Self {
            workflow,
            bridge,
            config,
        }
    }

    /// Wait until the job finishes, fails, disappears or the deadline passes.
    ///
    /// On deadline the job is forced to FAILED with a timeout message.
    pub async fn wait_for_completion(&self, job_id: JobId) -> Result<ScanReport, ScanFailure> {
        let interval = self.config.interval();
        let started = Instant::now();
        let deadline = started + self.config.max_duration();
        let mut next_progress_log = started + self.config.progress_log_interval();

        info!(job_id = %job_id, "Polling job for completion");

        while Instant::now() + interval <= deadline {
            tokio::time::sleep(interval).await;

            let job = match self.workflow.get_job(job_id).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    return Err(ScanFailure::for_job(job_id, None, "Job disappeared"));
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Failed to read job while polling");
                    continue;
                }
            };

            if let Some(bridge) = &self.bridge {
                bridge.spawn_sync(job.clone());
            }

            if let Some(outcome) = terminal_outcome(&job) {
                return outcome;
            }

            if Instant::now() >= next_progress_log {
                info!(
                    job_id = %job_id,
                    status = %job.status,
                    phase = %job.progress.phase,
                    spider = job.progress.spider_progress.value(),
                    active = job.progress.active_scan_progress.value(),
                    "Scan in progress"
                );
                next_progress_log += self.config.progress_log_interval();
            }
        }

        self.time_out(job_id).await
    }

    async fn time_out(&self, job_id: JobId) -> Result<ScanReport, ScanFailure> {
        let message = format!(
            "Scan timed out after {}",
            describe_duration(self.config.max_duration())
        );

        match self.workflow.fail(job_id, &message).await {
            Ok(()) => {}
            Err(WorkflowError::InvalidTransition(_)) => {
                // The job reached a terminal state between the last read and now.
                if let Ok(Some(job)) = self.workflow.get_job(job_id).await
                    && let Some(outcome) = terminal_outcome(&job)
                {
                    return outcome;
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to persist scan timeout");
            }
        }

        if let Some(bridge) = &self.bridge
            && let Ok(Some(job)) = self.workflow.get_job(job_id).await
        {
            bridge.spawn_sync(job);
        }

        warn!(job_id = %job_id, "{}", message);
        Err(ScanFailure::for_job(job_id, Some(JobStatus::Failed), message))
    }
}

/// Caller-visible result for a terminal job, `None` while it is still active.
pub fn terminal_outcome(job: &ScanJob) -> Option<Result<ScanReport, ScanFailure>> {
    match job.status {
        JobStatus::Completed => Some(Ok(ScanReport::from_job(job))),
        JobStatus::Failed | JobStatus::Cancelled => Some(Err(ScanFailure::for_job(
            job.job_id,
            Some(job.status),
            job.error_message
                .clone()
                .unwrap_or_else(|| format!("Scan {}", job.status)),
        ))),
        _ => None,
    }
}

/// Human form of a deadline, e.g. `1 hour`, `90 minutes`, `45 seconds`.
pub fn describe_duration(duration: Duration) -> String {
    fn plural(n: u64, unit: &str) -> String {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    }

    let secs = duration.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}
