//! Job Workflow, the lifecycle controller for scan job records.
//!
//! Every status write goes through [`JobWorkflow`], which reads the current
//! record, validates the transition against [`JobStatus`], applies the
//! status-specific side effects and merges the result into the store.
//!
//! ```text
//! Caller           Dispatcher         Worker             JobWorkflow
//!   │                  │                 │                    │
//!   ├─ create_job() ───┼─────────────────┼───────────────────►│ QUEUED
//!   │                  ├─ mark_dispatched() ─────────────────►│ DISPATCHED
//!   │                  │                 ├─ mark_running() ──►│ RUNNING
//!   │                  │                 ├─ update_progress()►│
//!   │                  │                 ├─ complete() ──────►│ COMPLETED
//!   ├─ get_job() ──────┼─────────────────┼───────────────────►│
//! ```
//!
//! The read-validate-write sequence is not atomic. Two writers racing on
//! the same job (a cancel and a worker's completion) can both pass
//! validation, in which case the later merge wins.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{
    JobId, JobProgress, JobStatus, JobTransitionError, NewJob, ScanAlert, ScanJob, ScanResults,
    ScanStats,
};
use crate::infrastructure::job_store::{JobPatch, JobStore, JobStoreError};

/// Errors from the workflow layer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(#[from] JobTransitionError),

    #[error("A failed status requires an error message")]
    MissingErrorMessage,

    #[error("Persistence error: {0}")]
    Store(#[from] JobStoreError),
}

/// Optional data written alongside a status change.
#[derive(Debug, Clone, Default)]
pub struct StatusExtra {
    pub container_id: Option<String>,
    pub error_message: Option<String>,
    pub progress: Option<JobProgress>,
}

impl StatusExtra {
    pub fn container(container_id: impl Into<String>) -> Self {
        Self {
            container_id: Some(container_id.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: JobProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Centralised job lifecycle controller.
#[derive(Clone)]
pub struct JobWorkflow {
    job_store: Arc<dyn JobStore>,
}

impl JobWorkflow {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self { job_store }
    }

    /// Create a QUEUED job with a fresh id.
    pub async fn create_job(&self, new_job: NewJob) -> Result<ScanJob, WorkflowError> {
        let job = ScanJob::new(new_job);
        self.job_store.create(&job).await?;

        info!(
            job_id = %job.job_id,
            target = %job.config.target_url,
            level = %job.config.scan_level,
            "Job created"
        );
        Ok(job)
    }

    /// Retrieve a job snapshot by ID (delegates to store).
    pub async fn get_job(&self, job_id: JobId) -> Result<Option<ScanJob>, WorkflowError> {
        Ok(self.job_store.get(job_id).await?)
    }

    /// Unconditional merge of arbitrary fields.
    pub async fn update(&self, job_id: JobId, patch: JobPatch) -> Result<(), WorkflowError> {
        self.job_store.merge(job_id, patch).await?;
        Ok(())
    }

    // ── Transition helpers ───────────────────────────────────────────

    /// Change status with its side effects: RUNNING stamps `started_at`,
    /// any terminal status stamps `completed_at`, FAILED needs a message.
    pub async fn update_status(
        &self,
        job_id: JobId,
        status: JobStatus,
        extra: StatusExtra,
    ) -> Result<(), WorkflowError> {
        if status == JobStatus::Failed
            && extra.error_message.as_deref().is_none_or(str::is_empty)
        {
            return Err(WorkflowError::MissingErrorMessage);
        }

        self.ensure_transition(job_id, status).await?;

        let now = Utc::now();
        let patch = JobPatch {
            status: Some(status),
            progress: extra.progress,
            error_message: extra.error_message,
            container_id: extra.container_id,
            started_at: (status == JobStatus::Running).then_some(now),
            completed_at: status.is_terminal().then_some(now),
            ..JobPatch::default()
        };
        self.job_store.merge(job_id, patch).await?;

        info!(job_id = %job_id, status = %status, "Job status updated");
        Ok(())
    }

    /// Replace the progress subrecord wholesale.
    pub async fn update_progress(
        &self,
        job_id: JobId,
        progress: JobProgress,
    ) -> Result<(), WorkflowError> {
        debug!(
            job_id = %job_id,
            phase = %progress.phase,
            spider = progress.spider_progress.value(),
            active = progress.active_scan_progress.value(),
            "Job progress"
        );
        self.job_store
            .merge(job_id, JobPatch::progress(progress))
            .await?;
        Ok(())
    }

    /// Single combined write of COMPLETED, results, findings, stats and 100/100 progress.
    pub async fn complete(
        &self,
        job_id: JobId,
        results: ScanResults,
        alerts: Vec<ScanAlert>,
        stats: Option<ScanStats>,
    ) -> Result<(), WorkflowError> {
        self.ensure_transition(job_id, JobStatus::Completed).await?;

        let patch = JobPatch {
            status: Some(JobStatus::Completed),
            progress: Some(JobProgress::finished()),
            results: Some(results),
            alerts: Some(alerts),
            scan_stats: stats,
            completed_at: Some(Utc::now()),
            ..JobPatch::default()
        };
        self.job_store.merge(job_id, patch).await?;

        info!(
            job_id = %job_id,
            high = results.high,
            medium = results.medium,
            low = results.low,
            score = results.score,
            "Job transitioned to Completed"
        );
        Ok(())
    }

    /// Transition a job to [`JobStatus::Failed`] with an error message.
    pub async fn fail(&self, job_id: JobId, error: &str) -> Result<(), WorkflowError> {
        self.update_status(job_id, JobStatus::Failed, StatusExtra::error(error))
            .await?;
        warn!(job_id = %job_id, error, "Job transitioned to Failed");
        Ok(())
    }

    /// Transition a job to [`JobStatus::Running`] with its initial progress.
    pub async fn mark_running(
        &self,
        job_id: JobId,
        progress: JobProgress,
    ) -> Result<(), WorkflowError> {
        self.update_status(
            job_id,
            JobStatus::Running,
            StatusExtra::default().with_progress(progress),
        )
        .await
    }

    /// Record the worker handle, advancing to DISPATCHED only if the job is
    /// still QUEUED. A worker that already reported RUNNING keeps its status.
    pub async fn mark_dispatched(
        &self,
        job_id: JobId,
        container_id: &str,
    ) -> Result<JobStatus, WorkflowError> {
        let current = self.require(job_id).await?;

        if current.status == JobStatus::Queued {
            self.update_status(
                job_id,
                JobStatus::Dispatched,
                StatusExtra::container(container_id),
            )
            .await?;
            return Ok(JobStatus::Dispatched);
        }

        self.job_store
            .merge(job_id, JobPatch::container_id(container_id))
            .await?;
        debug!(
            job_id = %job_id,
            status = %current.status,
            "Worker handle recorded without status change"
        );
        Ok(current.status)
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn require(&self, job_id: JobId) -> Result<ScanJob, WorkflowError> {
        self.job_store
            .get(job_id)
            .await?
            .ok_or(WorkflowError::NotFound(job_id))
    }

    async fn ensure_transition(
        &self,
        job_id: JobId,
        target: JobStatus,
    ) -> Result<(), WorkflowError> {
        let current = self.require(job_id).await?;
        if !current.status.can_transition_to(&target) {
            return Err(JobTransitionError {
                from: current.status,
                to: target,
            }
            .into());
        }
        Ok(())
    }
}
