//! Phased scan driver
//!
//! ```text
//! STARTING ──▶ CRAWLING ──▶ SCANNING (passive | active) ──▶ COMPLETED
//!     │            │                 │
//!     └────────────┴─────────────────┴──────────────────────▶ FAILED
//! ```
//!
//! Phases run strictly in sequence. Any error escaping a phase reaches
//! [`ScanDriver::run`], which records FAILED with the error message. There is
//! no retry and no partial result salvage.

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use scanforge_core::config::{EngineConfig, WorkerConfig};
use scanforge_core::domain::{
    JobId, JobProgress, JobStatus, Percent, ScanLevel, ScanPhase, ScanResults, ScanStats,
};
use scanforge_core::{JobWorkflow, StatusExtra, WorkflowError};

use crate::domain::{EngineError, ScanEngine, ScanPolicy, passive_progress, summarize};

const CONTEXT_NAME: &str = "ScanContext";

/// Fatal worker errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Scan engine not ready after {attempts} attempts")]
    EngineUnavailable { attempts: u32 },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// What to scan, as handed to the worker process
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub job_id: JobId,
    pub target_url: String,
    pub level: ScanLevel,
    /// Context include pattern, `{target_url}.*` when absent
    pub scope: Option<String>,
    /// Named engine policy for the active scan
    pub policy: Option<String>,
}

impl ScanTarget {
    pub fn new(job_id: JobId, target_url: impl Into<String>, level: ScanLevel) -> Self {
        Self {
            job_id,
            target_url: target_url.into(),
            level,
            scope: None,
            policy: None,
        }
    }

    fn context_regex(&self) -> String {
        self.scope
            .clone()
            .unwrap_or_else(|| format!("{}.*", self.target_url))
    }
}

pub struct ScanDriver {
    engine: Arc<dyn ScanEngine>,
    workflow: JobWorkflow,
    config: WorkerConfig,
    max_alerts: usize,
}

impl ScanDriver {
    pub fn new(
        engine: Arc<dyn ScanEngine>,
        workflow: JobWorkflow,
        config: WorkerConfig,
        engine_config: &EngineConfig,
    ) -> Self {
        Self {
            engine,
            workflow,
            config,
            max_alerts: engine_config.max_alerts,
        }
    }

    /// Run every phase and finalise the job, or record FAILED and return
    /// the error.
    pub async fn run(&self, target: &ScanTarget) -> Result<ScanResults, ScanError> {
        info!(
            job_id = %target.job_id,
            target = %target.target_url,
            level = %target.level,
            "Scan worker starting"
        );

        match self.execute(target).await {
            Ok(results) => Ok(results),
            Err(e) => {
                error!(job_id = %target.job_id, error = %e, "Scan failed");
                self.record_failure(target.job_id, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, target: &ScanTarget) -> Result<ScanResults, ScanError> {
        let job_id = target.job_id;
        let started = Instant::now();
        let policy = ScanPolicy::for_level(target.level);

        // ── Starting ────────────────────────────────────────────────────
        self.workflow
            .mark_running(
                job_id,
                JobProgress::new(
                    ScanPhase::Starting,
                    Percent::ZERO,
                    Percent::ZERO,
                    "Initialising scanner...",
                ),
            )
            .await?;

        self.wait_for_engine(job_id).await?;
        self.apply_policy(job_id, &policy).await;
        self.configure_context(target).await;

        // ── Crawling ────────────────────────────────────────────────────
        self.crawl(target, &policy).await?;

        // ── Scanning ────────────────────────────────────────────────────
        if target.level.runs_active_scan() {
            info!(job_id = %job_id, level = %target.level, "Running active vulnerability scan");
            self.active_scan(target).await?;
        } else {
            info!(job_id = %job_id, "Light scan: passive analysis only");
            self.passive_scan(job_id).await;
        }

        // ── Results ─────────────────────────────────────────────────────
        let alerts = self
            .engine
            .list_findings(&target.target_url, self.max_alerts)
            .await?;
        let results = summarize(&alerts);
        let stats = self.collect_stats(started).await;

        self.workflow
            .complete(job_id, results, alerts, Some(stats))
            .await?;

        info!(
            job_id = %job_id,
            score = results.score,
            duration_seconds = stats.duration_seconds,
            "Scan completed"
        );
        Ok(results)
    }

    async fn wait_for_engine(&self, job_id: JobId) -> Result<(), ScanError> {
        let attempts = self.config.readiness_attempts;
        for attempt in 1..=attempts {
            match self.engine.version().await {
                Ok(version) => {
                    info!(job_id = %job_id, version = %version, "Scan engine ready");
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, attempts, error = %e, "Scan engine not ready");
                    if attempt < attempts {
                        sleep(self.config.readiness_interval()).await;
                    }
                }
            }
        }
        Err(ScanError::EngineUnavailable { attempts })
    }

    async fn apply_policy(&self, job_id: JobId, policy: &ScanPolicy) {
        match self.engine.apply_policy(policy).await {
            Ok(()) => info!(
                job_id = %job_id,
                threads = policy.threads_per_host,
                max_minutes = policy.max_duration_minutes,
                "Scan policy applied"
            ),
            Err(e) => warn!(job_id = %job_id, error = %e, "Could not apply scan policy, using engine defaults"),
        }
    }

    async fn configure_context(&self, target: &ScanTarget) {
        let regex = target.context_regex();
        if let Err(e) = self.engine.create_context(CONTEXT_NAME, &regex).await {
            warn!(job_id = %target.job_id, error = %e, "Could not configure context, proceeding without it");
        }
    }

    async fn crawl(&self, target: &ScanTarget, policy: &ScanPolicy) -> Result<(), ScanError> {
        let job_id = target.job_id;
        self.report_progress(
            job_id,
            JobProgress::new(
                ScanPhase::Crawling,
                Percent::ZERO,
                Percent::ZERO,
                "Discovering pages...",
            ),
        )
        .await;

        let crawl_id = self
            .engine
            .start_crawl(&target.target_url, policy.max_children)
            .await?;
        info!(job_id = %job_id, crawl_id = %crawl_id, "Crawl started");

        let mut progress = Percent::ZERO;
        while !progress.is_complete() {
            sleep(self.config.crawl_poll_interval()).await;
            progress = self.engine.crawl_status(&crawl_id).await?;
            self.report_progress(
                job_id,
                JobProgress::new(
                    ScanPhase::Crawling,
                    progress,
                    Percent::ZERO,
                    format!("Discovering pages... {}", progress),
                ),
            )
            .await;
        }

        info!(job_id = %job_id, "Crawl completed");
        Ok(())
    }

    /// Wait for the passive queue to drain. Engine errors end the wait as if
    /// the queue were empty.
    async fn passive_scan(&self, job_id: JobId) {
        self.report_progress(
            job_id,
            JobProgress::new(
                ScanPhase::Scanning,
                Percent::COMPLETE,
                Percent::ZERO,
                "Passive analysis...",
            ),
        )
        .await;

        let mut last = Percent::ZERO;
        loop {
            sleep(self.config.passive_poll_interval()).await;
            let remaining = match self.engine.passive_queue_depth().await {
                Ok(remaining) => remaining,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Could not check passive scan, assuming complete");
                    break;
                }
            };
            if remaining == 0 {
                break;
            }

            let progress = passive_progress(remaining);
            if progress != last {
                debug!(job_id = %job_id, remaining, "Passive analysis in progress");
                self.report_progress(
                    job_id,
                    JobProgress::new(
                        ScanPhase::Scanning,
                        Percent::COMPLETE,
                        progress,
                        format!("Passive analysis... {} records remaining", remaining),
                    ),
                )
                .await;
                last = progress;
            }
        }

        self.report_progress(
            job_id,
            JobProgress::new(
                ScanPhase::Scanning,
                Percent::COMPLETE,
                Percent::COMPLETE,
                "Passive analysis complete",
            ),
        )
        .await;
    }

    async fn active_scan(&self, target: &ScanTarget) -> Result<(), ScanError> {
        let job_id = target.job_id;
        self.report_progress(
            job_id,
            JobProgress::new(
                ScanPhase::Scanning,
                Percent::COMPLETE,
                Percent::ZERO,
                "Active vulnerability scanning...",
            ),
        )
        .await;

        let scan_id = self
            .engine
            .start_active_scan(&target.target_url, target.policy.as_deref())
            .await?;
        info!(job_id = %job_id, scan_id = %scan_id, "Active scan started");

        let mut progress = Percent::ZERO;
        while !progress.is_complete() {
            sleep(self.config.active_poll_interval()).await;
            progress = self.engine.active_status(&scan_id).await?;
            self.report_progress(
                job_id,
                JobProgress::new(
                    ScanPhase::Scanning,
                    Percent::COMPLETE,
                    progress,
                    format!("Active scanning... {}", progress),
                ),
            )
            .await;
        }

        info!(job_id = %job_id, "Active scan completed");
        Ok(())
    }

    /// Operational stats; engine failures leave the counters at zero.
    async fn collect_stats(&self, started: Instant) -> ScanStats {
        ScanStats {
            urls_crawled: self.engine.url_count().await.unwrap_or(0),
            requests_sent: self.engine.message_count().await.unwrap_or(0),
            duration_seconds: started.elapsed().as_secs(),
        }
    }

    /// Best-effort progress write.
    async fn report_progress(&self, job_id: JobId, progress: JobProgress) {
        if let Err(e) = self.workflow.update_progress(job_id, progress).await {
            warn!(job_id = %job_id, error = %e, "Failed to write progress");
        }
    }

    async fn record_failure(&self, job_id: JobId, cause: &ScanError) {
        let message = cause.to_string();
        let extra =
            StatusExtra::error(message.clone()).with_progress(JobProgress::failed(&message));

        if let Err(e) = self
            .workflow
            .update_status(job_id, JobStatus::Failed, extra)
            .await
        {
            error!(job_id = %job_id, error = %e, "Failed to write error status");
        }
    }
}
