//! Scan use cases
//!
//! The operations a request surface calls: start a scan, read its status,
//! cancel it, or start and wait for the report in one call.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use scanforge_core::config::{DispatcherConfig, StoreConfig};
use scanforge_core::domain::{
    JobConfig, JobId, JobSource, JobStatus, NewJob, ScanJob, ScanLevel,
};
use scanforge_core::{JobWorkflow, StatusExtra, WorkflowError};

use super::bridge::Bridge;
use super::dispatcher::Dispatcher;
use super::polling::PollingOrchestrator;
use super::responses::{CancelOutcome, ScanFailure, ScanReport, ScanStatusView, StartedScan};
use crate::domain::ContainerHandle;

/// Errors from the status and cancel use cases
#[derive(Debug, thiserror::Error)]
pub enum UseCaseError {
    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// A scan request as received from a caller
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub target_url: String,
    /// Unvalidated level name
    pub scan_level: String,
    pub scope: Option<String>,
    pub policy: Option<String>,
    pub source: JobSource,
    pub api_key_id: Option<String>,
    pub tenant_id: Option<String>,
    pub scan_record_id: Option<String>,
    pub source_project: Option<String>,
    pub source_database: Option<String>,
}

impl ScanRequest {
    pub fn new(target_url: impl Into<String>, scan_level: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            scan_level: scan_level.into(),
            scope: None,
            policy: None,
            source: JobSource::Mcp,
            api_key_id: None,
            tenant_id: None,
            scan_record_id: None,
            source_project: None,
            source_database: None,
        }
    }

    fn into_new_job(self, level: ScanLevel, image: &str) -> NewJob {
        let config = JobConfig {
            target_url: self.target_url,
            scan_level: level,
            scope: self.scope,
            policy: self.policy,
        };
        let mut new_job = NewJob::new(self.source, config, image)
            .with_record_location(self.source_project, self.source_database);
        new_job.api_key_id = self.api_key_id;
        new_job.tenant_id = self.tenant_id;
        new_job.scan_record_id = self.scan_record_id;
        new_job
    }
}

async fn sync_latest(workflow: &JobWorkflow, bridge: Option<&Bridge>, job_id: JobId) {
    let Some(bridge) = bridge else {
        return;
    };
    match workflow.get_job(job_id).await {
        Ok(Some(job)) => {
            bridge.sync(&job).await;
        }
        Ok(None) => {}
        Err(e) => warn!(job_id = %job_id, error = %e, "Could not reload job for sync"),
    }
}

/// Use case for creating a job and dispatching its worker
pub struct StartScanUseCase {
    workflow: JobWorkflow,
    dispatcher: Arc<Dispatcher>,
    bridge: Option<Arc<Bridge>>,
    dispatcher_config: DispatcherConfig,
    store_config: StoreConfig,
}

impl StartScanUseCase {
    pub fn new(
        workflow: JobWorkflow,
        dispatcher: Arc<Dispatcher>,
        bridge: Option<Arc<Bridge>>,
        dispatcher_config: DispatcherConfig,
        store_config: StoreConfig,
    ) -> Self {
        Self {
            workflow,
            dispatcher,
            bridge,
            dispatcher_config,
            store_config,
        }
    }

    /// Environment handed to the worker: the job coordinates plus the store
    /// settings the worker's own configuration loader picks up.
    pub fn worker_env(&self, job: &ScanJob) -> BTreeMap<String, String> {
        let mut env = self.dispatcher_config.worker_env.clone();
        env.insert("JOB_ID".into(), job.job_id.to_string());
        env.insert("TARGET_URL".into(), job.config.target_url.clone());
        env.insert("SCAN_LEVEL".into(), job.config.scan_level.to_string());
        if let Some(scope) = &job.config.scope {
            env.insert("SCAN_SCOPE".into(), scope.clone());
        }
        if let Some(policy) = &job.config.policy {
            env.insert("SCAN_POLICY".into(), policy.clone());
        }
        env.insert("SCANFORGE__STORE__URL".into(), self.store_config.url.clone());
        env.insert(
            "SCANFORGE__STORE__KEY_PREFIX".into(),
            self.store_config.key_prefix.clone(),
        );
        env
    }

    pub async fn execute(&self, request: ScanRequest) -> Result<StartedScan, ScanFailure> {
        let level = request
            .scan_level
            .parse::<ScanLevel>()
            .map_err(|e| ScanFailure::rejected(e.to_string()))?;

        let image = self.dispatcher_config.worker_image.clone();
        let job = self
            .workflow
            .create_job(request.into_new_job(level, &image))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create scan job");
                ScanFailure::rejected("Failed to create scan job")
            })?;
        let job_id = job.job_id;

        let worker = match self
            .dispatcher
            .launch(
                job_id,
                &image,
                self.worker_env(&job),
                self.dispatcher.default_limits(),
            )
            .await
        {
            Ok(worker) => worker,
            Err(e) => {
                let message = e.to_string();
                if let Err(fail_err) = self.workflow.fail(job_id, &message).await {
                    error!(job_id = %job_id, error = %fail_err, "Failed to record dispatch failure");
                }
                sync_latest(&self.workflow, self.bridge.as_deref(), job_id).await;
                return Err(ScanFailure::for_job(
                    job_id,
                    Some(JobStatus::Failed),
                    message,
                ));
            }
        };

        let status = match self
            .workflow
            .mark_dispatched(job_id, worker.handle.as_str())
            .await
        {
            Ok(status) => status,
            Err(e) => {
                // The worker is running and reports on its own.
                warn!(job_id = %job_id, error = %e, "Failed to record dispatched worker");
                JobStatus::Dispatched
            }
        };

        info!(job_id = %job_id, container = %worker.handle.short(), "Worker dispatched");

        Ok(StartedScan {
            job_id,
            status,
            container_id: worker.handle.0,
            message: "Scan queued successfully".to_string(),
        })
    }
}

/// Use case for reading a job's status
pub struct ScanStatusUseCase {
    workflow: JobWorkflow,
    bridge: Option<Arc<Bridge>>,
}

impl ScanStatusUseCase {
    pub fn new(workflow: JobWorkflow, bridge: Option<Arc<Bridge>>) -> Self {
        Self { workflow, bridge }
    }

    pub async fn execute(&self, job_id: JobId) -> Result<ScanStatusView, UseCaseError> {
        let job = self
            .workflow
            .get_job(job_id)
            .await?
            .ok_or(UseCaseError::NotFound(job_id))?;

        if let Some(bridge) = &self.bridge {
            bridge.sync(&job).await;
        }

        Ok(ScanStatusView::from(&job))
    }
}

/// Use case for cancelling a job and stopping its worker
pub struct CancelScanUseCase {
    workflow: JobWorkflow,
    dispatcher: Arc<Dispatcher>,
    bridge: Option<Arc<Bridge>>,
}

impl CancelScanUseCase {
    pub fn new(
        workflow: JobWorkflow,
        dispatcher: Arc<Dispatcher>,
        bridge: Option<Arc<Bridge>>,
    ) -> Self {
        Self {
            workflow,
            dispatcher,
            bridge,
        }
    }

    fn already(job_id: JobId, status: JobStatus) -> CancelOutcome {
        CancelOutcome {
            job_id,
            status,
            message: format!("Job already {}", status),
        }
    }

    pub async fn execute(&self, job_id: JobId) -> Result<CancelOutcome, UseCaseError> {
        let job = self
            .workflow
            .get_job(job_id)
            .await?
            .ok_or(UseCaseError::NotFound(job_id))?;

        if job.is_terminal() {
            return Ok(Self::already(job_id, job.status));
        }

        if let Some(container_id) = &job.container_id {
            self.dispatcher
                .stop(&ContainerHandle::new(container_id.clone()))
                .await;
        }

        match self
            .workflow
            .update_status(job_id, JobStatus::Cancelled, StatusExtra::default())
            .await
        {
            Ok(()) => {}
            Err(WorkflowError::InvalidTransition(e)) => {
                // Worker finalised between the read and the cancel.
                sync_latest(&self.workflow, self.bridge.as_deref(), job_id).await;
                return Ok(Self::already(job_id, e.from));
            }
            Err(e) => return Err(e.into()),
        }

        sync_latest(&self.workflow, self.bridge.as_deref(), job_id).await;

        info!(job_id = %job_id, "Scan cancelled");
        Ok(CancelOutcome {
            job_id,
            status: JobStatus::Cancelled,
            message: "Scan cancelled successfully".to_string(),
        })
    }
}

/// Use case for dispatching a scan and waiting for its report
pub struct ScanWebApplicationUseCase {
    start: StartScanUseCase,
    polling: PollingOrchestrator,
}

impl ScanWebApplicationUseCase {
    pub fn new(start: StartScanUseCase, polling: PollingOrchestrator) -> Self {
        Self { start, polling }
    }

    pub async fn execute(&self, request: ScanRequest) -> Result<ScanReport, ScanFailure> {
        let started = self.start.execute(request).await?;
        self.polling.wait_for_completion(started.job_id).await
    }
}
