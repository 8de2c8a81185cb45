//! Admission-controlled worker launcher
//!
//! Admission is a count of running workers carrying the role label followed
//! by a launch. The two steps are not atomic: concurrent launches, notably
//! from several orchestrator processes, can overshoot the ceiling. With
//! [`AdmissionMode::VerifyAfterLaunch`] the dispatcher recounts after the
//! launch and stops its own worker when the ceiling was exceeded, which
//! trades occasional spurious rejections for a tighter bound.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use scanforge_core::config::{AdmissionMode, DispatcherConfig};
use scanforge_core::domain::JobId;

use crate::domain::{
    ContainerHandle, ContainerState, ResourceLimits, RunSpec, StopOutcome, WorkerInfo,
};
use crate::infrastructure::runtime::{ContainerRuntime, RuntimeError};

/// Launch failures
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Ceiling reached, nothing was started
    #[error(
        "Concurrent scan limit reached ({active}/{limit}). Please wait for a running scan to complete."
    )]
    AtCapacity { active: usize, limit: usize },

    #[error("Failed to launch worker: {0}")]
    Launch(#[from] RuntimeError),
}

pub struct Dispatcher {
    runtime: Arc<dyn ContainerRuntime>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: DispatcherConfig) -> Self {
        Self { runtime, config }
    }

    pub fn default_limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory: self.config.memory_limit.clone(),
            cpus: self.config.cpu_count,
        }
    }

    /// `{namespace}.role=worker`, the label admission counts on.
    pub fn role_label(&self) -> String {
        format!("{}.role=worker", self.config.label_namespace)
    }

    pub fn container_name(&self, job_id: JobId) -> String {
        format!("{}-{}", self.config.container_name_prefix, job_id.short())
    }

    fn labels(&self, job_id: JobId) -> BTreeMap<String, String> {
        let ns = &self.config.label_namespace;
        BTreeMap::from([
            (format!("{}.job_id", ns), job_id.to_string()),
            (format!("{}.role", ns), "worker".to_string()),
        ])
    }

    async fn active_workers(&self) -> Result<usize, RuntimeError> {
        self.runtime.count_running(&self.role_label()).await
    }

    /// Start an auto-removing worker for `job_id`, or reject with
    /// [`DispatchError::AtCapacity`] without starting anything.
    pub async fn launch(
        &self,
        job_id: JobId,
        image: &str,
        env: BTreeMap<String, String>,
        limits: ResourceLimits,
    ) -> Result<WorkerInfo, DispatchError> {
        let limit = self.config.max_concurrent_scans;

        let active = self.active_workers().await?;
        if active >= limit {
            warn!(job_id = %job_id, active, limit, "Worker launch rejected at capacity");
            return Err(DispatchError::AtCapacity { active, limit });
        }

        let name = self.container_name(job_id);
        let spec = RunSpec {
            image: image.to_string(),
            name: name.clone(),
            env,
            labels: self.labels(job_id),
            limits,
            network: self.config.network.clone(),
            auto_remove: true,
        };

        let handle = self.runtime.run(&spec).await.map_err(|e| {
            error!(job_id = %job_id, error = %e, "Failed to launch worker");
            DispatchError::Launch(e)
        })?;

        if self.config.admission_mode == AdmissionMode::VerifyAfterLaunch {
            self.verify_admission(job_id, &handle, limit).await?;
        }

        info!(
            job_id = %job_id,
            container = %handle.short(),
            name = %name,
            image,
            runtime = self.runtime.name(),
            "Launched worker"
        );

        Ok(WorkerInfo {
            handle,
            name,
            image: image.to_string(),
        })
    }

    async fn verify_admission(
        &self,
        job_id: JobId,
        handle: &ContainerHandle,
        limit: usize,
    ) -> Result<(), DispatchError> {
        let active = match self.active_workers().await {
            Ok(active) => active,
            Err(e) => {
                // Keep the launched worker when the recount itself fails.
                warn!(job_id = %job_id, error = %e, "Admission recount failed");
                return Ok(());
            }
        };

        if active > limit {
            warn!(
                job_id = %job_id,
                active,
                limit,
                "Ceiling exceeded by a concurrent launch, stopping new worker"
            );
            self.stop(handle).await;
            return Err(DispatchError::AtCapacity {
                active: active - 1,
                limit,
            });
        }
        Ok(())
    }

    /// Graceful stop. `false` when the worker is already gone or the runtime
    /// refused; never an error.
    pub async fn stop(&self, handle: &ContainerHandle) -> bool {
        match self.runtime.stop(handle, self.config.stop_grace()).await {
            Ok(StopOutcome::Stopped) => {
                info!(container = %handle.short(), "Stopped worker");
                true
            }
            Ok(StopOutcome::NotFound) => {
                warn!(
                    container = %handle.short(),
                    "Worker not found (may have already exited)"
                );
                false
            }
            Err(e) => {
                error!(container = %handle.short(), error = %e, "Failed to stop worker");
                false
            }
        }
    }

    /// Point-in-time worker state, `None` when the runtime does not know it.
    pub async fn status(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Option<ContainerState>, RuntimeError> {
        self.runtime.inspect(handle).await
    }
}
