//! Best-effort synchronisation of job state into linked external scan records
//!
//! Callers invoke [`Bridge::sync`] opportunistically on every read. Failures
//! are logged and reported as [`SyncOutcome::Failed`]; they never surface as
//! errors, so a status read cannot fail because of the bridge.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scanforge_core::config::BridgeConfig;
use scanforge_core::domain::ScanJob;

use crate::domain::{ScanRecordLocation, build_record_patch};
use crate::infrastructure::scan_records::{ScanRecordStore, SyncError};

/// What a sync attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Job is not linked to an external record, or the bridge is disabled
    Skipped,
    Synced,
    Failed,
}

pub struct Bridge {
    store: Arc<dyn ScanRecordStore>,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(store: Arc<dyn ScanRecordStore>, config: BridgeConfig) -> Self {
        Self { store, config }
    }

    /// Coordinates of the linked record, with configured defaults for
    /// jobs that did not capture their own project or database.
    pub fn location(&self, job: &ScanJob) -> Option<ScanRecordLocation> {
        let (tenant_id, record_id) = job.scan_record_link()?;
        Some(ScanRecordLocation {
            project: job
                .source_project
                .clone()
                .unwrap_or_else(|| self.config.default_project.clone()),
            database: job
                .source_database
                .clone()
                .unwrap_or_else(|| self.config.default_database.clone()),
            tenant_id: tenant_id.to_string(),
            record_id: record_id.to_string(),
        })
    }

    pub async fn sync(&self, job: &ScanJob) -> SyncOutcome {
        if !self.config.enabled {
            return SyncOutcome::Skipped;
        }
        let Some(location) = self.location(job) else {
            return SyncOutcome::Skipped;
        };

        let patch = build_record_patch(job, Utc::now());
        let timeout = self.config.write_timeout();

        let result = match tokio::time::timeout(timeout, self.store.update(&location, &patch)).await
        {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(timeout)),
        };

        match result {
            Ok(()) => {
                debug!(
                    job_id = %job.job_id,
                    record_id = %location.record_id,
                    status = patch.status.as_str(),
                    "Synced job to scan record"
                );
                SyncOutcome::Synced
            }
            Err(e) => {
                warn!(
                    job_id = %job.job_id,
                    record_id = %location.record_id,
                    error = %e,
                    "Failed to sync job to scan record"
                );
                SyncOutcome::Failed
            }
        }
    }

    /// Run a sync on a detached task.
    pub fn spawn_sync(self: &Arc<Self>, job: ScanJob) -> JoinHandle<SyncOutcome> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move { bridge.sync(&job).await })
    }
}
