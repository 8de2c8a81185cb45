#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;

use scanforge_core::JobWorkflow;
use scanforge_core::domain::{JobConfig, JobId, JobSource, NewJob, ScanJob, ScanLevel};
use scanforge_core::infrastructure::{InMemoryJobStore, JobPatch, JobStore, JobStoreError};

pub fn mcp_job(level: ScanLevel) -> NewJob {
    NewJob::new(
        JobSource::Mcp,
        JobConfig::new("https://target.example", level),
        "scanforge/zap-worker:test",
    )
}

pub fn linked_job() -> NewJob {
    NewJob::new(
        JobSource::AppScanner,
        JobConfig::new("https://app.example", ScanLevel::Light),
        "scanforge/zap-worker:test",
    )
    .with_scan_record("tenant-1", "scan-1")
}

pub fn make_workflow() -> (Arc<InMemoryJobStore>, JobWorkflow) {
    let store = Arc::new(InMemoryJobStore::new());
    let workflow = JobWorkflow::new(store.clone() as Arc<dyn JobStore>);
    (store, workflow)
}

/// Store whose every operation fails, for error propagation tests.
pub struct UnavailableStore;

#[async_trait]
impl JobStore for UnavailableStore {
    async fn create(&self, _job: &ScanJob) -> Result<(), JobStoreError> {
        Err(JobStoreError::Backend("connection refused".into()))
    }

    async fn get(&self, _job_id: JobId) -> Result<Option<ScanJob>, JobStoreError> {
        Err(JobStoreError::Backend("connection refused".into()))
    }

    async fn merge(&self, _job_id: JobId, _patch: JobPatch) -> Result<(), JobStoreError> {
        Err(JobStoreError::Backend("connection refused".into()))
    }
}
