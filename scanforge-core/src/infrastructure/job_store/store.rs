use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{JobId, JobProgress, JobStatus, ScanAlert, ScanJob, ScanResults, ScanStats};

/// Job persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Store operation failed: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for JobStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Partial job record. Fields left as `None` are not touched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ScanResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<ScanAlert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_stats: Option<ScanStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn progress(progress: JobProgress) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn container_id(container_id: impl Into<String>) -> Self {
        Self {
            container_id: Some(container_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the present fields to an in-memory record and stamp `updated_at`.
    pub fn apply_to(&self, job: &mut ScanJob, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = &self.progress {
            job.progress = progress.clone();
        }
        if let Some(results) = self.results {
            job.results = Some(results);
        }
        if let Some(alerts) = &self.alerts {
            job.alerts = alerts.clone();
        }
        if let Some(stats) = self.scan_stats {
            job.scan_stats = Some(stats);
        }
        if let Some(message) = &self.error_message {
            job.error_message = Some(message.clone());
        }
        if let Some(container_id) = &self.container_id {
            job.container_id = Some(container_id.clone());
        }
        if let Some(started_at) = self.started_at {
            job.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            job.completed_at = Some(completed_at);
        }
        job.updated_at = now;
    }

    /// Field name / JSON value pairs for field-level backends, including `updated_at`.
    pub fn to_fields(&self, now: DateTime<Utc>) -> Result<Vec<(String, String)>, JobStoreError> {
        let mut fields = json_fields(self)?;
        fields.push(("updated_at".to_string(), serde_json::to_string(&now)?));
        Ok(fields)
    }
}

/// Serialize a struct into one `(field, json)` pair per top-level field.
pub(crate) fn json_fields<T: Serialize>(value: &T) -> Result<Vec<(String, String)>, JobStoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| Ok((key, serde_json::to_string(&value)?)))
            .collect(),
        other => Err(JobStoreError::Serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Job storage interface.
///
/// Writes are unconditional merges keyed by job id; there is no concurrency
/// token and no transaction spanning several jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a freshly built record.
    async fn create(&self, job: &ScanJob) -> Result<(), JobStoreError>;

    /// Point-in-time snapshot of a job, `None` when unknown.
    async fn get(&self, job_id: JobId) -> Result<Option<ScanJob>, JobStoreError>;

    /// Merge the present fields of `patch` into the record and stamp `updated_at`.
    async fn merge(&self, job_id: JobId, patch: JobPatch) -> Result<(), JobStoreError>;
}
