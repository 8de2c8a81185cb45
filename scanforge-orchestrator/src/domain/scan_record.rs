//! External scan record vocabulary and the translation from job records
//!
//! The externally owned record uses its own status names and camelCase
//! field names. Everything here is pure so the mapping can be tested
//! without any store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scanforge_core::domain::{JobStatus, ScanAlert, ScanJob, ScanPhase, ScanResults};

/// Status values understood by the external record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalStatus {
    Pending,
    Crawling,
    Scanning,
    Completed,
    Failed,
}

impl ExternalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Coarse status table.
pub fn status_to_external(status: JobStatus) -> ExternalStatus {
    match status {
        JobStatus::Queued | JobStatus::Dispatched => ExternalStatus::Pending,
        JobStatus::Running => ExternalStatus::Scanning,
        JobStatus::Completed => ExternalStatus::Completed,
        JobStatus::Failed | JobStatus::Cancelled => ExternalStatus::Failed,
    }
}

/// Phase table, `None` for phases it does not know.
pub fn phase_to_external(phase: &ScanPhase) -> Option<ExternalStatus> {
    match phase {
        ScanPhase::Queued | ScanPhase::Starting => Some(ExternalStatus::Pending),
        ScanPhase::Crawling => Some(ExternalStatus::Crawling),
        ScanPhase::Scanning => Some(ExternalStatus::Scanning),
        ScanPhase::Completed => Some(ExternalStatus::Completed),
        ScanPhase::Failed => Some(ExternalStatus::Failed),
        ScanPhase::Other(_) => None,
    }
}

/// Phase takes precedence over the coarse status, except that a terminal
/// status always wins.
pub fn external_status(status: JobStatus, phase: &ScanPhase) -> ExternalStatus {
    if status.is_terminal() {
        return status_to_external(status);
    }
    phase_to_external(phase).unwrap_or_else(|| status_to_external(status))
}

/// A finding in the external naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalAlert {
    pub alert: String,
    pub risk: String,
    pub confidence: String,
    pub url: String,
    pub description: String,
    pub solution: String,
    pub reference: String,
    pub cweid: String,
    pub wascid: String,
}

impl From<&ScanAlert> for ExternalAlert {
    fn from(a: &ScanAlert) -> Self {
        Self {
            alert: a.name.clone(),
            risk: a.severity.clone(),
            confidence: a.confidence.clone(),
            url: a.url.clone(),
            description: a.description.clone(),
            solution: a.solution.clone(),
            reference: a.reference.clone(),
            cweid: a.cweid.clone(),
            wascid: a.wascid.clone(),
        }
    }
}

/// Partial update applied to the external record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecordPatch {
    pub status: ExternalStatus,
    pub spider_progress: u8,
    pub active_scan_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ScanResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<ExternalAlert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Where an external record lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecordLocation {
    pub project: String,
    pub database: String,
    pub tenant_id: String,
    pub record_id: String,
}

/// Project a job onto the external record.
///
/// Results, findings and the completion stamp are only sent for completed
/// jobs. The error message is sent whenever the job carries one.
pub fn build_record_patch(job: &ScanJob, now: DateTime<Utc>) -> ScanRecordPatch {
    let completed = job.status == JobStatus::Completed;

    ScanRecordPatch {
        status: external_status(job.status, &job.progress.phase),
        spider_progress: job.progress.spider_progress.value(),
        active_scan_progress: job.progress.active_scan_progress.value(),
        results: if completed { job.results } else { None },
        alerts: (completed && !job.alerts.is_empty())
            .then(|| job.alerts.iter().map(ExternalAlert::from).collect()),
        error_message: job.error_message.clone(),
        updated_at: now,
        completed_at: (completed && job.results.is_some()).then_some(now),
    }
}
