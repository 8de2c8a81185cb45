//! Caller-facing result shapes

use serde::Serialize;

use scanforge_core::domain::{JobId, JobProgress, JobStatus, ScanJob, ScanResults};

/// Structured failure returned to callers. Carries no internal error detail
/// beyond the message stored on the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct ScanFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    pub error: String,
}

impl ScanFailure {
    /// Failure before any job existed.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            job_id: None,
            status: None,
            error: error.into(),
        }
    }

    pub fn for_job(job_id: JobId, status: Option<JobStatus>, error: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id),
            status,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub informational: u32,
    pub security_score: u8,
}

impl From<ScanResults> for ScanSummary {
    fn from(r: ScanResults) -> Self {
        Self {
            high: r.high,
            medium: r.medium,
            low: r.low,
            informational: r.informational,
            security_score: r.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vulnerability {
    pub name: String,
    pub severity: String,
    pub url: String,
    pub description: String,
    pub solution: String,
    pub cwe_id: String,
    pub wasc_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub urls_crawled: u64,
    pub requests_sent: u64,
    pub duration_seconds: u64,
}

/// Formatted results of a completed scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub target_url: String,
    pub scan_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerability_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ReportStats>,
}

impl ScanReport {
    pub fn from_job(job: &ScanJob) -> Self {
        let vulnerabilities: Vec<Vulnerability> = job
            .alerts
            .iter()
            .map(|a| Vulnerability {
                name: a.name.clone(),
                severity: a.severity.clone(),
                url: a.url.clone(),
                description: a.description.clone(),
                solution: a.solution.clone(),
                cwe_id: a.cweid.clone(),
                wasc_id: a.wascid.clone(),
            })
            .collect();

        Self {
            job_id: job.job_id,
            status: job.status,
            target_url: job.config.target_url.clone(),
            scan_level: job.config.scan_level.to_string(),
            summary: job.results.map(ScanSummary::from),
            vulnerability_count: (!vulnerabilities.is_empty()).then_some(vulnerabilities.len()),
            vulnerabilities,
            stats: job.scan_stats.map(|s| ReportStats {
                urls_crawled: s.urls_crawled,
                requests_sent: s.requests_sent,
                duration_seconds: s.duration_seconds,
            }),
        }
    }
}

/// Response of a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedScan {
    pub job_id: JobId,
    pub status: JobStatus,
    pub container_id: String,
    pub message: String,
}

/// Status view of a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: JobProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ScanResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&ScanJob> for ScanStatusView {
    fn from(job: &ScanJob) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            progress: job.progress.clone(),
            results: job.results,
            error_message: job.error_message.clone(),
        }
    }
}

/// Response of a cancel request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
}
