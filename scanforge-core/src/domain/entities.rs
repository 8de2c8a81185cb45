//! Scan job entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{JobId, JobSource, JobStatus, Percent, ScanLevel, ScanPhase};

/// Default tool name recorded on jobs.
pub const DEFAULT_TOOL: &str = "scan_web_application";

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

/// Immutable scan parameters captured at job creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub target_url: String,
    #[serde(default)]
    pub scan_level: ScanLevel,
    /// Regex restricting the crawl, defaults to everything below the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Engine-side scan policy name for the active scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

impl JobConfig {
    pub fn new(target_url: impl Into<String>, scan_level: ScanLevel) -> Self {
        Self {
            target_url: target_url.into(),
            scan_level,
            scope: None,
            policy: None,
        }
    }
}

/// Real-time progress, replaced wholesale on every update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobProgress {
    pub phase: ScanPhase,
    pub spider_progress: Percent,
    pub active_scan_progress: Percent,
    pub message: String,
}

impl JobProgress {
    pub fn new(
        phase: ScanPhase,
        spider_progress: impl Into<Percent>,
        active_scan_progress: impl Into<Percent>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            spider_progress: spider_progress.into(),
            active_scan_progress: active_scan_progress.into(),
            message: message.into(),
        }
    }

    /// Progress written together with a completed status.
    pub fn finished() -> Self {
        Self::new(ScanPhase::Completed, 100, 100, "Scan complete")
    }

    /// Progress written by the worker's failure handler.
    pub fn failed(reason: &str) -> Self {
        Self::new(ScanPhase::Failed, 0, 0, format!("Failed: {}", reason))
    }
}

/// A single finding reported by the scan engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAlert {
    pub name: String,
    /// Engine risk label: High, Medium, Low or Informational
    pub severity: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub cweid: String,
    #[serde(default)]
    pub wascid: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub reference: String,
}

/// Severity counts and score of a completed scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanResults {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub informational: u32,
    /// 100 is clean, 0 is critical
    pub score: u8,
}

impl Default for ScanResults {
    fn default() -> Self {
        Self {
            high: 0,
            medium: 0,
            low: 0,
            informational: 0,
            score: 100,
        }
    }
}

/// Operational counters collected at the end of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanStats {
    pub urls_crawled: u64,
    pub requests_sent: u64,
    pub duration_seconds: u64,
}

/// Parameters for creating a new job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source: JobSource,
    pub config: JobConfig,
    pub container_image: String,
    pub tool: String,
    pub api_key_id: Option<String>,
    pub tenant_id: Option<String>,
    pub scan_record_id: Option<String>,
    pub source_project: Option<String>,
    pub source_database: Option<String>,
}

impl NewJob {
    pub fn new(source: JobSource, config: JobConfig, container_image: impl Into<String>) -> Self {
        Self {
            source,
            config,
            container_image: container_image.into(),
            tool: default_tool(),
            api_key_id: None,
            tenant_id: None,
            scan_record_id: None,
            source_project: None,
            source_database: None,
        }
    }

    pub fn with_api_key_id(mut self, api_key_id: impl Into<String>) -> Self {
        self.api_key_id = Some(api_key_id.into());
        self
    }

    /// Link the job to an external scan record owned by `tenant_id`.
    pub fn with_scan_record(
        mut self,
        tenant_id: impl Into<String>,
        scan_record_id: impl Into<String>,
    ) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self.scan_record_id = Some(scan_record_id.into());
        self
    }

    /// Override where the external scan record lives.
    pub fn with_record_location(
        mut self,
        project: Option<String>,
        database: Option<String>,
    ) -> Self {
        self.source_project = project;
        self.source_database = database;
        self
    }
}

/// Full scan job record, one per scan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub job_id: JobId,
    pub source: JobSource,
    #[serde(default = "default_tool")]
    pub tool: String,
    pub status: JobStatus,

    // Provenance and external record correlation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_database: Option<String>,

    pub config: JobConfig,
    #[serde(default)]
    pub progress: JobProgress,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ScanResults>,
    #[serde(default)]
    pub alerts: Vec<ScanAlert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_stats: Option<ScanStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default)]
    pub container_image: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    /// Build a fresh QUEUED record with a new id.
    pub fn new(new_job: NewJob) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            source: new_job.source,
            tool: new_job.tool,
            status: JobStatus::Queued,
            api_key_id: new_job.api_key_id,
            tenant_id: new_job.tenant_id,
            scan_record_id: new_job.scan_record_id,
            source_project: new_job.source_project,
            source_database: new_job.source_database,
            config: new_job.config,
            progress: JobProgress::default(),
            results: None,
            alerts: Vec::new(),
            scan_stats: None,
            error_message: None,
            container_id: None,
            container_image: new_job.container_image,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Both correlation fields needed to reach the external scan record.
    pub fn scan_record_link(&self) -> Option<(&str, &str)> {
        match (self.tenant_id.as_deref(), self.scan_record_id.as_deref()) {
            (Some(tenant), Some(record)) if !tenant.is_empty() && !record.is_empty() => {
                Some((tenant, record))
            }
            _ => None,
        }
    }
}
