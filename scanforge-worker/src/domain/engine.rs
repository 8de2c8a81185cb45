//! Scan engine abstraction
//!
//! The worker drives a single local scan engine through this trait. The
//! engine runs crawls and scans asynchronously; every `start_*` call returns
//! an id whose progress is then polled.

use async_trait::async_trait;

use scanforge_core::domain::{Percent, ScanAlert};

use super::policy::ScanPolicy;

/// Scan engine call failures
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Connection refused, reset or timed out
    #[error("Scan engine unreachable: {0}")]
    Network(String),

    #[error("Scan engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but did not have the expected shape
    #[error("Unexpected scan engine response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Liveness probe; returns the engine version.
    async fn version(&self) -> Result<String, EngineError>;

    /// Apply per-host threads and the active scan duration ceiling.
    async fn apply_policy(&self, policy: &ScanPolicy) -> Result<(), EngineError>;

    /// Create a named context including URLs matching `include_regex`.
    async fn create_context(&self, name: &str, include_regex: &str) -> Result<(), EngineError>;

    async fn start_crawl(&self, url: &str, max_children: u32) -> Result<String, EngineError>;

    async fn crawl_status(&self, crawl_id: &str) -> Result<Percent, EngineError>;

    /// Records still waiting for passive analysis.
    async fn passive_queue_depth(&self) -> Result<u64, EngineError>;

    async fn start_active_scan(
        &self,
        url: &str,
        policy_name: Option<&str>,
    ) -> Result<String, EngineError>;

    async fn active_status(&self, scan_id: &str) -> Result<Percent, EngineError>;

    /// Findings under `base_url`, at most `limit`.
    async fn list_findings(&self, base_url: &str, limit: usize)
    -> Result<Vec<ScanAlert>, EngineError>;

    /// Total HTTP messages exchanged with the target.
    async fn message_count(&self) -> Result<u64, EngineError>;

    /// Distinct URLs discovered.
    async fn url_count(&self) -> Result<u64, EngineError>;
}
