use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ScanRecordLocation, ScanRecordPatch};

/// External record write failures. Always absorbed by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Scan record store error: {0}")]
    Backend(String),
    #[error("Scan record not found: {0}")]
    NotFound(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Scan record write timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Externally owned scan record collaborator
#[async_trait]
pub trait ScanRecordStore: Send + Sync {
    /// Merge `patch` into the record at `location`.
    async fn update(
        &self,
        location: &ScanRecordLocation,
        patch: &ScanRecordPatch,
    ) -> Result<(), SyncError>;
}
