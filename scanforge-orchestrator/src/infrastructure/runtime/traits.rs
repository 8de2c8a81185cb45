//! Container runtime traits and error types

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ContainerHandle, ContainerState, RunSpec, StopOutcome};

/// Errors raised by a container runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Runtime binary or daemon unreachable
    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    /// Requested worker image does not exist
    #[error("Worker image not found: {0}")]
    ImageNotFound(String),

    /// Runtime ran but reported failure
    #[error("Runtime command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Runtime output could not be interpreted
    #[error("Unexpected runtime output: {0}")]
    InvalidOutput(String),
}

/// Process/runtime collaborator used by the dispatcher.
///
/// Dyn-compatible so the dispatcher can hold `Arc<dyn ContainerRuntime>`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime name for logging
    fn name(&self) -> &'static str;

    /// Start a detached worker.
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError>;

    /// Count running containers carrying `label` (`key=value`).
    async fn count_running(&self, label: &str) -> Result<usize, RuntimeError>;

    /// Request graceful termination, killing after `grace`.
    async fn stop(
        &self,
        handle: &ContainerHandle,
        grace: Duration,
    ) -> Result<StopOutcome, RuntimeError>;

    /// Current state, `None` when the runtime does not know the handle.
    async fn inspect(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Option<ContainerState>, RuntimeError>;
}
