//! Docker/Podman CLI runtime
//!
//! Drives the runtime through its command line with `tokio::process`.
//! Worker environment values are passed through the child process
//! environment (`--env KEY`) so they never show up in the process list.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{ContainerHandle, ContainerState, RunSpec, StopOutcome};

use super::traits::{ContainerRuntime, RuntimeError};

const NOT_FOUND_MARKERS: &[&str] = &["No such container", "No such object", "no such container"];
const IMAGE_MISSING_MARKERS: &[&str] = &[
    "Unable to find image",
    "pull access denied",
    "manifest unknown",
    "image not known",
];

/// CLI-backed container runtime (`docker` or `podman`)
#[derive(Debug, Clone)]
pub struct DockerCliRuntime {
    binary: String,
}

impl DockerCliRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for `run`, without the environment values.
    pub fn run_args(spec: &RunSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        if spec.auto_remove {
            args.push("--rm".to_string());
        }
        args.extend([
            "--name".to_string(),
            spec.name.clone(),
            "--memory".to_string(),
            spec.limits.memory.clone(),
            "--cpus".to_string(),
            spec.limits.cpus.to_string(),
            "--network".to_string(),
            spec.network.clone(),
        ]);
        for (key, value) in &spec.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", key, value));
        }
        for key in spec.env.keys() {
            args.push("--env".to_string());
            args.push(key.clone());
        }
        args.push(spec.image.clone());
        args
    }

    async fn exec(&self, command: &mut Command, label: &str) -> Result<Output, RuntimeError> {
        debug!(runtime = %self.binary, command = label, "Invoking container runtime");
        command.kill_on_drop(true).output().await.map_err(|e| {
            RuntimeError::Unavailable(format!("failed to execute {}: {}", self.binary, e))
        })
    }

    fn failure(command: &str, output: &Output) -> RuntimeError {
        RuntimeError::CommandFailed {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

fn stderr_has(output: &Output, markers: &[&str]) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr);
    markers.iter().any(|m| stderr.contains(m))
}

#[async_trait]
impl ContainerRuntime for DockerCliRuntime {
    fn name(&self) -> &'static str {
        "docker-cli"
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::run_args(spec)).envs(&spec.env);

        let output = self.exec(&mut cmd, "run").await?;
        if !output.status.success() {
            if stderr_has(&output, IMAGE_MISSING_MARKERS) {
                return Err(RuntimeError::ImageNotFound(spec.image.clone()));
            }
            return Err(Self::failure("run", &output));
        }

        let id = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .ok_or_else(|| RuntimeError::InvalidOutput("run printed no container id".into()))?;

        Ok(ContainerHandle::new(id))
    }

    async fn count_running(&self, label: &str) -> Result<usize, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["ps", "--quiet", "--filter"])
            .arg(format!("label={}", label))
            .args(["--filter", "status=running"]);

        let output = self.exec(&mut cmd, "ps").await?;
        if !output.status.success() {
            return Err(Self::failure("ps", &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count())
    }

    async fn stop(
        &self,
        handle: &ContainerHandle,
        grace: Duration,
    ) -> Result<StopOutcome, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["stop", "--time"])
            .arg(grace.as_secs().to_string())
            .arg(handle.as_str());

        let output = self.exec(&mut cmd, "stop").await?;
        if output.status.success() {
            return Ok(StopOutcome::Stopped);
        }
        if stderr_has(&output, NOT_FOUND_MARKERS) {
            return Ok(StopOutcome::NotFound);
        }
        Err(Self::failure("stop", &output))
    }

    async fn inspect(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Option<ContainerState>, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["inspect", "--format", "{{.State.Status}}"])
            .arg(handle.as_str());

        let output = self.exec(&mut cmd, "inspect").await?;
        if !output.status.success() {
            if stderr_has(&output, NOT_FOUND_MARKERS) {
                return Ok(None);
            }
            return Err(Self::failure("inspect", &output));
        }

        Ok(Some(ContainerState::parse(&String::from_utf8_lossy(
            &output.stdout,
        ))))
    }
}
