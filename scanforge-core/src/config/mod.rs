//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Redis-compatible connection URL
    pub url: String,
    /// Key prefix, each job lives at `{key_prefix}:{job_id}`
    pub key_prefix: String,
    pub connect_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "scanforge:pentest-jobs".to_string(),
            connect_timeout_seconds: 5,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// How strictly the concurrency ceiling is enforced when launching workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Count running workers, then launch. Concurrent launches may overshoot.
    #[default]
    CheckThenLaunch,
    /// Additionally recount after launching and stop the new worker if the
    /// ceiling was exceeded.
    VerifyAfterLaunch,
}

/// Worker dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Container runtime CLI (`docker` or `podman`)
    pub runtime_binary: String,
    pub worker_image: String,
    pub max_concurrent_scans: usize,
    pub admission_mode: AdmissionMode,
    /// Memory ceiling in runtime syntax, e.g. `4g`
    pub memory_limit: String,
    pub cpu_count: u32,
    pub network: String,
    pub stop_grace_seconds: u64,
    pub container_name_prefix: String,
    /// Prefix of the discovery labels placed on each worker
    pub label_namespace: String,
    /// Extra environment handed to every worker
    pub worker_env: BTreeMap<String, String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            runtime_binary: "docker".to_string(),
            worker_image: "scanforge/zap-worker:latest".to_string(),
            max_concurrent_scans: 3,
            admission_mode: AdmissionMode::default(),
            memory_limit: "4g".to_string(),
            cpu_count: 2,
            network: "bridge".to_string(),
            stop_grace_seconds: 10,
            container_name_prefix: "zap-worker".to_string(),
            label_namespace: "scanforge".to_string(),
            worker_env: BTreeMap::new(),
        }
    }
}

impl DispatcherConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_seconds)
    }
}

/// Scan engine control API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Upper bound on findings fetched per scan
    pub max_alerts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_seconds: 30,
            max_alerts: 1000,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Worker scan driver timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub readiness_attempts: u32,
    pub readiness_interval_ms: u64,
    pub crawl_poll_interval_ms: u64,
    pub passive_poll_interval_ms: u64,
    pub active_poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            readiness_attempts: 30,
            readiness_interval_ms: 2000,
            crawl_poll_interval_ms: 3000,
            passive_poll_interval_ms: 2000,
            active_poll_interval_ms: 5000,
        }
    }
}

impl WorkerConfig {
    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    pub fn crawl_poll_interval(&self) -> Duration {
        Duration::from_millis(self.crawl_poll_interval_ms)
    }

    pub fn passive_poll_interval(&self) -> Duration {
        Duration::from_millis(self.passive_poll_interval_ms)
    }

    pub fn active_poll_interval(&self) -> Duration {
        Duration::from_millis(self.active_poll_interval_ms)
    }
}

/// External scan record synchronisation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    /// Connection URL of the external record store, defaults to the job store
    pub url: Option<String>,
    pub default_project: String,
    pub default_database: String,
    pub write_timeout_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            default_project: "scanforge".to_string(),
            default_database: "default".to_string(),
            write_timeout_seconds: 5,
        }
    }
}

impl BridgeConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }
}

/// Caller-side completion polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub max_duration_seconds: u64,
    pub progress_log_interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            max_duration_seconds: 3600,
            progress_log_interval_seconds: 30,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_seconds)
    }

    pub fn progress_log_interval(&self) -> Duration {
        Duration::from_secs(self.progress_log_interval_seconds)
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub dispatcher: DispatcherConfig,
    pub engine: EngineConfig,
    pub worker: WorkerConfig,
    pub bridge: BridgeConfig,
    pub polling: PollingConfig,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.logging.validate()?;
        self.store.validate()?;
        self.dispatcher.validate()?;
        self.engine.validate()?;
        self.worker.validate()?;
        self.bridge.validate()?;
        self.polling.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SCANFORGE").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
