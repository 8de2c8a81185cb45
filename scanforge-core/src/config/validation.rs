//! Configuration validation module

use crate::config::{
    BridgeConfig, DispatcherConfig, EngineConfig, LoggingConfig, PollingConfig, StoreConfig,
    WorkerConfig,
};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Store configuration error: {message}")]
    Store { message: String },

    #[error("Dispatcher configuration error: {message}")]
    Dispatcher { message: String },

    #[error("Engine configuration error: {message}")]
    Engine { message: String },

    #[error("Worker configuration error: {message}")]
    Worker { message: String },

    #[error("Bridge configuration error: {message}")]
    Bridge { message: String },

    #[error("Polling configuration error: {message}")]
    Polling { message: String },
}

impl ValidationError {
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn dispatcher(message: impl Into<String>) -> Self {
        Self::Dispatcher {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
        }
    }

    pub fn polling(message: impl Into<String>) -> Self {
        Self::Polling {
            message: message.into(),
        }
    }
}

fn has_scheme(raw: &str, schemes: &[&str]) -> bool {
    url::Url::parse(raw).is_ok_and(|parsed| schemes.contains(&parsed.scheme()))
}

fn is_http_url(raw: &str) -> bool {
    has_scheme(raw, &["http", "https"])
}

fn is_redis_url(raw: &str) -> bool {
    has_scheme(raw, &["redis", "rediss", "unix"])
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.format.as_str(), "json" | "pretty") {
            return Err(ValidationError::logging(format!(
                "Log format must be json or pretty, got: {}",
                self.format
            )));
        }

        if self.level.trim().is_empty() {
            return Err(ValidationError::logging("Log level cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !is_redis_url(&self.url) {
            return Err(ValidationError::store(format!(
                "Store url must start with redis://, rediss:// or unix://, got: {}",
                self.url
            )));
        }

        if self.key_prefix.is_empty() {
            return Err(ValidationError::store("Key prefix cannot be empty"));
        }

        if self.connect_timeout_seconds == 0 {
            return Err(ValidationError::store(
                "Connect timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for DispatcherConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.runtime_binary.trim().is_empty() {
            return Err(ValidationError::dispatcher("Runtime binary cannot be empty"));
        }

        if self.worker_image.trim().is_empty() {
            return Err(ValidationError::dispatcher("Worker image cannot be empty"));
        }

        if self.max_concurrent_scans == 0 {
            return Err(ValidationError::dispatcher(
                "max_concurrent_scans must be greater than 0",
            ));
        }

        if self.cpu_count == 0 {
            return Err(ValidationError::dispatcher(
                "cpu_count must be greater than 0",
            ));
        }

        if self.container_name_prefix.is_empty() || self.label_namespace.is_empty() {
            return Err(ValidationError::dispatcher(
                "Container name prefix and label namespace cannot be empty",
            ));
        }

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !is_http_url(&self.base_url) {
            return Err(ValidationError::engine(format!(
                "Engine base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(ValidationError::engine(
                "Engine timeout must be greater than 0 seconds",
            ));
        }

        if self.max_alerts == 0 {
            return Err(ValidationError::engine("max_alerts must be greater than 0"));
        }

        Ok(())
    }
}

impl Validate for WorkerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.readiness_attempts == 0 {
            return Err(ValidationError::worker(
                "readiness_attempts must be greater than 0",
            ));
        }

        let intervals = [
            self.readiness_interval_ms,
            self.crawl_poll_interval_ms,
            self.passive_poll_interval_ms,
            self.active_poll_interval_ms,
        ];
        if intervals.contains(&0) {
            return Err(ValidationError::worker(
                "Poll intervals must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for BridgeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.url
            && !is_redis_url(url)
        {
            return Err(ValidationError::bridge(format!(
                "Bridge url must start with redis://, rediss:// or unix://, got: {}",
                url
            )));
        }

        if self.default_project.is_empty() || self.default_database.is_empty() {
            return Err(ValidationError::bridge(
                "Default project and database cannot be empty",
            ));
        }

        if self.write_timeout_seconds == 0 {
            return Err(ValidationError::bridge(
                "Write timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for PollingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_seconds == 0 {
            return Err(ValidationError::polling(
                "Poll interval must be greater than 0",
            ));
        }

        if self.max_duration_seconds < self.interval_seconds {
            return Err(ValidationError::polling(format!(
                "max_duration_seconds ({}) must be at least interval_seconds ({})",
                self.max_duration_seconds, self.interval_seconds
            )));
        }

        Ok(())
    }
}
