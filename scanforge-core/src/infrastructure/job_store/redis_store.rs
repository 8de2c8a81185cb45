//! Redis-backed job store
//!
//! Each job is one hash at `{key_prefix}:{job_id}`. Every top-level record
//! field is a hash field holding its JSON encoding, so a merge only rewrites
//! the fields it carries and concurrent writers touching different fields do
//! not clobber each other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::domain::{JobId, ScanJob};

use super::store::{JobPatch, JobStore, JobStoreError, json_fields};

pub struct RedisJobStore {
    connection_manager: ConnectionManager,
    key_prefix: String,
}

impl RedisJobStore {
    /// Connect and verify the backend with a `PING`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, JobStoreError> {
        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            JobStoreError::Backend(format!("Failed to create client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create connection manager: {}", e);
            JobStoreError::Backend(format!("Failed to connect to job store: {}", e))
        })?;

        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| JobStoreError::Backend(format!("Failed to ping job store: {}", e)))?;

        debug!("Connected to job store at {}", url);

        Ok(Self {
            connection_manager,
            key_prefix: key_prefix.into(),
        })
    }

    /// Connect using the store section, bounded by its connect timeout.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, JobStoreError> {
        let timeout = config.connect_timeout();
        match tokio::time::timeout(timeout, Self::connect(&config.url, config.key_prefix.clone()))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(JobStoreError::Backend(format!(
                "Timed out connecting to job store after {}s",
                timeout.as_secs()
            ))),
        }
    }

    fn job_key(&self, job_id: JobId) -> String {
        format!("{}:{}", self.key_prefix, job_id)
    }

    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<(), JobStoreError> {
        let mut conn = self.connection_manager.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        cmd.query_async::<i64>(&mut conn)
            .await
            .map_err(|e| JobStoreError::Backend(format!("HSET {} failed: {}", key, e)))?;
        Ok(())
    }
}

/// Rebuild a record from the raw hash fields.
pub(crate) fn job_from_hash(raw: HashMap<String, String>) -> Result<ScanJob, JobStoreError> {
    let mut object = serde_json::Map::with_capacity(raw.len());
    for (field, value) in raw {
        let parsed = serde_json::from_str(&value).map_err(|e| {
            JobStoreError::Serialization(format!("field '{}' is not valid JSON: {}", field, e))
        })?;
        object.insert(field, parsed);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, job: &ScanJob) -> Result<(), JobStoreError> {
        let key = self.job_key(job.job_id);
        self.hset(&key, json_fields(job)?).await?;

        info!(job_id = %job.job_id, source = ?job.source, tool = %job.tool, "Created job");
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<ScanJob>, JobStoreError> {
        let key = self.job_key(job_id);
        let mut conn = self.connection_manager.clone();

        let raw: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(&key)
            .query_async::<HashMap<String, String>>(&mut conn)
            .await
            .map_err(|e| JobStoreError::Backend(format!("HGETALL {} failed: {}", key, e)))?;

        if raw.is_empty() {
            debug!(job_id = %job_id, "Job not found in store");
            return Ok(None);
        }

        job_from_hash(raw).map(Some)
    }

    async fn merge(&self, job_id: JobId, patch: JobPatch) -> Result<(), JobStoreError> {
        let key = self.job_key(job_id);
        let mut conn = self.connection_manager.clone();

        // Refuse to materialise a partial hash for an unknown job.
        let exists: bool = redis::cmd("EXISTS")
            .arg(&key)
            .query_async::<bool>(&mut conn)
            .await
            .map_err(|e| JobStoreError::Backend(format!("EXISTS {} failed: {}", key, e)))?;
        if !exists {
            return Err(JobStoreError::NotFound(job_id));
        }

        self.hset(&key, patch.to_fields(Utc::now())?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobConfig, JobSource, JobStatus, NewJob, ScanLevel};

    #[test]
    fn test_hash_round_trip() {
        let job = ScanJob::new(
            NewJob::new(
                JobSource::AppScanner,
                JobConfig::new("https://example.com", ScanLevel::Aggressive),
                "img",
            )
            .with_scan_record("tenant", "record"),
        );

        let raw: HashMap<String, String> = json_fields(&job).unwrap().into_iter().collect();
        assert!(raw.contains_key("config"));
        assert!(!raw.contains_key("results"));

        let restored = job_from_hash(raw).unwrap();
        assert_eq!(restored, job);
    }

    #[test]
    fn test_patch_fields_overlay_hash() {
        let job = ScanJob::new(NewJob::new(
            JobSource::Mcp,
            JobConfig::new("https://example.com", ScanLevel::Light),
            "img",
        ));
        let mut raw: HashMap<String, String> = json_fields(&job).unwrap().into_iter().collect();

        let patch = JobPatch {
            status: Some(JobStatus::Dispatched),
            container_id: Some("c0ffee".into()),
            ..JobPatch::default()
        };
        raw.extend(patch.to_fields(Utc::now()).unwrap());

        let restored = job_from_hash(raw).unwrap();
        assert_eq!(restored.status, JobStatus::Dispatched);
        assert_eq!(restored.container_id.as_deref(), Some("c0ffee"));
        assert_eq!(restored.config, job.config);
    }

    #[test]
    fn test_corrupt_field_is_a_serialization_error() {
        let mut raw = HashMap::new();
        raw.insert("status".to_string(), "not json".to_string());
        assert!(matches!(
            job_from_hash(raw),
            Err(JobStoreError::Serialization(_))
        ));
    }
}
