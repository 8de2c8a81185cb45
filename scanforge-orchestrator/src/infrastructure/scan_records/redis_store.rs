//! Redis-backed external scan records
//!
//! One hash per record at
//! `{project}:{database}:tenants:{tenant_id}:security-scans:{record_id}`,
//! with one JSON-encoded hash field per patch field. Records are owned by
//! the external system; updates never create them.

use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, error};

use crate::domain::{ScanRecordLocation, ScanRecordPatch};

use super::traits::{ScanRecordStore, SyncError};

/// `HSET` only when the record already exists; `-1` marks a missing record.
const UPDATE_EXISTING: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
return redis.call('HSET', KEYS[1], unpack(ARGV))
";

pub struct RedisScanRecordStore {
    connection_manager: ConnectionManager,
}

impl RedisScanRecordStore {
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            SyncError::Backend(format!("Failed to create client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create connection manager: {}", e);
            SyncError::Backend(format!("Failed to connect to scan record store: {}", e))
        })?;

        debug!("Connected to scan record store at {}", url);
        Ok(Self { connection_manager })
    }

    pub fn record_key(location: &ScanRecordLocation) -> String {
        format!(
            "{}:{}:tenants:{}:security-scans:{}",
            location.project, location.database, location.tenant_id, location.record_id
        )
    }
}

/// Map the update script's reply to the write outcome.
pub(crate) fn update_reply(key: &str, reply: i64) -> Result<(), SyncError> {
    if reply < 0 {
        return Err(SyncError::NotFound(key.to_string()));
    }
    Ok(())
}

/// One `(field, json)` pair per present patch field.
pub(crate) fn patch_fields(patch: &ScanRecordPatch) -> Result<Vec<(String, String)>, SyncError> {
    match serde_json::to_value(patch)? {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| Ok((key, serde_json::to_string(&value)?)))
            .collect(),
        other => Err(SyncError::Serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl ScanRecordStore for RedisScanRecordStore {
    async fn update(
        &self,
        location: &ScanRecordLocation,
        patch: &ScanRecordPatch,
    ) -> Result<(), SyncError> {
        let key = Self::record_key(location);
        let mut conn = self.connection_manager.clone();

        let script = redis::Script::new(UPDATE_EXISTING);
        let mut invocation = script.key(&key);
        for (field, value) in patch_fields(patch)? {
            invocation.arg(field).arg(value);
        }

        let reply: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SyncError::Backend(format!("Update of {} failed: {}", key, e)))?;
        update_reply(&key, reply)
    }
}
