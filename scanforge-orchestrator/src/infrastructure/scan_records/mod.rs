pub mod redis_store;
pub mod traits;

pub use redis_store::RedisScanRecordStore;
pub use traits::{ScanRecordStore, SyncError};
