//! Infrastructure layer

pub mod runtime;
pub mod scan_records;

pub use runtime::{ContainerRuntime, DockerCliRuntime, RuntimeError};
pub use scan_records::{RedisScanRecordStore, ScanRecordStore, SyncError};
