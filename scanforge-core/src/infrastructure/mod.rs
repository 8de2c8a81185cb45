//! Infrastructure layer

pub mod job_store;

pub use job_store::{InMemoryJobStore, JobPatch, JobStore, JobStoreError, RedisJobStore};
