pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::InMemoryJobStore;
pub use redis_store::RedisJobStore;
pub use store::{JobPatch, JobStore, JobStoreError};
