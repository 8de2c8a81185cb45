//! Application layer

pub mod workflow;

pub use workflow::{JobWorkflow, StatusExtra, WorkflowError};
