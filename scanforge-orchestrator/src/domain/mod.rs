//! Orchestrator domain layer

pub mod container;
pub mod scan_record;

pub use container::*;
pub use scan_record::*;
