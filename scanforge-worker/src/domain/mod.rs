//! Worker domain: engine contract, scan policy and scoring

pub mod engine;
pub mod policy;
pub mod scoring;

pub use engine::{EngineError, ScanEngine};
pub use policy::ScanPolicy;
pub use scoring::{Severity, compute_score, passive_progress, summarize};
