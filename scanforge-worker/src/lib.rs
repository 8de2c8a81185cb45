//! scanforge worker - drives one scan engine through one job
//!
//! Each worker process owns exactly one job. It reports progress by
//! overwriting the job's progress record and finishes with a single
//! combined COMPLETED write, or a FAILED write on any fatal error.
//!
//! # Architecture
//!
//! ```text
//! scanforge-worker/
//! ├── application/
//! │   └── driver.rs     # Phased scan state machine
//! ├── infrastructure/
//! │   └── zap.rs        # OWASP ZAP JSON API client
//! ├── domain/
//! │   ├── engine.rs     # ScanEngine contract
//! │   ├── policy.rs     # Level-derived engine knobs
//! │   └── scoring.rs    # Severity tally and score
//! └── bin/worker.rs     # scanforge-worker entry point
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{ScanDriver, ScanError, ScanTarget};
