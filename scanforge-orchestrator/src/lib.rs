//! scanforge orchestrator - dispatch and observation of scan workers
//!
//! Runs in the caller-facing process. Launches one isolated worker per
//! scan job under a concurrency ceiling, mirrors job state into linked
//! external scan records, and waits for completion with a hard deadline.
//!
//! # Architecture
//!
//! ```text
//! scanforge-orchestrator/
//! ├── application/        # Use cases
//! │   ├── dispatcher.rs   # Admission-controlled worker launch/stop
//! │   ├── bridge.rs       # Best-effort scan record sync
//! │   ├── polling.rs      # Bounded completion wait
//! │   └── use_cases.rs    # Start, status, cancel, scan-and-wait
//! ├── infrastructure/     # External integrations
//! │   ├── runtime/        # docker/podman CLI runtime
//! │   └── scan_records/   # Redis-backed external records
//! └── domain/             # Container and scan record value objects
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
