//! scanforge core - shared foundation for the scan orchestration crates
//!
//! # Modules
//!
//! - [`config`] - Layered configuration (files plus `SCANFORGE__` environment variables)
//! - [`domain`] - Scan job record, status lifecycle and value objects
//! - [`infrastructure`] - Job store backends (Redis hash per job, in-memory)
//! - [`application`] - [`JobWorkflow`], the job lifecycle controller
//! - [`logging`] - Structured logging with tracing
//!
//! # Configuration
//!
//! ```rust,ignore
//! use scanforge_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `SCANFORGE__` prefix with double underscore separators:
//!
//! ```bash
//! SCANFORGE__DISPATCHER__MAX_CONCURRENT_SCANS=5
//! SCANFORGE__STORE__URL=redis://cache:6379
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::{JobWorkflow, StatusExtra, WorkflowError};
pub use config::Config;
pub use logging::init_tracing;
