//! scanforge - on-demand web application scan orchestration
//!
//! Wires the job store, container dispatcher, scan record bridge and polling
//! orchestrator into the caller-facing use cases.

mod app;

pub use app::{AppError, AppHandle, create_app};
pub use scanforge_core::{Config, init_tracing};

// Re-export for convenience
pub use scanforge_core;
pub use scanforge_orchestrator;
