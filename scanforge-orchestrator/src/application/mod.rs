//! Orchestrator application layer

pub mod bridge;
pub mod dispatcher;
pub mod polling;
pub mod responses;
pub mod use_cases;

pub use bridge::{Bridge, SyncOutcome};
pub use dispatcher::{DispatchError, Dispatcher};
pub use polling::PollingOrchestrator;
pub use responses::*;
pub use use_cases::*;
