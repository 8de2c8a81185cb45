//! Worker application layer

pub mod driver;

pub use driver::{ScanDriver, ScanError, ScanTarget};
