//! Infrastructure layer

pub mod zap;

pub use zap::ZapClient;
