//! Providers Module - External Data Sources
//!
//! The ledger capability trait, the explorer client behind it, and the
//! shared rate limiter every outbound call funnels through.

pub mod etherscan;
pub mod ledger;
pub mod limiter;

pub use etherscan::*;
pub use ledger::*;
pub use limiter::*;
