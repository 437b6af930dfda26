//! Core Module - Traversal, Classification & Monitoring
//!
//! The engine proper: address classification, bounded BFS expansion,
//! the batch worker pool and the watchlist monitor daemon.

pub mod batch;
pub mod classifier;
pub mod engine;
pub mod monitor;

pub use batch::*;
pub use classifier::*;
pub use engine::*;
pub use monitor::*;
