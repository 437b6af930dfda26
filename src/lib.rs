//! Flowtrace Library
//!
//! Fund-flow tracing engine over a public ledger's address graph:
//! - Bounded BFS expansion from seed addresses with cycle/dup suppression
//! - Exchange deposit-funnel detection over transfer histories
//! - Rate-limited, normalizing ledger client behind a capability trait
//! - Concurrent batch tracing through one shared limiter
//! - Watchlist monitor daemon with persistent diff state and alerts

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    analyze_address, AddressClassifier, AnalyzedAddress, BatchTracer, MonitorDaemon,
    MonitorState, TraceEngine,
};
pub use crate::models::{
    Address, AddressInfo, AddressSnapshot, Alert, AlertSeverity, Asset, Classification,
    ClientConfig, ConfigError, Direction, Endpoint, EndpointInfo, EndpointKind, FetchError,
    FetchErrorKind, FetchResult, FlowTotals, FunnelConfig, KnownEndpoints, MonitorConfig,
    PersistenceError, Priority, TraceGraph, TraceOptions, Transfer, WatchlistEntry,
};
pub use crate::providers::{EtherscanClient, LedgerSource, RateLimiter};
pub use crate::utils::{CacheStats, Shutdown, SnapshotCache};
