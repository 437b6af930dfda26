//! Configuration module
//!
//! Tunables default from `utils::constants`; environment variables
//! override them. Operator-curated tables (endpoint table, watchlist)
//! load from JSON files and fail fast with `ConfigError` at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::models::errors::ConfigError;
use crate::models::types::{normalize_address, Address, Direction, EndpointKind, WatchlistEntry};
use crate::utils::constants::{
    default_known_endpoints, ALERTS_FILE, DEFAULT_API_URL, DEFAULT_BALANCE_THRESHOLD,
    DEFAULT_CHAIN_ID, DEFAULT_FUNNEL_MAX_INFLOWS, DEFAULT_FUNNEL_MIN_INFLOWS,
    DEFAULT_HIGH_BALANCE_DELTA, DEFAULT_HIGH_TX_DELTA, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_MAX_ALERTS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_MAX_WORKERS,
    DEFAULT_MIN_VALUE, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RATE_LIMIT,
    DEFAULT_RELOAD_CYCLES, DEFAULT_STATUS_CYCLES, DEFAULT_TRACKED_ASSETS, STATE_FILE,
    SUMMARY_FILE,
};

/// Ledger client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explorer API endpoint
    pub api_url: String,
    /// Explorer API key; requests go out unauthenticated when empty
    pub api_key: String,
    pub chain_id: u64,
    /// Aggregate requests per rolling second
    pub rate_limit: f64,
    pub timeout: Duration,
    /// Transfers per page
    pub page_size: usize,
    /// Page cap per transfer query
    pub max_pages: usize,
    /// Token symbols worth tracking; empty = track everything
    pub tracked_assets: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api_key = std::env::var("FLOWTRACE_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            info!("🔑 FLOWTRACE_API_KEY not set, explorer requests go out unauthenticated");
        } else {
            info!("🔑 FLOWTRACE_API_KEY configured (key hidden)");
        }

        Self {
            api_url: std::env::var("FLOWTRACE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key,
            chain_id: std::env::var("FLOWTRACE_CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),
            rate_limit: std::env::var("FLOWTRACE_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            tracked_assets: DEFAULT_TRACKED_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Parameters of one expansion run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceOptions {
    pub max_depth: u32,
    pub direction: Direction,
    /// Dust threshold: transfers below it influence neither the graph
    /// nor the funnel heuristic
    pub min_value: f64,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            direction: Direction::Forward,
            min_value: DEFAULT_MIN_VALUE,
        }
    }
}

/// Deposit-funnel heuristic bounds. The source never justified its exact
/// numbers, so they stay tunable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FunnelConfig {
    pub min_inflows: usize,
    pub max_inflows: usize,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            min_inflows: DEFAULT_FUNNEL_MIN_INFLOWS,
            max_inflows: DEFAULT_FUNNEL_MAX_INFLOWS,
        }
    }
}

/// One entry of the known-endpoint table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub label: String,
    pub kind: EndpointKind,
}

/// Read-only mapping of address -> endpoint info, injected as
/// configuration. The classifier short-circuits on hits.
#[derive(Debug, Clone, Default)]
pub struct KnownEndpoints {
    entries: HashMap<Address, EndpointInfo>,
}

impl KnownEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// The curated built-in table
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (addr, label, kind) in default_known_endpoints() {
            table.insert(addr, label, kind);
        }
        table
    }

    /// Load a JSON table `{ "0xaddr": {"label": "...", "kind": "exchange"}, ... }`,
    /// merged over the built-in entries.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::invalid("endpoint table", format!("{}: {}", path.display(), e)))?;
        let parsed: HashMap<String, EndpointInfo> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::invalid("endpoint table", e))?;

        let mut table = Self::builtin();
        for (addr, entry) in parsed {
            table.entries.insert(normalize_address(&addr), entry);
        }
        info!("📒 Loaded endpoint table: {} entries", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, address: &str, label: &str, kind: EndpointKind) {
        self.entries.insert(
            normalize_address(address),
            EndpointInfo {
                label: label.to_string(),
                kind,
            },
        );
    }

    /// O(1) lookup; `address` must already be normalized
    pub fn get(&self, address: &str) -> Option<&EndpointInfo> {
        self.entries.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load a watchlist JSON file: `[{"address": "...", "label": "...", "priority": "high"}, ...]`.
/// Addresses are normalized and duplicates collapse to the last entry.
pub fn load_watchlist(path: &Path) -> Result<Vec<WatchlistEntry>, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::invalid("watchlist", format!("{}: {}", path.display(), e)))?;
    let mut entries: Vec<WatchlistEntry> =
        serde_json::from_str(&raw).map_err(|e| ConfigError::invalid("watchlist", e))?;

    let mut seen: HashMap<Address, usize> = HashMap::new();
    let mut deduped: Vec<WatchlistEntry> = Vec::new();
    for mut entry in entries.drain(..) {
        entry.address = normalize_address(&entry.address);
        if let Some(&idx) = seen.get(&entry.address) {
            deduped[idx] = entry;
        } else {
            seen.insert(entry.address.clone(), deduped.len());
            deduped.push(entry);
        }
    }

    if deduped.is_empty() {
        return Err(ConfigError::invalid("watchlist", "no entries"));
    }
    Ok(deduped)
}

/// Monitor daemon configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory holding state, alert log and summary files
    pub state_dir: PathBuf,
    pub watchlist_path: PathBuf,
    pub poll_interval: Duration,
    /// Minimum absolute balance delta that raises an alert
    pub balance_threshold: f64,
    /// Balance delta past which severity escalates to high
    pub high_balance_delta: f64,
    /// Tx-count delta past which severity escalates to high
    pub high_tx_delta: i64,
    /// Alert log cap (bounded FIFO)
    pub max_alerts: usize,
    /// Watchlist reload period, in cycles
    pub reload_cycles: u64,
    /// Status log period, in cycles
    pub status_cycles: u64,
    pub max_workers: usize,
}

impl MonitorConfig {
    pub fn new(state_dir: PathBuf, watchlist_path: PathBuf) -> Self {
        Self {
            state_dir,
            watchlist_path,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            balance_threshold: DEFAULT_BALANCE_THRESHOLD,
            high_balance_delta: DEFAULT_HIGH_BALANCE_DELTA,
            high_tx_delta: DEFAULT_HIGH_TX_DELTA,
            max_alerts: DEFAULT_MAX_ALERTS,
            reload_cycles: DEFAULT_RELOAD_CYCLES,
            status_cycles: DEFAULT_STATUS_CYCLES,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    pub fn alerts_file(&self) -> PathBuf {
        self.state_dir.join(ALERTS_FILE)
    }

    pub fn summary_file(&self) -> PathBuf {
        self.state_dir.join(SUMMARY_FILE)
    }
}
