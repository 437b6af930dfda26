//! Type definitions for the fund-flow tracing engine
//! All core data structures for traversal, classification and monitoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Addresses are case-normalized identifier strings, used as map keys
/// throughout. Normalize once at every boundary.
pub type Address = String;

/// Lower-case an address for use as a map key
#[inline]
pub fn normalize_address(address: &str) -> Address {
    address.trim().to_lowercase()
}

/// Asset carried by a transfer: the native coin or a fungible token.
/// Token amounts are already scaled to whole units by the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Native,
    Token { symbol: String },
}

impl Asset {
    pub fn symbol(&self) -> &str {
        match self {
            Asset::Native => "ETH",
            Asset::Token { symbol } => symbol,
        }
    }
}

/// One directed value movement. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub hash: String,
    pub block: u64,
    pub timestamp: u64,
    pub from: Address,
    pub to: Address,
    pub asset: Asset,
    /// Whole units, never raw minor units
    pub amount: f64,
}

impl Transfer {
    /// Is this an outflow from `address`?
    pub fn is_outflow_of(&self, address: &str) -> bool {
        self.from == address
    }

    /// Is this an inflow to `address`?
    pub fn is_inflow_of(&self, address: &str) -> bool {
        self.to == address
    }

    /// The counterparty as seen from `address`, if the transfer touches it
    pub fn peer_of(&self, address: &str) -> Option<&Address> {
        if self.from == address {
            Some(&self.to)
        } else if self.to == address {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Split transfers into (inflows, outflows) relative to `address`.
/// Preserves input order, which the classifier's tie-break relies on.
pub fn partition_flows<'a>(
    address: &str,
    transfers: &'a [Transfer],
) -> (Vec<&'a Transfer>, Vec<&'a Transfer>) {
    let mut inflows = Vec::new();
    let mut outflows = Vec::new();
    for t in transfers {
        if t.is_outflow_of(address) {
            outflows.push(t);
        } else if t.is_inflow_of(address) {
            inflows.push(t);
        }
    }
    (inflows, outflows)
}

/// Which way a traversal walks the address graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow outflows: where did funds go?
    Forward,
    /// Follow inflows: where did funds come from?
    Backward,
    /// Both at once
    Both,
}

impl Direction {
    pub fn wants_outflows(&self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    pub fn wants_inflows(&self) -> bool {
        matches!(self, Direction::Backward | Direction::Both)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "forward" | "out" => Some(Direction::Forward),
            "backward" | "in" => Some(Direction::Backward),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Both => "both",
        }
    }
}

/// What a known endpoint is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Exchange,
    Mixer,
    Dex,
    Other,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Exchange => "exchange",
            EndpointKind::Mixer => "mixer",
            EndpointKind::Dex => "dex",
            EndpointKind::Other => "other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            EndpointKind::Exchange => "💰",
            EndpointKind::Mixer => "⚠️",
            EndpointKind::Dex => "📊",
            EndpointKind::Other => "📍",
        }
    }
}

/// Outcome of classifying one address against its transfer history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// Nothing known or inferred
    Unknown,
    /// Present in the operator-curated endpoint table
    KnownEndpoint { label: String, kind: EndpointKind },
    /// Behaves like an exchange deposit address: few inflows, outflows
    /// swept to a known endpoint
    DepositFunnel { swept_to: Address, kind: EndpointKind },
}

impl Classification {
    /// Endpoints terminate traversal on their branch
    pub fn is_endpoint(&self) -> bool {
        !matches!(self, Classification::Unknown)
    }

    pub fn kind(&self) -> Option<EndpointKind> {
        match self {
            Classification::Unknown => None,
            Classification::KnownEndpoint { kind, .. } => Some(*kind),
            Classification::DepositFunnel { kind, .. } => Some(*kind),
        }
    }
}

/// Balance/activity facts for one address, as returned by the ledger client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// Native balance in whole units
    pub balance: f64,
    pub tx_count: u64,
    pub is_contract: bool,
}

/// Point-in-time summary of one address. Produced fresh on every fetch,
/// replaced rather than mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub address: Address,
    pub balance: f64,
    pub tx_count: u64,
    pub is_contract: bool,
    pub classification: Classification,
    pub inflow_count: usize,
    pub outflow_count: usize,
    pub inflow_value: f64,
    pub outflow_value: f64,
    /// Unique counterparties seen in the (dust-filtered) history
    pub discovered_peers: Vec<Address>,
    /// Earliest transfer timestamp, if any activity was seen
    pub first_seen: Option<u64>,
    /// Latest transfer timestamp, if any activity was seen
    pub last_seen: Option<u64>,
    /// True when the ledger fetch failed; such a node is data, not absence
    pub fetch_failed: bool,
    pub fetched_at: DateTime<Utc>,
}

impl AddressSnapshot {
    /// Build a snapshot from fetched facts plus a (dust-filtered)
    /// transfer history.
    pub fn build(
        address: Address,
        info: AddressInfo,
        transfers: &[Transfer],
        classification: Classification,
    ) -> Self {
        let (inflows, outflows) = partition_flows(&address, transfers);

        let mut peers: Vec<Address> = Vec::new();
        for t in transfers {
            if let Some(peer) = t.peer_of(&address) {
                if peer != &address && !peers.contains(peer) {
                    peers.push(peer.clone());
                }
            }
        }

        let first_seen = transfers.iter().map(|t| t.timestamp).min();
        let last_seen = transfers.iter().map(|t| t.timestamp).max();

        Self {
            inflow_count: inflows.len(),
            outflow_count: outflows.len(),
            inflow_value: inflows.iter().map(|t| t.amount).sum(),
            outflow_value: outflows.iter().map(|t| t.amount).sum(),
            discovered_peers: peers,
            first_seen,
            last_seen,
            balance: info.balance,
            tx_count: info.tx_count,
            is_contract: info.is_contract,
            classification,
            fetch_failed: false,
            fetched_at: Utc::now(),
            address,
        }
    }

    /// Placeholder snapshot for a node whose fetch failed. The node stays
    /// in the graph, flagged, with classification `Unknown`.
    pub fn failed(address: Address) -> Self {
        Self {
            address,
            balance: 0.0,
            tx_count: 0,
            is_contract: false,
            classification: Classification::Unknown,
            inflow_count: 0,
            outflow_count: 0,
            inflow_value: 0.0,
            outflow_value: 0.0,
            discovered_peers: Vec::new(),
            first_seen: None,
            last_seen: None,
            fetch_failed: true,
            fetched_at: Utc::now(),
        }
    }
}

/// A traversal branch that terminated at a known endpoint or funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: Address,
    pub classification: Classification,
    /// Seed-to-endpoint hop chain, seed first
    pub path_from_seed: Vec<Address>,
    /// Filtered inflow total of the endpoint node
    pub value: f64,
}

/// Aggregate value movement observed by one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub addresses_traced: usize,
    pub total_value_tracked: f64,
    pub value_to_exchanges: f64,
    pub value_to_mixers: f64,
    pub value_to_unknown: f64,
}

/// Result of one expansion: nodes, traversed edges, endpoint records and
/// totals. Created at the start of one `expand` call, returned at its
/// end; it has no life beyond a single traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceGraph {
    pub seeds: Vec<Address>,
    pub max_depth: u32,
    pub direction: Direction,
    pub min_value: f64,
    pub traced_at: DateTime<Utc>,
    pub nodes: HashMap<Address, AddressSnapshot>,
    /// Hop depth each node was first discovered at (seeds are 0)
    pub depths: HashMap<Address, u32>,
    /// Transfers actually traversed, in traversal order
    pub edges: Vec<Transfer>,
    pub endpoints: Vec<Endpoint>,
    pub totals: FlowTotals,
}

impl TraceGraph {
    pub fn new(seeds: Vec<Address>, max_depth: u32, direction: Direction, min_value: f64) -> Self {
        Self {
            seeds,
            max_depth,
            direction,
            min_value,
            traced_at: Utc::now(),
            nodes: HashMap::new(),
            depths: HashMap::new(),
            edges: Vec::new(),
            endpoints: Vec::new(),
            totals: FlowTotals::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// ============================================
// Monitor daemon records
// ============================================

/// Watchlist entry priority, operator-assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// One tracked address. Externally supplied config, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub address: Address,
    pub label: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Alert severity; escalates past the secondary thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

/// Immutable record of a material watchlist change, appended to a
/// bounded FIFO log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub address: Address,
    pub label: String,
    pub balance_delta: f64,
    pub tx_count_delta: i64,
    pub current_balance: f64,
    pub severity: AlertSeverity,
}
