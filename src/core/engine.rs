//! Graph Expansion Engine Module
//!
//! Bounded BFS over the address graph. One traversal owns its queue and
//! visited set outright; the only shared resource it touches is the
//! rate limiter buried inside the ledger source. BFS, not DFS: memory
//! grows per depth level and depth assignment stays exact regardless of
//! network response timing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::classifier::AddressClassifier;
use crate::models::config::TraceOptions;
use crate::models::errors::FetchResult;
use crate::models::types::{
    normalize_address, Address, AddressSnapshot, Direction, Endpoint, EndpointKind, TraceGraph,
    Transfer,
};
use crate::providers::ledger::LedgerSource;
use crate::utils::shutdown::Shutdown;

/// One analyzed address: the snapshot plus the dust-filtered history it
/// was computed from
#[derive(Debug, Clone)]
pub struct AnalyzedAddress {
    pub snapshot: AddressSnapshot,
    pub transfers: Vec<Transfer>,
}

/// Fetch, dust-filter and classify a single address.
///
/// Both directions are always fetched - the funnel heuristic needs the
/// full picture even when the traversal only walks one way. Transfers
/// below `min_value` are dropped before they can influence either the
/// graph or the classifier.
pub async fn analyze_address(
    ledger: &dyn LedgerSource,
    classifier: &AddressClassifier,
    address: &str,
    min_value: f64,
) -> FetchResult<AnalyzedAddress> {
    let address = normalize_address(address);
    let info = ledger.address_info(&address).await?;
    let transfers = ledger.transfers(&address, Direction::Both).await?;

    let filtered: Vec<Transfer> = transfers
        .into_iter()
        .filter(|t| t.amount >= min_value)
        .collect();

    let classification = classifier.classify(&address, &filtered);
    let snapshot = AddressSnapshot::build(address, info, &filtered, classification);
    Ok(AnalyzedAddress {
        snapshot,
        transfers: filtered,
    })
}

/// Single-traversal expansion engine. Construct once per context and
/// call `expand` as often as needed; each call builds a fresh graph.
pub struct TraceEngine {
    ledger: Arc<dyn LedgerSource>,
    classifier: Arc<AddressClassifier>,
    shutdown: Option<Arc<Shutdown>>,
}

impl TraceEngine {
    pub fn new(ledger: Arc<dyn LedgerSource>, classifier: Arc<AddressClassifier>) -> Self {
        Self {
            ledger,
            classifier,
            shutdown: None,
        }
    }

    /// Observe a cooperative stop signal between queue items
    pub fn with_shutdown(mut self, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Expand outward from `seeds` up to `max_depth` hops.
    ///
    /// Never fails: fetch errors become flagged nodes and traversal
    /// carries on with the rest of the queue. A partially-failed
    /// expansion is a usable graph, not an exception.
    pub async fn expand(&self, seeds: &[String], options: &TraceOptions) -> TraceGraph {
        // Duplicate seeds coalesce before anything is fetched
        let mut discovered: HashMap<Address, u32> = HashMap::new();
        let mut seed_list: Vec<Address> = Vec::new();
        for raw in seeds {
            let addr = normalize_address(raw);
            if !addr.is_empty() && !discovered.contains_key(&addr) {
                discovered.insert(addr.clone(), 0);
                seed_list.push(addr);
            }
        }

        let mut graph = TraceGraph::new(
            seed_list.clone(),
            options.max_depth,
            options.direction,
            options.min_value,
        );

        let mut queue: VecDeque<(Address, u32, Vec<Address>)> = seed_list
            .iter()
            .map(|s| (s.clone(), 0, vec![s.clone()]))
            .collect();

        info!(
            "🔍 Expanding {} seed(s), depth {}, direction {}, min value {}",
            seed_list.len(),
            options.max_depth,
            options.direction.as_str(),
            options.min_value
        );

        while let Some((address, depth, path)) = queue.pop_front() {
            if let Some(shutdown) = &self.shutdown {
                if shutdown.is_triggered() {
                    warn!(
                        "🛑 Expansion interrupted, returning partial graph ({} nodes)",
                        graph.nodes.len()
                    );
                    break;
                }
            }

            debug!("[depth {}] expanding {}", depth, address);

            let analyzed = match analyze_address(
                self.ledger.as_ref(),
                &self.classifier,
                &address,
                options.min_value,
            )
            .await
            {
                Ok(analyzed) => analyzed,
                Err(e) => {
                    // One failed fetch never aborts the whole expansion;
                    // a dead node is data, not absence of data
                    warn!("⚠️ Fetch failed for {}: {} - node flagged, continuing", address, e);
                    graph.depths.insert(address.clone(), depth);
                    graph
                        .nodes
                        .insert(address.clone(), AddressSnapshot::failed(address.clone()));
                    graph.totals.addresses_traced += 1;
                    continue;
                }
            };

            graph.depths.insert(address.clone(), depth);
            graph.totals.addresses_traced += 1;

            // Endpoints terminate their branch. Without this, one
            // exchange hot wallet would pull millions of peers into the
            // frontier.
            if analyzed.snapshot.classification.is_endpoint() {
                info!(
                    "🎯 Endpoint at depth {}: {} ({:?})",
                    depth, address, analyzed.snapshot.classification
                );
                graph.endpoints.push(Endpoint {
                    address: address.clone(),
                    classification: analyzed.snapshot.classification.clone(),
                    path_from_seed: path,
                    value: analyzed.snapshot.inflow_value,
                });
                graph.nodes.insert(address.clone(), analyzed.snapshot);
                continue;
            }

            // Nodes at the depth limit are snapshot-only: recorded and
            // classified, but they contribute no edges (max_depth = 0
            // means seed analysis, zero edges)
            if depth < options.max_depth {
                for transfer in &analyzed.transfers {
                    let peer = if options.direction.wants_outflows()
                        && transfer.is_outflow_of(&address)
                    {
                        &transfer.to
                    } else if options.direction.wants_inflows() && transfer.is_inflow_of(&address)
                    {
                        &transfer.from
                    } else {
                        continue;
                    };

                    if peer == &address {
                        continue; // self-transfers add nothing
                    }

                    match discovered.get(peer) {
                        None => {
                            discovered.insert(peer.clone(), depth + 1);
                            let mut peer_path = path.clone();
                            peer_path.push(peer.clone());
                            queue.push_back((peer.clone(), depth + 1, peer_path));
                            record_edge(&mut graph, &self.classifier, transfer);
                        }
                        // Parallel edge into the next BFS level (e.g. two
                        // seeds sharing a downstream peer) stays in the
                        // graph; the peer itself is expanded only once
                        Some(&d) if d == depth + 1 => {
                            record_edge(&mut graph, &self.classifier, transfer);
                        }
                        // Back/cross edge into an earlier level: cycle
                        // suppression drops it
                        Some(_) => {
                            debug!(
                                "cycle edge suppressed: {} -> {} at depth {}",
                                transfer.from, transfer.to, depth
                            );
                        }
                    }
                }
            }

            graph.nodes.insert(address.clone(), analyzed.snapshot);
        }

        info!(
            "✅ Expansion done: {} nodes, {} edges, {} endpoints, {:.4} value tracked",
            graph.nodes.len(),
            graph.edges.len(),
            graph.endpoints.len(),
            graph.totals.total_value_tracked
        );
        graph
    }
}

/// Record a traversed edge and account its value against the curated
/// table kind of the receiving address
fn record_edge(graph: &mut TraceGraph, classifier: &AddressClassifier, transfer: &Transfer) {
    graph.totals.total_value_tracked += transfer.amount;
    match classifier.known_kind(&transfer.to) {
        Some(EndpointKind::Exchange) => graph.totals.value_to_exchanges += transfer.amount,
        Some(EndpointKind::Mixer) => graph.totals.value_to_mixers += transfer.amount,
        _ => graph.totals.value_to_unknown += transfer.amount,
    }
    graph.edges.push(transfer.clone());
}

/// Addresses referenced by recorded edges but never expanded into
/// nodes. Empty for any traversal that ran to completion; an
/// interrupted traversal may leave entries from its unfinished frontier.
pub fn dangling_edge_targets(graph: &TraceGraph) -> Vec<&Address> {
    let known: HashSet<&Address> = graph.nodes.keys().collect();
    let mut dangling = Vec::new();
    for edge in &graph.edges {
        if !known.contains(&edge.to) && !dangling.contains(&&edge.to) {
            dangling.push(&edge.to);
        }
        if !known.contains(&edge.from) && !dangling.contains(&&edge.from) {
            dangling.push(&edge.from);
        }
    }
    dangling
}
