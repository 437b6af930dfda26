//! Address Classifier Module
//!
//! Decides what an address *is*: a curated known endpoint (exchange hot
//! wallet, mixer, DEX router), a deposit funnel that sweeps everything
//! it receives into one, or unknown. Pure function of its inputs plus
//! the static table - same inputs, same answer, every time.

use std::collections::HashMap;

use crate::models::config::{FunnelConfig, KnownEndpoints};
use crate::models::types::{partition_flows, Classification, EndpointKind, Transfer};

/// Classifier over one endpoint table and one set of funnel bounds
#[derive(Debug, Clone, Default)]
pub struct AddressClassifier {
    endpoints: KnownEndpoints,
    funnel: FunnelConfig,
}

impl AddressClassifier {
    pub fn new(endpoints: KnownEndpoints, funnel: FunnelConfig) -> Self {
        Self { endpoints, funnel }
    }

    /// Table-only lookup: label kind of a curated endpoint, if any.
    /// The traversal uses this for edge accounting without paying for a
    /// full classification of the counterparty.
    pub fn known_kind(&self, address: &str) -> Option<EndpointKind> {
        self.endpoints.get(address).map(|e| e.kind)
    }

    /// Classify `address` against its (dust-filtered) transfer history.
    ///
    /// The curated table takes precedence over heuristics: a known hot
    /// wallet is a `KnownEndpoint` no matter what its flows look like.
    pub fn classify(&self, address: &str, transfers: &[Transfer]) -> Classification {
        // 1. O(1) short-circuit on the curated table
        if let Some(entry) = self.endpoints.get(address) {
            return Classification::KnownEndpoint {
                label: entry.label.clone(),
                kind: entry.kind,
            };
        }

        // 2. Partition history into inflows and outflows
        let (inflows, outflows) = partition_flows(address, transfers);

        // 3. Deposit-funnel heuristic: a bounded trickle of inflows,
        //    swept out to a single curated endpoint. Zero inflows is not
        //    a funnel; neither is a high-volume hub.
        if inflows.is_empty()
            || inflows.len() < self.funnel.min_inflows
            || inflows.len() > self.funnel.max_inflows
            || outflows.is_empty()
        {
            return Classification::Unknown;
        }

        if let Some(destination) = modal_destination(&outflows) {
            if let Some(entry) = self.endpoints.get(destination) {
                return Classification::DepositFunnel {
                    swept_to: destination.to_string(),
                    kind: entry.kind,
                };
            }
        }

        // 4. Nothing known, nothing inferred
        Classification::Unknown
    }
}

/// The address receiving the plurality of `outflows`. Ties break to the
/// earliest-seen destination, keeping classification stable under a
/// fixed transfer ordering.
fn modal_destination<'a>(outflows: &[&'a Transfer]) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for t in outflows {
        let dest = t.to.as_str();
        let count = counts.entry(dest).or_insert(0);
        if *count == 0 {
            first_seen.push(dest);
        }
        *count += 1;
    }

    // max_by_key keeps the last maximum it sees; walking the
    // first-seen order in reverse makes the earliest destination win ties
    first_seen.into_iter().rev().max_by_key(|dest| counts[dest])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Asset;

    fn transfer(from: &str, to: &str, amount: f64) -> Transfer {
        Transfer {
            hash: format!("0x{}{}", from.len(), to.len()),
            block: 1,
            timestamp: 100,
            from: from.to_string(),
            to: to.to_string(),
            asset: Asset::Native,
            amount,
        }
    }

    fn classifier() -> AddressClassifier {
        let mut table = KnownEndpoints::new();
        table.insert("0xhot", "Exchange A", EndpointKind::Exchange);
        table.insert("0xmixer", "Mixer M", EndpointKind::Mixer);
        AddressClassifier::new(table, FunnelConfig::default())
    }

    #[test]
    fn test_known_endpoint_short_circuits() {
        let c = classifier();
        // Table hit wins even with a funnel-looking history
        let transfers = vec![transfer("0xa", "0xhot", 1.0)];
        match c.classify("0xhot", &transfers) {
            Classification::KnownEndpoint { label, kind } => {
                assert_eq!(label, "Exchange A");
                assert_eq!(kind, EndpointKind::Exchange);
            }
            other => panic!("expected KnownEndpoint, got {:?}", other),
        }
    }

    #[test]
    fn test_deposit_funnel_detected() {
        let c = classifier();
        let transfers = vec![
            transfer("0xv1", "0xdep", 2.0),
            transfer("0xv2", "0xdep", 3.0),
            transfer("0xdep", "0xhot", 4.9),
        ];
        match c.classify("0xdep", &transfers) {
            Classification::DepositFunnel { swept_to, kind } => {
                assert_eq!(swept_to, "0xhot");
                assert_eq!(kind, EndpointKind::Exchange);
            }
            other => panic!("expected DepositFunnel, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_inflows_is_not_a_funnel() {
        let c = classifier();
        let transfers = vec![transfer("0xdep", "0xhot", 4.9)];
        assert_eq!(c.classify("0xdep", &transfers), Classification::Unknown);
    }

    #[test]
    fn test_high_volume_hub_is_not_a_funnel() {
        let c = classifier();
        let mut transfers: Vec<Transfer> = (0..25)
            .map(|i| transfer(&format!("0xv{}", i), "0xhub", 1.0))
            .collect();
        transfers.push(transfer("0xhub", "0xhot", 20.0));
        assert_eq!(c.classify("0xhub", &transfers), Classification::Unknown);
    }

    #[test]
    fn test_sweep_to_unknown_address_is_not_a_funnel() {
        let c = classifier();
        let transfers = vec![
            transfer("0xv1", "0xdep", 2.0),
            transfer("0xdep", "0xnobody", 1.9),
        ];
        assert_eq!(c.classify("0xdep", &transfers), Classification::Unknown);
    }

    #[test]
    fn test_modal_destination_plurality() {
        let c = classifier();
        let transfers = vec![
            transfer("0xv1", "0xdep", 5.0),
            transfer("0xdep", "0xnobody", 1.0),
            transfer("0xdep", "0xhot", 1.0),
            transfer("0xdep", "0xhot", 1.0),
        ];
        // 0xhot wins the plurality of outflows
        assert!(matches!(
            c.classify("0xdep", &transfers),
            Classification::DepositFunnel { .. }
        ));
    }

    #[test]
    fn test_modal_tie_breaks_to_earliest_seen() {
        let c = classifier();
        // One outflow each to 0xmixer and 0xhot; 0xmixer came first
        let transfers = vec![
            transfer("0xv1", "0xdep", 5.0),
            transfer("0xdep", "0xmixer", 1.0),
            transfer("0xdep", "0xhot", 1.0),
        ];
        match c.classify("0xdep", &transfers) {
            Classification::DepositFunnel { swept_to, kind } => {
                assert_eq!(swept_to, "0xmixer");
                assert_eq!(kind, EndpointKind::Mixer);
            }
            other => panic!("expected DepositFunnel, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let c = classifier();
        let transfers = vec![
            transfer("0xv1", "0xdep", 2.0),
            transfer("0xdep", "0xhot", 1.9),
        ];
        let first = c.classify("0xdep", &transfers);
        let second = c.classify("0xdep", &transfers);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_history_is_unknown() {
        let c = classifier();
        assert_eq!(c.classify("0xempty", &[]), Classification::Unknown);
    }
}
