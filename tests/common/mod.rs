//! Shared test fixtures: an in-memory ledger source with scriptable
//! failures, plus small builders for transfer histories.
#![allow(dead_code)] // not every test binary uses every fixture

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use flowtrace::{
    AddressInfo, Asset, Direction, FetchError, FetchErrorKind, FetchResult, LedgerSource,
    Transfer,
};

/// In-memory `LedgerSource`. Transfers registered once show up in both
/// endpoints' histories, like a real ledger query by address.
#[derive(Default)]
pub struct MockLedger {
    infos: Mutex<HashMap<String, AddressInfo>>,
    transfers: Mutex<HashMap<String, Vec<Transfer>>>,
    failures: Mutex<HashMap<String, FetchErrorKind>>,
    transfer_queries: Mutex<HashMap<String, u64>>,
    next_block: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            next_block: AtomicU64::new(1),
            ..Self::default()
        }
    }

    pub fn set_info(&self, address: &str, balance: f64, tx_count: u64) {
        self.infos.lock().unwrap().insert(
            address.to_string(),
            AddressInfo {
                balance,
                tx_count,
                is_contract: false,
            },
        );
    }

    pub fn add_transfer(&self, from: &str, to: &str, amount: f64) {
        let block = self.next_block.fetch_add(1, Ordering::Relaxed);
        let transfer = Transfer {
            hash: format!("0xhash{:04}", block),
            block,
            timestamp: 1_700_000_000 + block,
            from: from.to_string(),
            to: to.to_string(),
            asset: Asset::Native,
            amount,
        };
        let mut map = self.transfers.lock().unwrap();
        map.entry(from.to_string()).or_default().push(transfer.clone());
        map.entry(to.to_string()).or_default().push(transfer);
    }

    pub fn fail_with(&self, address: &str, kind: FetchErrorKind) {
        self.failures
            .lock()
            .unwrap()
            .insert(address.to_string(), kind);
    }

    pub fn clear_failure(&self, address: &str) {
        self.failures.lock().unwrap().remove(address);
    }

    /// How many transfer queries hit `address`; one per expansion of it
    pub fn transfer_queries_for(&self, address: &str) -> u64 {
        *self
            .transfer_queries
            .lock()
            .unwrap()
            .get(address)
            .unwrap_or(&0)
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    async fn address_info(&self, address: &str) -> FetchResult<AddressInfo> {
        if let Some(kind) = self.failures.lock().unwrap().get(address) {
            return Err(FetchError::new(*kind, "scripted mock failure"));
        }
        Ok(self
            .infos
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(AddressInfo {
                balance: 0.0,
                tx_count: 0,
                is_contract: false,
            }))
    }

    async fn transfers(&self, address: &str, direction: Direction) -> FetchResult<Vec<Transfer>> {
        *self
            .transfer_queries
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert(0) += 1;

        if let Some(kind) = self.failures.lock().unwrap().get(address) {
            return Err(FetchError::new(*kind, "scripted mock failure"));
        }

        let all = self
            .transfers
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();

        Ok(all
            .into_iter()
            .filter(|t| {
                (direction.wants_outflows() && t.is_outflow_of(address))
                    || (direction.wants_inflows() && t.is_inflow_of(address))
            })
            .collect())
    }
}
