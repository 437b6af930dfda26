//! Ledger Source Abstraction
//!
//! The engine depends only on this capability: per address, a balance,
//! a transaction count and a list of value transfers. Concrete upstreams
//! (explorer APIs, RPC nodes) live behind it, as do the in-memory mocks
//! the test suite injects.

use async_trait::async_trait;

use crate::models::errors::FetchResult;
use crate::models::types::{AddressInfo, Direction, Transfer};

/// Capability interface over a public ledger.
///
/// Implementations normalize upstream variance (field names, decimal
/// scales, pagination) before returning; callers never see
/// provider-specific shapes. Transient failures surface as typed
/// `FetchError`s, never panics, and no implementation retries
/// internally - retries belong to the orchestrating layer so limiter
/// accounting stays correct.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Current balance, transaction count and contract flag
    async fn address_info(&self, address: &str) -> FetchResult<AddressInfo>;

    /// Value transfers touching `address`, already scaled to whole
    /// units, filtered to the requested direction, ordered by block
    async fn transfers(&self, address: &str, direction: Direction) -> FetchResult<Vec<Transfer>>;
}
