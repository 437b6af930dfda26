//! In-Memory Snapshot Cache Module
//!
//! Thread-safe TTL cache over address snapshots, so overlapping batch
//! runs inside one process do not refetch the same address within the
//! TTL. DashMap keeps concurrent access lock-free for callers. The
//! monitor daemon bypasses this cache - it must see fresh balances.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::types::{normalize_address, AddressSnapshot};
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

#[derive(Clone, Debug)]
struct CacheEntry {
    snapshot: AddressSnapshot,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// TTL snapshot cache keyed by normalized address
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the cached snapshot when present and not expired
    pub fn get(&self, address: &str) -> Option<AddressSnapshot> {
        let key = normalize_address(address);

        if let Some(entry) = self.store.get(&key) {
            if entry.is_expired() {
                drop(entry); // release the shard read lock before removal
                self.store.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✅ CACHE HIT: {}", key);
                Some(entry.snapshot.clone())
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("📭 CACHE MISS: {}", key);
            None
        }
    }

    /// Store a snapshot. Failed fetches are never cached - a flagged
    /// node must be retried on the next run.
    pub fn set(&self, snapshot: AddressSnapshot) {
        if snapshot.fetch_failed {
            return;
        }
        let key = normalize_address(&snapshot.address);
        self.store.insert(
            key,
            CacheEntry {
                snapshot,
                created_at: Instant::now(),
                ttl: self.ttl,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        before - self.store.len()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

/// Cache statistics for status reporting
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
