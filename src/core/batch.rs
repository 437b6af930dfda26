//! Batch Orchestrator Module
//!
//! Runs many independent traces concurrently. A semaphore caps the
//! worker count; every worker's fetches still funnel through the one
//! shared rate limiter, so the aggregate request rate stays bounded no
//! matter how wide the batch is. Each worker owns its VisitedSet -
//! cross-worker dedup is deliberately absent, only duplicate top-level
//! inputs are coalesced.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::core::classifier::AddressClassifier;
use crate::core::engine::{analyze_address, TraceEngine};
use crate::models::config::TraceOptions;
use crate::models::errors::FetchError;
use crate::models::types::{normalize_address, Address, AddressSnapshot, TraceGraph};
use crate::providers::ledger::LedgerSource;
use crate::utils::cache::SnapshotCache;
use crate::utils::shutdown::Shutdown;

/// Orchestrates concurrent single-seed traces and one-hop analyses
pub struct BatchTracer {
    ledger: Arc<dyn LedgerSource>,
    classifier: Arc<AddressClassifier>,
    max_workers: usize,
    cache: Option<SnapshotCache>,
    shutdown: Option<Arc<Shutdown>>,
}

impl BatchTracer {
    pub fn new(
        ledger: Arc<dyn LedgerSource>,
        classifier: Arc<AddressClassifier>,
        max_workers: usize,
    ) -> Self {
        Self {
            ledger,
            classifier,
            max_workers: max_workers.max(1),
            cache: None,
            shutdown: None,
        }
    }

    /// Serve repeat one-hop analyses from a TTL cache
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Observe a cooperative stop signal inside every worker
    pub fn with_shutdown(mut self, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Normalize and coalesce duplicate inputs, preserving order
    fn dedup(addresses: &[String]) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::new();
        for raw in addresses {
            let addr = normalize_address(raw);
            if !addr.is_empty() && !out.contains(&addr) {
                out.push(addr);
            }
        }
        out
    }

    /// Run one full expansion per input address.
    ///
    /// A per-item failure lands in that item's slot; the batch itself
    /// always completes. (Expansions absorb fetch errors into their
    /// graph, so an `Err` here means the worker task itself died.)
    pub async fn batch_expand(
        &self,
        addresses: &[String],
        options: TraceOptions,
    ) -> HashMap<Address, Result<TraceGraph, FetchError>> {
        let seeds = Self::dedup(addresses);
        info!(
            "🧵 Batch expand: {} unique seed(s), {} workers",
            seeds.len(),
            self.max_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let semaphore = semaphore.clone();
            let ledger = self.ledger.clone();
            let classifier = self.classifier.clone();
            let shutdown = self.shutdown.clone();
            let worker_seed = seed.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::upstream(format!("worker pool closed: {}", e)))?;

                let mut engine = TraceEngine::new(ledger, classifier);
                if let Some(shutdown) = shutdown {
                    engine = engine.with_shutdown(shutdown);
                }
                Ok::<TraceGraph, FetchError>(engine.expand(&[worker_seed], &options).await)
            });
            handles.push((seed, handle));
        }

        let mut results = HashMap::new();
        for (seed, handle) in handles {
            match handle.await {
                Ok(outcome) => {
                    if let Err(e) = &outcome {
                        warn!("⚠️ Batch worker error for {}: {}", seed, e);
                    }
                    results.insert(seed, outcome);
                }
                Err(join_err) => {
                    warn!("⚠️ Batch worker panicked for {}: {}", seed, join_err);
                    results.insert(
                        seed,
                        Err(FetchError::upstream(format!("worker died: {}", join_err))),
                    );
                }
            }
        }
        results
    }

    /// One-hop analysis of each input address: snapshot + classification,
    /// no traversal. Per-item failures land in their own slot.
    pub async fn batch_analyze(
        &self,
        addresses: &[String],
        min_value: f64,
    ) -> HashMap<Address, Result<AddressSnapshot, FetchError>> {
        let targets = Self::dedup(addresses);
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(targets.len());

        for address in targets {
            let semaphore = semaphore.clone();
            let ledger = self.ledger.clone();
            let classifier = self.classifier.clone();
            let cache = self.cache.clone();
            let worker_address = address.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::upstream(format!("worker pool closed: {}", e)))?;

                if let Some(cache) = &cache {
                    if let Some(snapshot) = cache.get(&worker_address) {
                        return Ok(snapshot);
                    }
                }

                let analyzed =
                    analyze_address(ledger.as_ref(), &classifier, &worker_address, min_value)
                        .await?;
                if let Some(cache) = &cache {
                    cache.set(analyzed.snapshot.clone());
                }
                Ok::<AddressSnapshot, FetchError>(analyzed.snapshot)
            });
            handles.push((address, handle));
        }

        let mut results = HashMap::new();
        for (address, handle) in handles {
            match handle.await {
                Ok(outcome) => {
                    if let Err(e) = &outcome {
                        warn!("⚠️ Analysis failed for {}: {}", address, e);
                    }
                    results.insert(address, outcome);
                }
                Err(join_err) => {
                    warn!("⚠️ Batch worker panicked for {}: {}", address, join_err);
                    results.insert(
                        address,
                        Err(FetchError::upstream(format!("worker died: {}", join_err))),
                    );
                }
            }
        }
        results
    }
}
