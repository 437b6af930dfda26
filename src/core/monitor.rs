//! Monitor Daemon Module
//!
//! Long-lived poll/diff/alert loop over an operator-supplied watchlist.
//! The persisted snapshot map is the sole source of truth for deltas: a
//! crash-and-restart reloads it and simply sees one larger delta across
//! the gap. Exactly one loop mutates the persisted state; external
//! readers get a consistent file because every write is
//! temp-file-then-rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::batch::BatchTracer;
use crate::core::classifier::AddressClassifier;
use crate::models::config::{load_watchlist, MonitorConfig};
use crate::models::errors::{ConfigError, PersistenceError};
use crate::models::types::{Address, AddressSnapshot, Alert, AlertSeverity, WatchlistEntry};
use crate::providers::ledger::LedgerSource;
use crate::utils::persist::{load_json, save_json_atomic};
use crate::utils::shutdown::Shutdown;

/// Daemon state persisted between cycles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorState {
    pub snapshots: HashMap<Address, AddressSnapshot>,
    pub last_check: Option<DateTime<Utc>>,
}

/// The watchlist monitor. One instance owns one polling loop.
pub struct MonitorDaemon {
    config: MonitorConfig,
    tracer: BatchTracer,
    watchlist: Vec<WatchlistEntry>,
    state: MonitorState,
    alerts: VecDeque<Alert>,
    shutdown: Arc<Shutdown>,
    cycles: u64,
}

impl MonitorDaemon {
    /// Startup: the watchlist must load (`ConfigError` is fatal here);
    /// prior state and alert log load best-effort - a missing or
    /// corrupt file just means a fresh baseline.
    pub fn new(
        config: MonitorConfig,
        ledger: Arc<dyn LedgerSource>,
        classifier: Arc<AddressClassifier>,
        shutdown: Arc<Shutdown>,
    ) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(&config.state_dir)
            .map_err(|e| ConfigError::invalid("state dir", e))?;

        let watchlist = load_watchlist(&config.watchlist_path)?;
        info!("👁️ Tracking {} addresses", watchlist.len());
        for entry in &watchlist {
            info!("   - {}: {}", entry.label, entry.address);
        }

        let state = match load_json::<MonitorState>(&config.state_file()) {
            Ok(Some(state)) => {
                info!("💾 Restored state for {} addresses", state.snapshots.len());
                state
            }
            Ok(None) => MonitorState::default(),
            Err(e) => {
                warn!("⚠️ State file unreadable, starting from a fresh baseline: {}", e);
                MonitorState::default()
            }
        };

        let mut alerts: VecDeque<Alert> = match load_json::<Vec<Alert>>(&config.alerts_file()) {
            Ok(Some(entries)) => entries.into(),
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("⚠️ Alert log unreadable, starting empty: {}", e);
                VecDeque::new()
            }
        };
        while alerts.len() > config.max_alerts {
            alerts.pop_front();
        }

        let tracer = BatchTracer::new(ledger, classifier, config.max_workers)
            .with_shutdown(shutdown.clone());

        Ok(Self {
            config,
            tracer,
            watchlist,
            state,
            alerts,
            shutdown,
            cycles: 0,
        })
    }

    /// Poll until the stop signal. The cycle in flight always completes
    /// and persists before the loop exits - never aborts mid-write.
    pub async fn run(&mut self) {
        info!(
            "🛰️ Monitor daemon starting: {} addresses, polling every {:?}",
            self.watchlist.len(),
            self.config.poll_interval
        );

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            self.cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = self.shutdown.wait() => break,
            }
        }

        if let Err(e) = self.persist() {
            warn!("⚠️ Final persist failed: {}", e);
        }
        info!("🛑 Monitor daemon stopped after {} cycles", self.cycles);
    }

    /// One full poll/diff/alert/persist cycle. Returns the alerts it
    /// emitted, which also land in the bounded log.
    pub async fn cycle(&mut self) -> Vec<Alert> {
        self.maybe_reload_watchlist();

        let addresses: Vec<String> = self.watchlist.iter().map(|e| e.address.clone()).collect();
        // Fresh balances every cycle: the analyze path runs uncached here
        let results = self.tracer.batch_analyze(&addresses, 0.0).await;

        let now = Utc::now();
        let mut emitted = Vec::new();

        for entry in &self.watchlist {
            let snapshot = match results.get(&entry.address) {
                Some(Ok(snapshot)) => snapshot.clone(),
                Some(Err(e)) => {
                    // Keep the prior snapshot; a failed fetch must not
                    // fabricate a zero-balance delta
                    warn!("⚠️ Fetch failed for {} ({}), keeping prior state: {}", entry.label, entry.address, e);
                    continue;
                }
                None => continue,
            };

            if let Some(prev) = self.state.snapshots.get(&entry.address) {
                if let Some(alert) = self.diff(entry, prev, &snapshot, now) {
                    info!(
                        "🚨 ALERT [{}] {}: {:+.4} balance, {} new txs",
                        alert.severity.as_str(),
                        entry.label,
                        alert.balance_delta,
                        alert.tx_count_delta
                    );
                    emitted.push(alert);
                }
            } else {
                debug!("baseline snapshot for {}", entry.address);
            }

            self.state.snapshots.insert(entry.address.clone(), snapshot);
        }

        self.state.last_check = Some(now);

        for alert in &emitted {
            self.alerts.push_back(alert.clone());
        }
        while self.alerts.len() > self.config.max_alerts {
            self.alerts.pop_front();
        }

        if let Err(e) = self.persist() {
            // Retried next cycle; state stays consistent in memory
            warn!("⚠️ Persist failed, will retry next cycle: {}", e);
        }

        if self.config.status_cycles > 0 && self.cycles % self.config.status_cycles == 0 {
            self.write_summary();
            info!(
                "📊 Status: {} addresses, {} cycles, {} alerts in log",
                self.watchlist.len(),
                self.cycles,
                self.alerts.len()
            );
        }

        self.cycles += 1;
        emitted
    }

    /// Every Kth cycle the watchlist file is re-read so operator edits
    /// land without a restart. Mid-run reload failure keeps the
    /// previous list - only startup treats a bad watchlist as fatal.
    fn maybe_reload_watchlist(&mut self) {
        if self.cycles == 0
            || self.config.reload_cycles == 0
            || self.cycles % self.config.reload_cycles != 0
        {
            return;
        }
        match load_watchlist(&self.config.watchlist_path) {
            Ok(entries) => {
                if entries != self.watchlist {
                    info!("🔄 Watchlist reloaded: {} entries", entries.len());
                }
                self.watchlist = entries;
            }
            Err(e) => warn!("⚠️ Watchlist reload failed, keeping previous: {}", e),
        }
    }

    /// Compare one snapshot against its persisted predecessor
    fn diff(
        &self,
        entry: &WatchlistEntry,
        prev: &AddressSnapshot,
        current: &AddressSnapshot,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let balance_delta = current.balance - prev.balance;
        let tx_count_delta = current.tx_count as i64 - prev.tx_count as i64;

        if balance_delta.abs() < self.config.balance_threshold && tx_count_delta <= 0 {
            return None;
        }

        let severity = if balance_delta.abs() >= self.config.high_balance_delta
            || tx_count_delta > self.config.high_tx_delta
        {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };

        Some(Alert {
            timestamp: now,
            address: entry.address.clone(),
            label: entry.label.clone(),
            balance_delta,
            tx_count_delta,
            current_balance: current.balance,
            severity,
        })
    }

    fn persist(&self) -> Result<(), PersistenceError> {
        save_json_atomic(&self.config.state_file(), &self.state)?;
        let alerts: Vec<&Alert> = self.alerts.iter().collect();
        save_json_atomic(&self.config.alerts_file(), &alerts)?;
        Ok(())
    }

    /// Human-readable snapshot of what the daemon currently sees
    fn write_summary(&self) {
        let addresses: Vec<serde_json::Value> = self
            .watchlist
            .iter()
            .filter_map(|entry| {
                self.state.snapshots.get(&entry.address).map(|s| {
                    serde_json::json!({
                        "address": entry.address,
                        "label": entry.label,
                        "balance": s.balance,
                        "tx_count": s.tx_count,
                        "classification": s.classification,
                    })
                })
            })
            .collect();

        let summary = serde_json::json!({
            "generated": Utc::now(),
            "cycles": self.cycles,
            "total_addresses": self.watchlist.len(),
            "addresses": addresses,
        });

        if let Err(e) = save_json_atomic(&self.config.summary_file(), &summary) {
            warn!("⚠️ Summary write failed: {}", e);
        }
    }

    /// Alerts currently held in the bounded log, oldest first
    pub fn alert_log(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }
}
