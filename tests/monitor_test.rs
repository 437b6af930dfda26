//! Integration tests for the watchlist monitor daemon

mod common;

use common::MockLedger;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flowtrace::{
    AddressClassifier, AlertSeverity, FetchErrorKind, FunnelConfig, KnownEndpoints,
    MonitorConfig, MonitorDaemon, Shutdown,
};

const WATCHED: &str = "0xaa00000000000000000000000000000000000001";

fn write_watchlist(dir: &std::path::Path, entries: &str) -> PathBuf {
    let path = dir.join("watchlist.json");
    std::fs::write(&path, entries).unwrap();
    path
}

fn single_entry_watchlist(dir: &std::path::Path) -> PathBuf {
    write_watchlist(
        dir,
        &format!(r#"[{{"address": "{}", "label": "suspect wallet", "priority": "high"}}]"#, WATCHED),
    )
}

fn test_config(state_dir: &std::path::Path, watchlist: PathBuf) -> MonitorConfig {
    let mut config = MonitorConfig::new(state_dir.to_path_buf(), watchlist);
    config.poll_interval = Duration::from_millis(10);
    config.balance_threshold = 0.01;
    config.high_balance_delta = 10.0;
    config.high_tx_delta = 5;
    config.max_workers = 2;
    config
}

fn daemon_with(
    ledger: Arc<MockLedger>,
    config: MonitorConfig,
) -> (MonitorDaemon, Arc<Shutdown>) {
    let classifier = Arc::new(AddressClassifier::new(
        KnownEndpoints::new(),
        FunnelConfig::default(),
    ));
    let shutdown = Arc::new(Shutdown::new());
    let daemon = MonitorDaemon::new(config, ledger, classifier, shutdown.clone()).unwrap();
    (daemon, shutdown)
}

#[tokio::test]
async fn scenario_e_small_balance_change_alerts_once() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 10.0, 3);

    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));

    // First cycle establishes the baseline, no alert
    let first = daemon.cycle().await;
    assert!(first.is_empty());

    ledger.set_info(WATCHED, 10.02, 3);
    let second = daemon.cycle().await;

    assert_eq!(second.len(), 1);
    let alert = &second[0];
    assert!((alert.balance_delta - 0.02).abs() < 1e-9);
    assert_eq!(alert.tx_count_delta, 0);
    assert_eq!(alert.severity, AlertSeverity::Medium);
    assert_eq!(alert.address, WATCHED);
    assert!((alert.current_balance - 10.02).abs() < 1e-9);
}

#[tokio::test]
async fn change_below_threshold_stays_quiet() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 10.0, 3);

    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));
    daemon.cycle().await;

    ledger.set_info(WATCHED, 10.005, 3);
    assert!(daemon.cycle().await.is_empty());
}

#[tokio::test]
async fn severity_escalates_past_secondary_thresholds() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 5.0, 0);

    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));
    daemon.cycle().await;

    // 15 native units out the door: high severity
    ledger.set_info(WATCHED, 20.0, 1);
    let alerts = daemon.cycle().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::High);

    // A burst of transactions alone also escalates
    ledger.set_info(WATCHED, 20.0, 8);
    let alerts = daemon.cycle().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].tx_count_delta, 7);
    assert_eq!(alerts[0].severity, AlertSeverity::High);
}

#[tokio::test]
async fn new_transactions_alone_raise_an_alert() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 3.0, 10);

    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));
    daemon.cycle().await;

    ledger.set_info(WATCHED, 3.0, 11);
    let alerts = daemon.cycle().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].tx_count_delta, 1);
    assert!((alerts[0].balance_delta).abs() < 1e-9);
}

#[tokio::test]
async fn alert_log_is_bounded_fifo() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 0.0, 0);

    let mut config = test_config(tmp.path(), watchlist);
    config.max_alerts = 3;
    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), config);
    daemon.cycle().await; // baseline

    // Five alerting cycles; the log must keep only the last three
    for tx in 1..=5u64 {
        ledger.set_info(WATCHED, 0.0, tx);
        let alerts = daemon.cycle().await;
        assert_eq!(alerts.len(), 1);
    }

    let log: Vec<_> = daemon.alert_log().collect();
    assert_eq!(log.len(), 3);
    // Oldest entries evicted: the survivors are the three latest deltas
    assert!(log.iter().all(|a| a.tx_count_delta == 1));
    assert!(log[0].timestamp <= log[2].timestamp);
}

#[tokio::test]
async fn state_survives_restart_and_gap_produces_one_delta() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 10.0, 0);

    {
        let (mut daemon, _shutdown) =
            daemon_with(ledger.clone(), test_config(tmp.path(), watchlist.clone()));
        daemon.cycle().await;
    } // daemon dropped, state persisted on disk

    // Balance moved twice while nothing was watching
    ledger.set_info(WATCHED, 17.0, 2);

    let (mut daemon, _shutdown) =
        daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));
    let alerts = daemon.cycle().await;

    // One larger delta across the gap, computed from persisted state
    assert_eq!(alerts.len(), 1);
    assert!((alerts[0].balance_delta - 7.0).abs() < 1e-9);
    assert_eq!(alerts[0].tx_count_delta, 2);
}

#[tokio::test]
async fn fetch_failure_keeps_prior_state() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 10.0, 0);

    let (mut daemon, _shutdown) = daemon_with(ledger.clone(), test_config(tmp.path(), watchlist));
    daemon.cycle().await; // baseline at 10.0

    // A flaky cycle must not fabricate a zero-balance delta
    ledger.fail_with(WATCHED, FetchErrorKind::Timeout);
    assert!(daemon.cycle().await.is_empty());

    ledger.clear_failure(WATCHED);
    ledger.set_info(WATCHED, 12.0, 0);
    let alerts = daemon.cycle().await;
    assert_eq!(alerts.len(), 1);
    // Delta computed against the pre-failure baseline
    assert!((alerts[0].balance_delta - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn state_files_written_atomically() {
    let tmp = tempfile::tempdir().unwrap();
    let state_dir = tmp.path().join("state");
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 1.0, 1);

    let (mut daemon, _shutdown) = daemon_with(ledger, test_config(&state_dir, watchlist));
    daemon.cycle().await;

    let state_file = state_dir.join("address_state.json");
    assert!(state_file.exists());
    // Parseable, and no temp droppings left behind
    let raw = std::fs::read_to_string(&state_file).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(parsed["snapshots"][WATCHED]["balance"].is_number());
    assert!(!state_dir.join("address_state.json.tmp").exists());
    assert!(state_dir.join("alerts.json").exists());
}

#[tokio::test]
async fn watchlist_reloads_periodically() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 1.0, 0);

    const SECOND: &str = "0xbb00000000000000000000000000000000000002";
    ledger.set_info(SECOND, 2.0, 0);

    let mut config = test_config(tmp.path(), watchlist.clone());
    config.reload_cycles = 1;
    let (mut daemon, _shutdown) = daemon_with(ledger, config);

    daemon.cycle().await;
    assert!(!daemon.state().snapshots.contains_key(SECOND));

    // Operator edits the file; the next cycle picks it up without restart
    std::fs::write(
        &watchlist,
        format!(
            r#"[
                {{"address": "{}", "label": "suspect wallet"}},
                {{"address": "{}", "label": "second wallet"}}
            ]"#,
            WATCHED, SECOND
        ),
    )
    .unwrap();

    daemon.cycle().await;
    assert!(daemon.state().snapshots.contains_key(SECOND));
}

#[tokio::test]
async fn run_loop_observes_shutdown_and_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let watchlist = single_entry_watchlist(tmp.path());
    let ledger = Arc::new(MockLedger::new());
    ledger.set_info(WATCHED, 1.0, 1);

    let (mut daemon, shutdown) = daemon_with(ledger, test_config(tmp.path(), watchlist));

    let trigger = shutdown.clone();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.trigger();
    });

    // Must return promptly once the signal lands, having persisted
    tokio::time::timeout(Duration::from_secs(5), daemon.run())
        .await
        .expect("daemon must stop on shutdown signal");
    stopper.await.unwrap();

    assert!(daemon.cycles_run() >= 1);
    assert!(tmp.path().join("address_state.json").exists());
}
