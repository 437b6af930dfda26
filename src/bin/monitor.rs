//! Flowtrace Monitor - watchlist daemon binary
//!
//! Runs the polling loop until Ctrl+C / SIGTERM, then finishes the
//! cycle in flight, persists state and exits.

use eyre::{eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use flowtrace::utils::constants::{APP_NAME, APP_VERSION};
use flowtrace::{
    AddressClassifier, ClientConfig, EtherscanClient, FunnelConfig, KnownEndpoints,
    MonitorConfig, MonitorDaemon, RateLimiter, Shutdown,
};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    eprintln!("🛰️ {} monitor v{}", APP_NAME, APP_VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let watchlist_path = flag(&args, "--watchlist")
        .or_else(|| std::env::var("FLOWTRACE_WATCHLIST").ok())
        .ok_or_else(|| eyre!("need --watchlist FILE (or FLOWTRACE_WATCHLIST)"))?;
    let state_dir = flag(&args, "--state-dir").unwrap_or_else(|| "monitor_state".to_string());

    let mut config = MonitorConfig::new(PathBuf::from(state_dir), PathBuf::from(watchlist_path));
    if let Some(interval) = flag(&args, "--interval") {
        let secs: u64 = interval.parse().map_err(|e| eyre!("bad --interval: {}", e))?;
        config.poll_interval = std::time::Duration::from_secs(secs);
    }
    if let Some(threshold) = flag(&args, "--threshold") {
        config.balance_threshold = threshold
            .parse()
            .map_err(|e| eyre!("bad --threshold: {}", e))?;
    }

    let endpoints = match std::env::var("FLOWTRACE_ENDPOINTS") {
        Ok(path) => KnownEndpoints::from_file(std::path::Path::new(&path))?,
        Err(_) => KnownEndpoints::builtin(),
    };
    let classifier = Arc::new(AddressClassifier::new(endpoints, FunnelConfig::default()));

    let client_config = ClientConfig::default();
    let limiter = Arc::new(RateLimiter::new(client_config.rate_limit));
    let client = Arc::new(EtherscanClient::new(client_config, limiter)?);

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n🛑 Shutdown requested, completing current cycle...");
                shutdown.trigger();
            }
        });
    }

    // A bad watchlist or endpoint table aborts here, before the loop
    let mut daemon = MonitorDaemon::new(config, client, classifier, shutdown)?;
    daemon.run().await;

    Ok(())
}

fn flag(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
