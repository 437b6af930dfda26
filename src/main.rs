//! Flowtrace CLI - trace a single address or batch-trace many
//!
//! Thin wrapper over the library: parses arguments, builds the context
//! (client + limiter + classifier), runs the engine and prints JSON.

use eyre::{eyre, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use flowtrace::models::TraceOptions;
use flowtrace::utils::constants::{APP_NAME, APP_VERSION, DEFAULT_MAX_WORKERS};
use flowtrace::{
    AddressClassifier, BatchTracer, ClientConfig, Direction, EtherscanClient, FunnelConfig,
    KnownEndpoints, RateLimiter, Shutdown, SnapshotCache, TraceEngine,
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

    eprintln!("🔎 {} v{} - fund-flow tracer", APP_NAME, APP_VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(|s| s.as_str()) {
        Some("trace") => run_trace(&args[1..]).await,
        Some("batch") => run_batch(&args[1..]).await,
        _ => {
            print_usage();
            Err(eyre!("expected a command: trace | batch"))
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  flowtrace trace <address> [--depth N] [--direction forward|backward|both]");
    eprintln!("                            [--min-value X] [--endpoints FILE] [--output FILE]");
    eprintln!("  flowtrace batch <addresses.json> [--workers N] [--depth N] [--min-value X]");
    eprintln!("                            [--endpoints FILE] [--output FILE]");
    eprintln!();
    eprintln!("Environment: FLOWTRACE_API_KEY, FLOWTRACE_API_URL, FLOWTRACE_CHAIN_ID,");
    eprintln!("             FLOWTRACE_RATE_LIMIT, FLOWTRACE_ENDPOINTS");
}

/// Value of `--name` in `args`, if present
fn flag(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// First argument that is not a flag or a flag value
fn positional(args: &[String]) -> Option<&String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = true;
            continue;
        }
        return Some(arg);
    }
    None
}

fn trace_options(args: &[String]) -> Result<TraceOptions> {
    let mut options = TraceOptions::default();
    if let Some(depth) = flag(args, "--depth") {
        options.max_depth = depth.parse().map_err(|e| eyre!("bad --depth: {}", e))?;
    }
    if let Some(direction) = flag(args, "--direction") {
        options.direction = Direction::parse(&direction)
            .ok_or_else(|| eyre!("bad --direction: {}", direction))?;
    }
    if let Some(min_value) = flag(args, "--min-value") {
        options.min_value = min_value
            .parse()
            .map_err(|e| eyre!("bad --min-value: {}", e))?;
    }
    Ok(options)
}

fn build_classifier(args: &[String]) -> Result<Arc<AddressClassifier>> {
    let endpoints = match flag(args, "--endpoints")
        .or_else(|| std::env::var("FLOWTRACE_ENDPOINTS").ok())
    {
        Some(path) => KnownEndpoints::from_file(Path::new(&path))?,
        None => KnownEndpoints::builtin(),
    };
    Ok(Arc::new(AddressClassifier::new(
        endpoints,
        FunnelConfig::default(),
    )))
}

fn build_client() -> Result<Arc<EtherscanClient>> {
    let config = ClientConfig::default();
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    Ok(Arc::new(EtherscanClient::new(config, limiter)?))
}

fn emit(args: &[String], payload: String) -> Result<()> {
    match flag(args, "--output") {
        Some(path) => {
            std::fs::write(&path, payload)?;
            eprintln!("💾 Results written to {}", path);
        }
        None => println!("{}", payload),
    }
    Ok(())
}

/// Wire Ctrl+C to the cooperative stop flag
fn spawn_ctrl_c(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Interrupt received, finishing current node...");
            shutdown.trigger();
        }
    });
}

async fn run_trace(args: &[String]) -> Result<()> {
    let address = positional(args).ok_or_else(|| eyre!("trace needs an address"))?;
    let options = trace_options(args)?;
    let classifier = build_classifier(args)?;
    let client = build_client()?;

    let shutdown = Arc::new(Shutdown::new());
    spawn_ctrl_c(shutdown.clone());

    let engine = TraceEngine::new(client, classifier).with_shutdown(shutdown);
    let graph = engine.expand(&[address.clone()], &options).await;

    emit(args, serde_json::to_string_pretty(&graph)?)
}

async fn run_batch(args: &[String]) -> Result<()> {
    let file = positional(args).ok_or_else(|| eyre!("batch needs an addresses.json file"))?;
    let raw = std::fs::read_to_string(file)?;
    let addresses: Vec<String> = serde_json::from_str(&raw)?;

    let workers = match flag(args, "--workers") {
        Some(w) => w.parse().map_err(|e| eyre!("bad --workers: {}", e))?,
        None => DEFAULT_MAX_WORKERS,
    };
    let options = trace_options(args)?;
    let classifier = build_classifier(args)?;
    let client = build_client()?;

    let shutdown = Arc::new(Shutdown::new());
    spawn_ctrl_c(shutdown.clone());

    let tracer = BatchTracer::new(client, classifier, workers)
        .with_cache(SnapshotCache::new())
        .with_shutdown(shutdown);
    let results = tracer.batch_expand(&addresses, options).await;

    // Per-item failures serialize as an error slot, not a failed batch
    let mut output = serde_json::Map::new();
    for (address, result) in results {
        let value = match result {
            Ok(graph) => serde_json::to_value(&graph)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        output.insert(address, value);
    }

    emit(args, serde_json::to_string_pretty(&serde_json::Value::Object(output))?)
}
