//! Constants Module - Single Source of Truth
//!
//! Every tunable default and curated table used across the engine lives
//! here. No hardcoded values in other modules!

use crate::models::types::EndpointKind;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "flowtrace";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "flowtrace/0.1.0";

// ============================================
// LEDGER API CONSTANTS
// ============================================

/// Default explorer API endpoint (Etherscan v2 style)
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Default chain id for explorer queries (mainnet)
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Default timeout for explorer/RPC requests (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default aggregate request rate (requests per rolling second),
/// shared by every worker through one limiter
pub const DEFAULT_RATE_LIMIT: f64 = 5.0;

/// Transfers fetched per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Page cap per transfer query; hitting it logs a truncation warning
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Decimal scale of the native coin
pub const NATIVE_DECIMALS: u32 = 18;

/// Token symbols tracked by default (empty list in config = track all)
pub const DEFAULT_TRACKED_ASSETS: [&str; 3] = ["USDT", "USDC", "DAI"];

/// Default TTL for cached snapshots (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ============================================
// TRAVERSAL DEFAULTS
// ============================================

/// Default hop budget for an expansion
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default dust threshold, in whole native units
pub const DEFAULT_MIN_VALUE: f64 = 0.1;

/// Deposit-funnel heuristic: minimum inflow count
pub const DEFAULT_FUNNEL_MIN_INFLOWS: usize = 1;

/// Deposit-funnel heuristic: maximum inflow count
/// (busier addresses are hubs, not funnels)
pub const DEFAULT_FUNNEL_MAX_INFLOWS: usize = 20;

/// Default worker cap for batch tracing
pub const DEFAULT_MAX_WORKERS: usize = 5;

// ============================================
// MONITOR DAEMON DEFAULTS
// ============================================

/// Seconds between watchlist polling cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Minimum absolute balance change (native units) that raises an alert
pub const DEFAULT_BALANCE_THRESHOLD: f64 = 0.01;

/// Balance delta past which severity escalates to high
pub const DEFAULT_HIGH_BALANCE_DELTA: f64 = 10.0;

/// Transaction-count delta past which severity escalates to high
pub const DEFAULT_HIGH_TX_DELTA: i64 = 5;

/// Alert log cap; oldest entries are evicted past this
pub const DEFAULT_MAX_ALERTS: usize = 500;

/// Watchlist is reloaded from disk every this many cycles
pub const DEFAULT_RELOAD_CYCLES: u64 = 10;

/// A one-line status summary is logged every this many cycles
pub const DEFAULT_STATUS_CYCLES: u64 = 10;

/// Persisted snapshot-map file name
pub const STATE_FILE: &str = "address_state.json";

/// Persisted alert-log file name
pub const ALERTS_FILE: &str = "alerts.json";

/// Human-readable summary file name
pub const SUMMARY_FILE: &str = "latest_summary.json";

// ============================================
// CURATED ENDPOINT TABLE
// ============================================

/// Built-in known-endpoint table: exchange hot wallets, mixers and DEX
/// routers labeled by public explorers. Operators extend or replace this
/// via a JSON table file; entries here are the fallback.
pub fn default_known_endpoints() -> Vec<(&'static str, &'static str, EndpointKind)> {
    vec![
        // Exchange hot wallets
        ("0x28c6c06298d514db089934071355e5743bf21d60", "Binance 14", EndpointKind::Exchange),
        ("0x21a31ee1afc51d94c2efccaa2092ad1028285549", "Binance", EndpointKind::Exchange),
        ("0xdfd5293d8e347dfe59e90efd55b2956a1343963d", "Binance 8", EndpointKind::Exchange),
        ("0x0d0707963952f2fba59dd06f2b425ace40b492fe", "Gate.io Deposit", EndpointKind::Exchange),
        ("0x1c4b70a3968436b9a0a9cf5205c787eb81bb558c", "Gate.io Hot Wallet", EndpointKind::Exchange),
        ("0x39f6a6c85d39d5abad8a398310c52e7c374f2ba3", "WhiteBIT Hot Wallet", EndpointKind::Exchange),
        ("0x5a52e96bacdabb82fd05763e25335261b270efcb", "WhiteBIT", EndpointKind::Exchange),
        ("0x17fbbd5bf41693e6bd534a1bc7ca412401d7ce6e", "Bybit Deposit", EndpointKind::Exchange),
        ("0xf89d7b9c864f589bbf53a82105107622b35eaa40", "Bybit Hot Wallet", EndpointKind::Exchange),
        ("0x83c41363cbee0081dab75cb841fa24f3db46627e", "KuCoin Deposit", EndpointKind::Exchange),
        ("0x46340b20830761efd32832a74d7169b29feb9758", "Huobi", EndpointKind::Exchange),
        ("0x5041ed759dd4afc3a72b8192c143f72f4724081a", "OKX", EndpointKind::Exchange),
        ("0x6262998ced04146fa42253a5c0af90ca02dfd2a3", "Crypto.com", EndpointKind::Exchange),
        // Mixers
        ("0xd90e2f925da726b50c4ed8d0fb90ad053324f31b", "Tornado Cash Router", EndpointKind::Mixer),
        ("0xa160cdab225685da1d56aa342ad8841c3b53f291", "Tornado Cash 100 ETH", EndpointKind::Mixer),
        // DEX routers
        ("0x7a250d5630b4cf539739df2c5dacb4c659f2488d", "Uniswap V2 Router", EndpointKind::Dex),
        ("0xe592427a0aece92de3edee1f18e0157c05861564", "Uniswap V3 Router", EndpointKind::Dex),
        ("0x1111111254eeb25477b68fb85ed929f73a960582", "1inch Router", EndpointKind::Dex),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_are_normalized() {
        for (addr, label, _) in default_known_endpoints() {
            assert_eq!(addr, addr.to_lowercase(), "{} must be lowercase", label);
            assert!(addr.starts_with("0x"));
        }
    }

    #[test]
    fn test_funnel_bounds_sane() {
        assert!(DEFAULT_FUNNEL_MIN_INFLOWS >= 1);
        assert!(DEFAULT_FUNNEL_MAX_INFLOWS > DEFAULT_FUNNEL_MIN_INFLOWS);
    }
}
