//! Explorer Client Module - Etherscan v2 style API
//!
//! The one place upstream response variance is normalized: field names,
//! decimal scales, pagination, throttling responses. Every request
//! passes the shared rate limiter first. No retries here - the
//! orchestrating layer decides whether a failure is worth retrying.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::config::ClientConfig;
use crate::models::errors::{ConfigError, FetchError, FetchResult};
use crate::models::types::{normalize_address, AddressInfo, Asset, Direction, Transfer};
use crate::providers::limiter::RateLimiter;
use crate::providers::ledger::LedgerSource;
use crate::utils::constants::{NATIVE_DECIMALS, USER_AGENT as USER_AGENT_CONST};

/// Explorer envelope for `module=account` actions
#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// Explorer envelope for `module=proxy` actions (JSON-RPC passthrough)
#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    result: Option<serde_json::Value>,
    error: Option<ProxyError>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    code: i64,
    message: String,
}

/// One upstream transfer row; `tokentx` rows carry the token fields.
/// Everything is a string upstream, and fields go missing - defaults
/// keep a partial row from killing the whole page.
#[derive(Debug, Clone, Deserialize)]
struct RawTransfer {
    #[serde(default)]
    hash: String,
    #[serde(default, rename = "blockNumber")]
    block_number: String,
    #[serde(default, rename = "timeStamp")]
    time_stamp: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default, rename = "tokenSymbol")]
    token_symbol: Option<String>,
    #[serde(default, rename = "tokenDecimal")]
    token_decimal: Option<String>,
}

/// Explorer-backed `LedgerSource`
pub struct EtherscanClient {
    http: reqwest::Client,
    config: ClientConfig,
    limiter: Arc<RateLimiter>,
}

impl EtherscanClient {
    pub fn new(config: ClientConfig, limiter: Arc<RateLimiter>) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|e| ConfigError::invalid("http client", e))?;

        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    /// `module=account` call. Acquires the limiter, maps throttling and
    /// transport failures to typed `FetchError`s.
    async fn account_call(
        &self,
        action: &str,
        address: &str,
        extra: &[(&str, String)],
    ) -> FetchResult<serde_json::Value> {
        self.limiter.acquire().await;

        let mut params: Vec<(&str, String)> = vec![
            ("chainid", self.config.chain_id.to_string()),
            ("module", "account".to_string()),
            ("action", action.to_string()),
            ("address", address.to_string()),
        ];
        params.extend(extra.iter().cloned());
        if !self.config.api_key.is_empty() {
            params.push(("apikey", self.config.api_key.clone()));
        }

        let resp = self
            .http
            .get(&self.config.api_url)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(FetchError::rate_limited());
        }
        if !status.is_success() {
            return Err(FetchError::upstream(format!("HTTP error: {}", status)));
        }

        let envelope: AccountEnvelope = resp.json().await.map_err(FetchError::from)?;
        if envelope.status != "1" && envelope.message != "OK" {
            // "No transactions found" is a valid empty result, not an error
            if envelope.message.contains("No transactions found") {
                return Ok(serde_json::Value::Array(Vec::new()));
            }
            let detail = envelope
                .result
                .as_str()
                .unwrap_or_default()
                .to_string();
            if detail.to_lowercase().contains("rate limit") {
                return Err(FetchError::rate_limited());
            }
            return Err(FetchError::upstream(format!(
                "{}: {}",
                envelope.message, detail
            )));
        }
        Ok(envelope.result)
    }

    /// `module=proxy` call (JSON-RPC passthrough); returns the hex result
    async fn proxy_call(&self, action: &str, address: &str) -> FetchResult<String> {
        self.limiter.acquire().await;

        let mut params: Vec<(&str, String)> = vec![
            ("chainid", self.config.chain_id.to_string()),
            ("module", "proxy".to_string()),
            ("action", action.to_string()),
            ("address", address.to_string()),
            ("tag", "latest".to_string()),
        ];
        if !self.config.api_key.is_empty() {
            params.push(("apikey", self.config.api_key.clone()));
        }

        let resp = self
            .http
            .get(&self.config.api_url)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(FetchError::rate_limited());
        }
        if !status.is_success() {
            return Err(FetchError::upstream(format!("HTTP error: {}", status)));
        }

        let envelope: ProxyEnvelope = resp.json().await.map_err(FetchError::from)?;
        if let Some(err) = envelope.error {
            return Err(FetchError::upstream(format!(
                "RPC error: {} (code: {})",
                err.message, err.code
            )));
        }
        envelope
            .result
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| FetchError::parse("No result in proxy response"))
    }

    /// Fetch every page of one account action, normalizing as we go
    async fn fetch_pages(&self, action: &str, address: &str) -> FetchResult<Vec<Transfer>> {
        let is_token = action == "tokentx";
        let mut out = Vec::new();

        for page in 1..=self.config.max_pages {
            let extra = [
                ("startblock", "0".to_string()),
                ("endblock", "99999999".to_string()),
                ("page", page.to_string()),
                ("offset", self.config.page_size.to_string()),
                ("sort", "asc".to_string()),
            ];
            let result = self.account_call(action, address, &extra).await?;
            let raws: Vec<RawTransfer> =
                serde_json::from_value(result).map_err(FetchError::from)?;
            let fetched = raws.len();

            out.extend(
                raws.into_iter()
                    .filter_map(|raw| normalize_raw(raw, is_token, &self.config.tracked_assets)),
            );

            if fetched < self.config.page_size {
                return Ok(out);
            }
        }

        warn!(
            "⚠️ Transfer history truncated for {} after {} pages of {}",
            address, self.config.max_pages, action
        );
        Ok(out)
    }
}

/// Turn one upstream row into a normalized `Transfer`.
/// Returns `None` for rows not worth emitting: missing counterparty
/// (contract creation), zero value, or an untracked token.
fn normalize_raw(raw: RawTransfer, is_token: bool, tracked_assets: &[String]) -> Option<Transfer> {
    let from = normalize_address(&raw.from);
    let to = normalize_address(&raw.to);
    if from.is_empty() || to.is_empty() {
        return None;
    }

    let (asset, decimals) = if is_token {
        let symbol = raw.token_symbol.unwrap_or_default();
        if symbol.is_empty() {
            return None;
        }
        if !tracked_assets.is_empty() && !tracked_assets.iter().any(|s| s == &symbol) {
            return None;
        }
        let decimals = raw
            .token_decimal
            .as_deref()
            .and_then(|d| d.parse::<u32>().ok())
            .unwrap_or(NATIVE_DECIMALS);
        (Asset::Token { symbol }, decimals)
    } else {
        (Asset::Native, NATIVE_DECIMALS)
    };

    let minor_units: u128 = raw.value.parse().unwrap_or(0);
    let amount = minor_units as f64 / 10f64.powi(decimals as i32);
    if amount <= 0.0 {
        return None;
    }

    Some(Transfer {
        hash: raw.hash,
        block: raw.block_number.parse().unwrap_or(0),
        timestamp: raw.time_stamp.parse().unwrap_or(0),
        from,
        to,
        asset,
        amount,
    })
}

/// Keep only transfers pointing the requested way relative to `address`
fn filter_direction(transfers: Vec<Transfer>, address: &str, direction: Direction) -> Vec<Transfer> {
    transfers
        .into_iter()
        .filter(|t| {
            (direction.wants_outflows() && t.is_outflow_of(address))
                || (direction.wants_inflows() && t.is_inflow_of(address))
        })
        .collect()
}

fn parse_hex_u64(hex: &str) -> FetchResult<u64> {
    let trimmed = hex.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| FetchError::parse(format!("Bad hex quantity {:?}: {}", hex, e)))
}

#[async_trait]
impl LedgerSource for EtherscanClient {
    async fn address_info(&self, address: &str) -> FetchResult<AddressInfo> {
        let address = normalize_address(address);

        let balance_raw = self
            .account_call("balance", &address, &[("tag", "latest".to_string())])
            .await?;
        let wei: u128 = balance_raw
            .as_str()
            .unwrap_or_default()
            .parse()
            .map_err(|e| FetchError::parse(format!("Bad balance: {}", e)))?;
        let balance = wei as f64 / 10f64.powi(NATIVE_DECIMALS as i32);

        let tx_count = parse_hex_u64(&self.proxy_call("eth_getTransactionCount", &address).await?)?;

        let code = self.proxy_call("eth_getCode", &address).await?;
        let is_contract = code != "0x" && !code.is_empty();

        debug!(
            "📥 {}: balance {:.6}, {} txs, contract={}",
            address, balance, tx_count, is_contract
        );

        Ok(AddressInfo {
            balance,
            tx_count,
            is_contract,
        })
    }

    async fn transfers(&self, address: &str, direction: Direction) -> FetchResult<Vec<Transfer>> {
        let address = normalize_address(address);

        let mut all = self.fetch_pages("txlist", &address).await?;
        all.extend(self.fetch_pages("tokentx", &address).await?);
        // Merged pages must come back deterministic for the classifier
        all.sort_by(|a, b| {
            (a.block, a.timestamp, &a.hash).cmp(&(b.block, b.timestamp, &b.hash))
        });

        Ok(filter_direction(all, &address, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(from: &str, to: &str, value: &str) -> RawTransfer {
        RawTransfer {
            hash: "0xabc".into(),
            block_number: "100".into(),
            time_stamp: "1700000000".into(),
            from: from.into(),
            to: to.into(),
            value: value.into(),
            token_symbol: None,
            token_decimal: None,
        }
    }

    #[test]
    fn test_normalize_native_scales_wei() {
        let t = normalize_raw(raw("0xA", "0xB", "1500000000000000000"), false, &[]).unwrap();
        assert_eq!(t.asset, Asset::Native);
        assert!((t.amount - 1.5).abs() < 1e-9);
        assert_eq!(t.from, "0xa");
        assert_eq!(t.block, 100);
    }

    #[test]
    fn test_normalize_token_uses_own_decimal_scale() {
        let mut r = raw("0xA", "0xB", "2500000");
        r.token_symbol = Some("USDT".into());
        r.token_decimal = Some("6".into());
        let t = normalize_raw(r, true, &["USDT".to_string()]).unwrap();
        assert_eq!(t.asset, Asset::Token { symbol: "USDT".into() });
        assert!((t.amount - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_drops_untracked_token() {
        let mut r = raw("0xA", "0xB", "1000000");
        r.token_symbol = Some("SHIB".into());
        r.token_decimal = Some("6".into());
        assert!(normalize_raw(r, true, &["USDT".to_string()]).is_none());
    }

    #[test]
    fn test_normalize_empty_tracked_list_keeps_all_tokens() {
        let mut r = raw("0xA", "0xB", "1000000");
        r.token_symbol = Some("SHIB".into());
        r.token_decimal = Some("6".into());
        assert!(normalize_raw(r, true, &[]).is_some());
    }

    #[test]
    fn test_normalize_drops_contract_creation_and_zero_value() {
        assert!(normalize_raw(raw("0xA", "", "100"), false, &[]).is_none());
        assert!(normalize_raw(raw("0xA", "0xB", "0"), false, &[]).is_none());
    }

    #[test]
    fn test_normalize_tolerates_partial_fields() {
        let mut r = raw("0xA", "0xB", "not-a-number");
        r.block_number = "".into();
        // Unparseable value collapses to zero and the row is dropped,
        // not a crash
        assert!(normalize_raw(r, false, &[]).is_none());

        let mut r2 = raw("0xA", "0xB", "1000000000000000000");
        r2.time_stamp = "garbage".into();
        let t = normalize_raw(r2, false, &[]).unwrap();
        assert_eq!(t.timestamp, 0);
    }

    #[test]
    fn test_filter_direction() {
        let transfers = vec![
            normalize_raw(raw("0xme", "0xout", "1000000000000000000"), false, &[]).unwrap(),
            normalize_raw(raw("0xin", "0xme", "1000000000000000000"), false, &[]).unwrap(),
        ];
        let fwd = filter_direction(transfers.clone(), "0xme", Direction::Forward);
        assert_eq!(fwd.len(), 1);
        assert!(fwd[0].is_outflow_of("0xme"));

        let back = filter_direction(transfers.clone(), "0xme", Direction::Backward);
        assert_eq!(back.len(), 1);
        assert!(back[0].is_inflow_of("0xme"));

        let both = filter_direction(transfers, "0xme", Direction::Both);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert_eq!(parse_hex_u64("0x").unwrap(), 0);
        assert!(parse_hex_u64("0xzz").is_err());
    }
}
