//! Centralized Error Handling Module
//!
//! Three error families, matching how failures propagate:
//! - `FetchError`: transient ledger-source failures, absorbed per node
//! - `ConfigError`: invalid startup configuration, fatal before any run
//! - `PersistenceError`: state-file write failures, retried next cycle

use std::fmt;

/// Failure kinds for one ledger-source call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Request exceeded the configured timeout
    Timeout,
    /// Upstream signalled throttling (HTTP 429 or equivalent)
    RateLimited,
    /// Upstream returned an error response or bad status
    UpstreamError,
    /// Response arrived but could not be decoded
    ParseError,
}

impl FetchErrorKind {
    /// Get string representation of the error kind (for logging)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "FETCH_TIMEOUT",
            Self::RateLimited => "FETCH_RATE_LIMITED",
            Self::UpstreamError => "FETCH_UPSTREAM_ERROR",
            Self::ParseError => "FETCH_PARSE_ERROR",
        }
    }

    /// Check if a caller could reasonably retry this failure.
    /// Retries belong to the orchestrating layer, never the client.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::UpstreamError)
    }
}

/// A failed ledger-source call. Never crashes a traversal: the engine
/// records the node as `fetch_failed` and moves on.
#[derive(Debug)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: FetchErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Request timed out
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, msg)
    }

    /// Upstream throttled us (HTTP 429)
    pub fn rate_limited() -> Self {
        Self::new(FetchErrorKind::RateLimited, "Rate limited (HTTP 429)")
    }

    /// Upstream rejected or failed the request
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::UpstreamError, msg)
    }

    /// Response body could not be decoded
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ParseError, msg)
    }

    pub fn kind_str(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::with_source(FetchErrorKind::Timeout, "Request timeout", err)
        } else if err.is_connect() {
            Self::with_source(FetchErrorKind::UpstreamError, "Connection failed", err)
        } else if err.is_decode() {
            Self::with_source(FetchErrorKind::ParseError, "Response decode failed", err)
        } else {
            let msg = err.to_string();
            Self::with_source(FetchErrorKind::UpstreamError, msg, err)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(FetchErrorKind::ParseError, "JSON parse error", err)
    }
}

/// Ledger-source Result type
pub type FetchResult<T> = Result<T, FetchError>;

// ============================================
// Configuration errors (fatal at startup)
// ============================================

/// Invalid or missing startup configuration: watchlist, endpoint table,
/// malformed thresholds. Aborts the process before any traversal runs.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn missing(what: &str) -> Self {
        Self::new(format!("Missing configuration: {}", what))
    }

    pub fn invalid(what: &str, detail: impl fmt::Display) -> Self {
        Self::new(format!("Invalid {}: {}", what, detail))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[CONFIG_ERROR] {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================
// Persistence errors (logged, retried next cycle)
// ============================================

/// A failed state/alert-log write. The daemon logs it and retries on the
/// next cycle; it never crashes the loop.
#[derive(Debug)]
pub struct PersistenceError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PERSISTENCE_ERROR] {}", self.message)
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("IO error", err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON serialization error", err)
    }
}
