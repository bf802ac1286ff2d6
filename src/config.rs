use crate::error::{AppError, Result};

/// Payout notification retry schedule in milliseconds. Applied on transport
/// failure or HTTP >= 500; 4xx responses are never retried.
pub const PAYOUT_RETRY_BACKOFF_MS: &[u64] = &[100, 400, 1600];

/// Deadline for the storage ping performed by the readiness probe (seconds).
pub const READYZ_PING_TIMEOUT_SECS: u64 = 1;

/// How long in-flight work may drain after a shutdown signal (seconds).
pub const SHUTDOWN_DEADLINE_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Global per-request timeout for the HTTP server (HTTP_TIMEOUT, seconds).
    pub http_timeout_secs: u64,
    pub log_level: String,
    pub db_path: String,
    pub payout_url: String,
    pub payout_timeout_secs: u64,
    pub event_source_url: String,
    pub event_source_timeout_secs: u64,
    /// How often the syncer polls the upstream source (EVENT_SYNC_INTERVAL, seconds).
    pub sync_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_port: std::env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("HTTP_PORT must be a valid port number".to_string()))?,
            http_timeout_secs: parse_secs("HTTP_TIMEOUT", 60)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: require("DB_PATH")?,
            payout_url: require("PAYOUT_SVC_URL")?,
            payout_timeout_secs: parse_secs("PAYOUT_SVC_TIMEOUT", 3)?,
            event_source_url: require("EVENT_SOURCE_URL")?,
            event_source_timeout_secs: parse_secs("EVENT_SOURCE_TIMEOUT", 10)?,
            sync_interval_secs: parse_secs("EVENT_SYNC_INTERVAL", 300)?,
        })
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} must be set")))
}

fn parse_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{key} must be a number of seconds"))),
    }
}
