//! # Bot Configuration Module
//!
//! This module defines configuration structures for the clinic bot,
//! including backend access, circuit breaker settings and state expiry.

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

// Constants for bot configuration
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Circuit breaker configuration for backend calls
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// Time the breaker stays open before letting a call through, in seconds
    pub reset_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_secs: 60, // 1 minute
        }
    }
}

/// Clinic REST API access settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, including the API prefix (e.g. `http://host:8000/api/v1`)
    pub base_url: String,
    /// Timeout applied to every outbound request in seconds
    pub request_timeout_secs: u64,
    /// Circuit breaker settings
    pub breaker: BreakerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            breaker: BreakerConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Top-level configuration for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub telegram_token: String,
    /// Backend settings
    pub api: ApiConfig,
    /// Sessions older than this are treated as logged out (disabled when `None`)
    pub session_ttl: Option<Duration>,
    /// Booking drafts idle longer than this are discarded (disabled when `None`)
    pub draft_ttl: Option<Duration>,
    /// Language used when the Telegram user has none we support
    pub default_language: String,
    pub log_format: LogFormat,
}

impl BotConfig {
    /// Build the configuration from process environment variables.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let defaults = ApiConfig::default();
        let api = ApiConfig {
            base_url: lookup("CLINIC_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            request_timeout_secs: parse_var(&lookup, "CLINIC_API_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            breaker: BreakerConfig {
                failure_threshold: parse_var(&lookup, "BREAKER_THRESHOLD")?
                    .unwrap_or(defaults.breaker.failure_threshold),
                reset_secs: parse_var(&lookup, "BREAKER_RESET_SECS")?
                    .unwrap_or(defaults.breaker.reset_secs),
            },
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            telegram_token,
            api,
            session_ttl: parse_var(&lookup, "SESSION_TTL_SECS")?.map(Duration::from_secs),
            draft_ttl: parse_var(&lookup, "DRAFT_TTL_SECS")?.map(Duration::from_secs),
            default_language: lookup("DEFAULT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            log_format,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(None),
    }
}
