//! Configuration from environment variables

use crate::gateway::{AnalysisVariant, RetryPolicy};
use crate::llm::DEFAULT_API_BASE;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_ANALYSIS_THRESHOLD: usize = 6;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings for the conversation gateway
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_keys: Vec<String>,
    pub api_base: String,
    pub chat_model: String,
    pub analysis_model: String,
    pub analysis_variant: AnalysisVariant,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            analysis_variant: AnalysisVariant::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

// Keys stay out of Debug output
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_keys", &self.api_keys.len())
            .field("api_base", &self.api_base)
            .field("chat_model", &self.chat_model)
            .field("analysis_model", &self.analysis_model)
            .field("analysis_variant", &self.analysis_variant)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    /// Exchanged messages after which a send triggers the analysis
    pub analysis_threshold: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = GatewayConfig::default();

        let analysis_variant = match get("MENTRA_ANALYSIS_VARIANT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "MENTRA_ANALYSIS_VARIANT",
                    value,
                })?,
            None => defaults.analysis_variant,
        };

        let max_attempts: u32 = parse_or(&get, "MENTRA_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MENTRA_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let pause_ms: u64 = parse_or(&get, "MENTRA_ROTATION_PAUSE_MS", 250)?;
        let timeout_secs: u64 = parse_or(
            &get,
            "MENTRA_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?;

        let gateway = GatewayConfig {
            api_keys: collect_api_keys(&get),
            api_base: get("MENTRA_API_BASE").unwrap_or(defaults.api_base),
            chat_model: get("MENTRA_CHAT_MODEL").unwrap_or(defaults.chat_model),
            analysis_model: get("MENTRA_ANALYSIS_MODEL").unwrap_or(defaults.analysis_model),
            analysis_variant,
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_attempts,
                rotation_pause: Duration::from_millis(pause_ms),
                ..defaults.retry
            },
        };

        Ok(Self {
            gateway,
            analysis_threshold: parse_or(
                &get,
                "MENTRA_ANALYSIS_THRESHOLD",
                DEFAULT_ANALYSIS_THRESHOLD,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

/// Credentials in precedence order; the pool drops blanks and duplicates
fn collect_api_keys(get: &impl Fn(&str) -> Option<String>) -> Vec<String> {
    let mut keys = Vec::new();

    if let Some(list) = get("MENTRA_API_KEYS") {
        keys.extend(list.split(',').map(|k| k.trim().to_string()));
    }
    if let Some(key) = get("GEMINI_API_KEY") {
        keys.push(key);
    }
    // Numbered keys stop at the first gap
    for n in 1.. {
        match get(&format!("GEMINI_API_KEY_{n}")) {
            Some(key) => keys.push(key),
            None => break,
        }
    }
    if let Some(key) = get("API_KEY") {
        keys.push(key);
    }

    keys.retain(|k| !k.trim().is_empty());
    keys
}
