//! LLM error types

use thiserror::Error;

/// Substrings that mark a provider failure as quota or rate-limit exhaustion
const QUOTA_MARKERS: &[&str] = &["429", "quota", "resource_exhausted", "resource exhausted"];

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status of the failed response, when there was one
    pub status: Option<u16>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Whether the provider is signalling quota or rate-limit exhaustion.
    ///
    /// Providers are inconsistent about how they report throttling, so besides
    /// the classified kind and a 429 status the message text is checked for
    /// the usual markers (`quota`, `RESOURCE_EXHAUSTED`, ...).
    pub fn is_quota_exhausted(&self) -> bool {
        if self.kind == LlmErrorKind::RateLimit || self.status == Some(429) {
            return true;
        }
        let lower = self.message.to_lowercase();
        QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

/// Error classification reported by providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}
