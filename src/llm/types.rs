//! Common types for LLM interactions

use serde::{Deserialize, Serialize};

/// LLM request
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// System instruction (persona)
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub temperature: Option<f32>,
    /// Structured output constraint
    pub response_format: Option<ResponseFormat>,
    pub max_tokens: Option<u32>,
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Structured response requirement: MIME type plus a provider schema
#[derive(Debug, Clone)]
pub struct ResponseFormat {
    pub mime_type: String,
    pub schema: serde_json::Value,
}

impl ResponseFormat {
    pub fn json(schema: serde_json::Value) -> Self {
        Self {
            mime_type: "application/json".to_string(),
            schema,
        }
    }
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl LlmResponse {
    #[allow(dead_code)] // Used by test doubles
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
