//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::gateway::{AnalysisResult, Gateway, GatewayError};
use crate::llm::LlmMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Access to the generation provider
#[async_trait]
pub trait ConversationGateway: Send + Sync {
    /// Next conversational reply for `history`
    async fn reply(&self, history: &[LlmMessage]) -> Result<String, GatewayError>;

    /// Structured analysis of a flattened transcript
    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, GatewayError>;
}

#[async_trait]
impl ConversationGateway for Gateway {
    async fn reply(&self, history: &[LlmMessage]) -> Result<String, GatewayError> {
        Gateway::reply(self, history).await
    }

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, GatewayError> {
        Gateway::analyze(self, transcript).await
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationGateway + ?Sized> ConversationGateway for Arc<T> {
    async fn reply(&self, history: &[LlmMessage]) -> Result<String, GatewayError> {
        (**self).reply(history).await
    }

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, GatewayError> {
        (**self).analyze(transcript).await
    }
}
