//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::ConversationGateway;
use crate::gateway::{AnalysisResult, GatewayError, GroupMatch, Recommendation, Therapist};
use crate::llm::{LlmError, LlmMessage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A complete group-match analysis
pub fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        summary: "Worn down by a job that never switches off.".to_string(),
        theme: "Burnout".to_string(),
        insight: "Rest is part of the work.".to_string(),
        recommendation: Recommendation::Group(GroupMatch {
            id: "grp-burnout-1".to_string(),
            theme: "Burnout".to_string(),
            focus: "Boundaries".to_string(),
            description: "A weekly circle for people running on empty.".to_string(),
            therapist: Therapist {
                name: "Dr. Lena Ortiz".to_string(),
                image_url: "https://example.com/lena.png".to_string(),
                credentials: "PsyD".to_string(),
            },
        }),
    }
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// Gateway that returns queued outcomes and records every call
#[derive(Default)]
pub struct MockGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    analyses: Mutex<VecDeque<Result<AnalysisResult, GatewayError>>>,
    reply_delay: Duration,
    /// Histories passed to `reply`
    pub reply_calls: Mutex<Vec<Vec<LlmMessage>>>,
    /// Transcripts passed to `analyze`
    pub analysis_calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, to keep a request in flight
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_reply_error(&self, error: GatewayError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_analysis(&self, analysis: AnalysisResult) {
        self.analyses.lock().unwrap().push_back(Ok(analysis));
    }

    pub fn queue_analysis_error(&self, error: GatewayError) {
        self.analyses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_analyses(&self) -> Vec<String> {
        self.analysis_calls.lock().unwrap().clone()
    }

    pub fn reply_count(&self) -> usize {
        self.reply_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversationGateway for MockGateway {
    async fn reply(&self, history: &[LlmMessage]) -> Result<String, GatewayError> {
        self.reply_calls.lock().unwrap().push(history.to_vec());
        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Provider(LlmError::network("No mock reply queued"))))
    }

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, GatewayError> {
        self.analysis_calls
            .lock()
            .unwrap()
            .push(transcript.to_string());
        self.analyses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(GatewayError::Provider(LlmError::network(
                "No mock analysis queued",
            )))
        })
    }
}
