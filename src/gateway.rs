//! Conversation gateway
//!
//! Wraps the two provider calls (chat reply and structured analysis) with
//! credential rotation and exponential backoff so that bursty per-key quota
//! limits do not surface as user-visible failures.

mod analysis;
mod credentials;
mod retry;

#[cfg(test)]
mod proptests;

pub use analysis::{AnalysisResult, AnalysisVariant, Recommendation};
#[cfg(test)]
pub use analysis::{GroupMatch, Therapist};
pub use credentials::CredentialPool;
pub use retry::{RetryDecision, RetryPolicy, RetryTracker};

use crate::config::GatewayConfig;
use crate::llm::{
    GeminiService, LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, LoggingService,
    ResponseFormat,
};
use crate::state_machine::FailureKind;
use crate::system_prompt::{analysis_prompt, PERSONA};
use std::sync::Arc;
use thiserror::Error;

/// Reply used when the provider answers with nothing
pub const FALLBACK_REPLY: &str = "I'm here.";

const CHAT_TEMPERATURE: f32 = 0.8;

/// Errors surfaced by the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No API credentials configured")]
    NoCredentials,
    #[error("Cannot request a reply for an empty conversation")]
    EmptyHistory,
    #[error("Provider error: {0}")]
    Provider(LlmError),
    #[error("Malformed analysis response: {reason}")]
    MalformedResponse { reason: String, body: String },
    #[error("Provider still throttling after {attempts} attempts: {last}")]
    ProviderExhausted { attempts: u32, last: LlmError },
}

impl GatewayError {
    /// How the failure should be presented to the user
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            GatewayError::ProviderExhausted { .. } => FailureKind::Busy,
            _ => FailureKind::Generic,
        }
    }
}

/// Resilient access to the generation provider.
///
/// Owns its credential pool and cursor; share it behind an `Arc`.
pub struct Gateway {
    chat: Arc<dyn LlmService>,
    analysis: Arc<dyn LlmService>,
    credentials: CredentialPool,
    policy: RetryPolicy,
    variant: AnalysisVariant,
}

impl Gateway {
    pub fn new(
        chat: Arc<dyn LlmService>,
        analysis: Arc<dyn LlmService>,
        credentials: CredentialPool,
        policy: RetryPolicy,
        variant: AnalysisVariant,
    ) -> Self {
        Self {
            chat,
            analysis,
            credentials,
            policy,
            variant,
        }
    }

    /// Build a Gemini-backed gateway from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let chat = GeminiService::new(
            config.chat_model.clone(),
            &config.api_base,
            config.request_timeout,
        )
        .map_err(GatewayError::Provider)?;
        let analysis = GeminiService::new(
            config.analysis_model.clone(),
            &config.api_base,
            config.request_timeout,
        )
        .map_err(GatewayError::Provider)?;

        Ok(Self::new(
            Arc::new(LoggingService::new(Arc::new(chat))),
            Arc::new(LoggingService::new(Arc::new(analysis))),
            CredentialPool::new(config.api_keys.iter().cloned()),
            config.retry.clone(),
            config.analysis_variant,
        ))
    }

    pub fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    /// Produce the next conversational reply for `history`
    pub async fn reply(&self, history: &[LlmMessage]) -> Result<String, GatewayError> {
        if history.is_empty() {
            return Err(GatewayError::EmptyHistory);
        }

        let request = LlmRequest {
            system: Some(PERSONA.to_string()),
            messages: history.to_vec(),
            temperature: Some(CHAT_TEMPERATURE),
            ..LlmRequest::default()
        };

        let response = self.call_with_retry(self.chat.as_ref(), &request).await?;
        let text = response.text.trim();
        if text.is_empty() {
            tracing::debug!("Empty reply from provider, using fallback");
            return Ok(FALLBACK_REPLY.to_string());
        }
        Ok(text.to_string())
    }

    /// Classify a flattened transcript into a structured result.
    ///
    /// A response that does not match the schema is a contract violation and
    /// is returned immediately, never retried.
    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, GatewayError> {
        let request = LlmRequest {
            system: Some(PERSONA.to_string()),
            messages: vec![LlmMessage::user(analysis_prompt(transcript))],
            response_format: Some(ResponseFormat::json(self.variant.schema())),
            ..LlmRequest::default()
        };

        let response = self.call_with_retry(self.analysis.as_ref(), &request).await?;
        self.variant.parse(&response.text).map_err(|reason| {
            tracing::warn!(variant = %self.variant, %reason, "Analysis response did not match schema");
            GatewayError::MalformedResponse {
                reason,
                body: response.text,
            }
        })
    }

    async fn call_with_retry(
        &self,
        service: &dyn LlmService,
        request: &LlmRequest,
    ) -> Result<LlmResponse, GatewayError> {
        let mut tracker = RetryTracker::default();

        loop {
            let Some((index, api_key)) = self.credentials.current() else {
                return Err(GatewayError::NoCredentials);
            };

            tracker.record_attempt();
            let error = match service.complete(api_key, request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_quota_exhausted() {
                return Err(GatewayError::Provider(error));
            }

            match self.policy.on_transient_failure(&mut tracker, &self.credentials) {
                RetryDecision::Rotate { pause } => {
                    tracing::warn!(
                        model = service.model_id(),
                        attempt = tracker.attempts,
                        from = index,
                        to = self.credentials.cursor(),
                        pause_ms = %pause.as_millis(),
                        "Credential throttled, rotating"
                    );
                    tokio::time::sleep(pause).await;
                }
                RetryDecision::Backoff { delay } => {
                    let wait = delay + self.policy.jitter();
                    tracing::warn!(
                        model = service.model_id(),
                        attempt = tracker.attempts,
                        cursor = self.credentials.cursor(),
                        delay_ms = %wait.as_millis(),
                        "All credentials throttled, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                RetryDecision::GiveUp => {
                    return Err(GatewayError::ProviderExhausted {
                        attempts: tracker.attempts,
                        last: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Provider double that replays queued outcomes and records each call
    struct ScriptedService {
        outcomes: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        calls: Mutex<Vec<(String, Instant)>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedService {
        fn new(outcomes: Vec<Result<LlmResponse, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn keys(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }

        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().unwrap();
            calls.windows(2).map(|w| w[1].1 - w[0].1).collect()
        }
    }

    #[async_trait]
    impl LlmService for ScriptedService {
        async fn complete(&self, api_key: &str, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((api_key.to_string(), Instant::now()));
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::unknown("no scripted outcome")))
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn throttled() -> Result<LlmResponse, LlmError> {
        Err(LlmError::rate_limit("Resource has been exhausted").with_status(429))
    }

    fn ok(text: &str) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse::from_text(text))
    }

    fn gateway(service: &Arc<ScriptedService>, keys: &[&str]) -> Gateway {
        Gateway::new(
            service.clone(),
            service.clone(),
            CredentialPool::new(keys.iter().copied()),
            RetryPolicy::default(),
            AnalysisVariant::GroupMatch,
        )
    }

    fn history() -> Vec<LlmMessage> {
        vec![LlmMessage::user("I can't sleep lately")]
    }

    const GROUP_JSON: &str = r#"{"summary":"s","theme":"Anxiety","insight":"i",
        "groupMatch":{"id":"g1","theme":"Anxiety","focus":"f","description":"d",
        "therapist":{"name":"n","imageUrl":"u","credentials":"c"}}}"#;

    #[tokio::test(start_paused = true)]
    async fn test_rotates_then_backs_off() {
        let service = ScriptedService::new(vec![throttled(), throttled(), ok("still here")]);
        let gw = gateway(&service, &["k1", "k2"]);

        let reply = gw.reply(&history()).await.unwrap();

        assert_eq!(reply, "still here");
        assert_eq!(service.keys(), vec!["k1", "k2", "k1"]);
        let gaps = service.gaps();
        assert_eq!(gaps[0], Duration::from_millis(250));
        assert!(gaps[1] >= Duration::from_secs(1));
        assert!(gaps[1] <= Duration::from_millis(1250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_key_exhausts_after_five_attempts() {
        let service = ScriptedService::new((0..5).map(|_| throttled()).collect());
        let gw = gateway(&service, &["k1"]);

        let err = gw.reply(&history()).await.unwrap_err();

        match err {
            GatewayError::ProviderExhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert_eq!(last.kind, LlmErrorKind::RateLimit);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(service.keys().len(), 5);

        let gaps = service.gaps();
        for (i, gap) in gaps.iter().enumerate() {
            let base = Duration::from_secs(1 << i);
            assert!(*gap >= base, "gap {i} too short: {gap:?}");
            assert!(*gap <= base + Duration::from_millis(250), "gap {i} too long: {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let service = ScriptedService::new(vec![Err(LlmError::auth("API key not valid"))]);
        let gw = gateway(&service, &["k1", "k2"]);

        let err = gw.reply(&history()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Provider(ref e) if e.kind == LlmErrorKind::Auth));
        assert_eq!(err.failure_kind(), FailureKind::Generic);
        assert_eq!(service.keys(), vec!["k1"]);
        assert_eq!(gw.credentials().cursor(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reads_as_busy() {
        let service = ScriptedService::new((0..5).map(|_| throttled()).collect());
        let gw = gateway(&service, &["k1"]);
        let err = gw.reply(&history()).await.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Busy);
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let service = ScriptedService::new(vec![ok("   ")]);
        let gw = gateway(&service, &["k1"]);
        assert_eq!(gw.reply(&history()).await.unwrap(), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_empty_history_makes_no_call() {
        let service = ScriptedService::new(vec![ok("hi")]);
        let gw = gateway(&service, &["k1"]);
        assert!(matches!(gw.reply(&[]).await, Err(GatewayError::EmptyHistory)));
        assert!(service.keys().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_on_first_call() {
        let service = ScriptedService::new(vec![ok("hi")]);
        let gw = gateway(&service, &[]);
        assert!(matches!(
            gw.reply(&history()).await,
            Err(GatewayError::NoCredentials)
        ));
        assert!(service.keys().is_empty());
    }

    #[tokio::test]
    async fn test_chat_request_carries_persona_and_temperature() {
        let service = ScriptedService::new(vec![ok("hello")]);
        let gw = gateway(&service, &["k1"]);
        gw.reply(&history()).await.unwrap();

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].system.as_deref(), Some(PERSONA));
        assert_eq!(requests[0].temperature, Some(CHAT_TEMPERATURE));
        assert!(requests[0].response_format.is_none());
        assert_eq!(requests[0].messages, history());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_persists_across_calls() {
        let service = ScriptedService::new(vec![throttled(), ok("one"), ok("two")]);
        let gw = gateway(&service, &["k1", "k2"]);

        gw.reply(&history()).await.unwrap();
        gw.reply(&history()).await.unwrap();

        assert_eq!(service.keys(), vec!["k1", "k2", "k2"]);
    }

    #[tokio::test]
    async fn test_analyze_parses_structured_result() {
        let service = ScriptedService::new(vec![ok(GROUP_JSON)]);
        let gw = gateway(&service, &["k1"]);

        let result = gw.analyze("user: I feel on edge").await.unwrap();

        assert_eq!(result.theme, "Anxiety");
        assert!(matches!(result.recommendation, Recommendation::Group(_)));
        let requests = service.requests.lock().unwrap();
        let format = requests[0].response_format.as_ref().unwrap();
        assert_eq!(format.mime_type, "application/json");
        assert!(requests[0].messages[0].text.contains("user: I feel on edge"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_analysis_is_not_retried() {
        let service = ScriptedService::new(vec![ok("not json at all"), ok(GROUP_JSON)]);
        let gw = gateway(&service, &["k1", "k2"]);

        let err = gw.analyze("user: hi").await.unwrap_err();

        match err {
            GatewayError::MalformedResponse { body, .. } => assert_eq!(body, "not json at all"),
            other => panic!("expected malformed response, got {other:?}"),
        }
        assert_eq!(service.keys().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_retries_through_throttling() {
        let service = ScriptedService::new(vec![throttled(), ok(GROUP_JSON)]);
        let gw = gateway(&service, &["k1", "k2"]);

        assert!(gw.analyze("user: hi").await.is_ok());
        assert_eq!(service.keys(), vec!["k1", "k2"]);
    }
}
