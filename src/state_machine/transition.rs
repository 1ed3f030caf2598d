//! Pure state transition function

use super::{Effect, ErrorBanner, Event, SessionContext, ViewState};
use crate::booking::CardFormError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ViewState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ViewState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Still waiting for a reply, try again in a moment")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid card details: {0}")]
    InvalidForm(CardFormError),
    #[error("Cannot reset while a payment is being confirmed")]
    ResetBlocked,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// expressed as effects.
pub fn transition(
    state: &ViewState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Reset
        // ============================================================
        (state, Event::Reset) => {
            if state.is_reset_blocked() {
                return Err(TransitionError::ResetBlocked);
            }
            Ok(TransitionResult::new(ViewState::Landing).with_effect(Effect::ClearSession))
        }

        // ============================================================
        // Chat
        // ============================================================
        (ViewState::Landing, Event::Start) => Ok(TransitionResult::new(ViewState::chatting(0))),

        (ViewState::Landing, Event::UserMessage { text }) => send(0, &text, context),

        (
            ViewState::Chatting {
                awaiting_reply: true,
                ..
            },
            Event::UserMessage { .. } | Event::EndSession,
        ) => Err(TransitionError::Busy),

        (ViewState::Chatting { exchanged, .. }, Event::UserMessage { text }) => {
            send(*exchanged, &text, context)
        }

        (
            ViewState::Chatting {
                exchanged,
                awaiting_reply: true,
                ..
            },
            Event::ReplyReceived { text },
        ) => Ok(TransitionResult::new(ViewState::chatting(exchanged + 1))
            .with_effect(Effect::assistant_message(text))),

        (
            ViewState::Chatting {
                exchanged,
                awaiting_reply: true,
                ..
            },
            Event::ReplyFailed { message, kind },
        ) => Ok(TransitionResult::new(ViewState::Chatting {
            exchanged: *exchanged,
            awaiting_reply: false,
            banner: Some(ErrorBanner::new(kind, message)),
        })),

        (
            ViewState::Chatting {
                exchanged,
                awaiting_reply,
                banner: Some(_),
            },
            Event::DismissBanner,
        ) => Ok(TransitionResult::new(ViewState::Chatting {
            exchanged: *exchanged,
            awaiting_reply: *awaiting_reply,
            banner: None,
        })),

        (ViewState::Chatting { exchanged, .. }, Event::EndSession) => {
            if *exchanged == 0 {
                return Err(TransitionError::InvalidTransition(
                    "Nothing to analyze yet".to_string(),
                ));
            }
            Ok(TransitionResult::new(ViewState::Analyzing {
                exchanged: *exchanged,
            })
            .with_effect(Effect::RequestAnalysis))
        }

        // ============================================================
        // Analysis
        // ============================================================
        (ViewState::Analyzing { .. }, Event::AnalysisComplete { analysis }) => {
            Ok(TransitionResult::new(ViewState::Results { analysis }))
        }

        // Transcript is kept; the user can retry or keep chatting
        (ViewState::Analyzing { exchanged }, Event::AnalysisFailed { message, kind }) => {
            Ok(TransitionResult::new(ViewState::Chatting {
                exchanged: *exchanged,
                awaiting_reply: false,
                banner: Some(ErrorBanner::new(kind, message)),
            }))
        }

        // ============================================================
        // Booking
        // ============================================================
        (ViewState::Results { analysis }, Event::JoinCircle) => Ok(TransitionResult::new(
            ViewState::Waiting {
                analysis: analysis.clone(),
            },
        )
        .with_effect(Effect::ScheduleMatch {
            delay: context.match_delay,
        })),

        (ViewState::Waiting { analysis }, Event::MatchFound { booking }) => {
            Ok(TransitionResult::new(ViewState::Proposal {
                analysis: analysis.clone(),
                booking,
            }))
        }

        (ViewState::Proposal { analysis, booking }, Event::ReserveSeat) => {
            Ok(TransitionResult::new(ViewState::Payment {
                analysis: analysis.clone(),
                booking: booking.clone(),
                processing: false,
                card_last4: None,
            }))
        }

        (
            ViewState::Payment {
                processing: true, ..
            },
            Event::SubmitPayment { .. },
        ) => Err(TransitionError::Busy),

        (
            ViewState::Payment {
                analysis, booking, ..
            },
            Event::SubmitPayment { form },
        ) => {
            form.validate().map_err(TransitionError::InvalidForm)?;
            Ok(TransitionResult::new(ViewState::Payment {
                analysis: analysis.clone(),
                booking: booking.clone(),
                processing: true,
                card_last4: Some(form.last4()),
            })
            .with_effect(Effect::SchedulePaymentSettlement {
                delay: context.payment_delay,
            }))
        }

        (
            ViewState::Payment {
                analysis,
                booking,
                processing: true,
                card_last4,
            },
            Event::PaymentSettled,
        ) => Ok(TransitionResult::new(ViewState::Confirmed {
            analysis: analysis.clone(),
            booking: booking.clone(),
            card_last4: card_last4.clone().unwrap_or_default(),
        })),

        // ============================================================
        // Invalid
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} is not valid in {}",
            event.name(),
            state.name()
        ))),
    }
}

/// A user send: append it, then either ask for a reply or, once enough has
/// been exchanged, move on to the analysis.
fn send(
    exchanged: usize,
    text: &str,
    context: &SessionContext,
) -> Result<TransitionResult, TransitionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TransitionError::EmptyMessage);
    }

    if exchanged >= context.analysis_threshold {
        return Ok(TransitionResult::new(ViewState::Analyzing {
            exchanged: exchanged + 1,
        })
        .with_effect(Effect::user_message(text))
        .with_effect(Effect::RequestAnalysis));
    }

    Ok(TransitionResult::new(ViewState::Chatting {
        exchanged: exchanged + 1,
        awaiting_reply: true,
        banner: None,
    })
    .with_effect(Effect::user_message(text))
    .with_effect(Effect::RequestReply))
}
