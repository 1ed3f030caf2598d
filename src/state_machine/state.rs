//! Session view state types

use crate::booking::Booking;
use crate::gateway::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay of the mocked match queue
pub const DEFAULT_MATCH_DELAY: Duration = Duration::from_millis(4500);
/// Default delay of the mocked payment processor
pub const DEFAULT_PAYMENT_DELAY: Duration = Duration::from_secs(2);

/// How a gateway failure is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider still throttling; the user should simply try again
    Busy,
    Generic,
}

/// Dismissible inline error shown on the chat screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub kind: FailureKind,
    pub message: String,
}

impl ErrorBanner {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The active screen.
///
/// Post-analysis screens own the analysis result, so none of them can be
/// entered without one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Landing,

    Chatting {
        /// Messages exchanged so far, both roles
        exchanged: usize,
        /// A reply request is in flight; sends are rejected
        awaiting_reply: bool,
        banner: Option<ErrorBanner>,
    },

    /// Analysis request in flight
    Analyzing { exchanged: usize },

    Results { analysis: AnalysisResult },

    /// Mocked match queue running
    Waiting { analysis: AnalysisResult },

    Proposal {
        analysis: AnalysisResult,
        booking: Booking,
    },

    Payment {
        analysis: AnalysisResult,
        booking: Booking,
        /// Mocked settlement scheduled; reset is blocked
        processing: bool,
        card_last4: Option<String>,
    },

    Confirmed {
        analysis: AnalysisResult,
        booking: Booking,
        card_last4: String,
    },
}

impl ViewState {
    pub fn chatting(exchanged: usize) -> Self {
        ViewState::Chatting {
            exchanged,
            awaiting_reply: false,
            banner: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Landing => "landing",
            ViewState::Chatting { .. } => "chatting",
            ViewState::Analyzing { .. } => "analyzing",
            ViewState::Results { .. } => "results",
            ViewState::Waiting { .. } => "waiting",
            ViewState::Proposal { .. } => "proposal",
            ViewState::Payment { .. } => "payment",
            ViewState::Confirmed { .. } => "confirmed",
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            ViewState::Results { analysis }
            | ViewState::Waiting { analysis }
            | ViewState::Proposal { analysis, .. }
            | ViewState::Payment { analysis, .. }
            | ViewState::Confirmed { analysis, .. } => Some(analysis),
            ViewState::Landing | ViewState::Chatting { .. } | ViewState::Analyzing { .. } => None,
        }
    }

    #[allow(dead_code)] // State query utility
    pub fn is_post_analysis(&self) -> bool {
        self.analysis().is_some()
    }

    /// Reset is refused while a payment is being confirmed
    pub fn is_reset_blocked(&self) -> bool {
        matches!(
            self,
            ViewState::Payment {
                processing: true,
                ..
            }
        )
    }
}

/// Immutable per-session settings
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Exchanged messages after which a send triggers the analysis
    pub analysis_threshold: usize,
    pub match_delay: Duration,
    pub payment_delay: Duration,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, analysis_threshold: usize) -> Self {
        Self {
            session_id: session_id.into(),
            analysis_threshold,
            match_delay: DEFAULT_MATCH_DELAY,
            payment_delay: DEFAULT_PAYMENT_DELAY,
        }
    }
}
