//! Effects produced by state transitions

use crate::transcript::Role;
use std::time::Duration;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript
    AppendMessage { role: Role, content: String },

    /// Ask the gateway for a chat reply to the transcript so far
    RequestReply,

    /// Ask the gateway to analyze the flattened transcript
    RequestAnalysis,

    /// Drop messages and discard results of in-flight work
    ClearSession,

    /// Post `MatchFound` after the mocked queue delay
    ScheduleMatch { delay: Duration },

    /// Post `PaymentSettled` after the mocked processing delay
    SchedulePaymentSettlement { delay: Duration },
}

impl Effect {
    pub fn user_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
