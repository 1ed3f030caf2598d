//! Events that drive a session

use crate::booking::{Booking, CardForm};
use crate::gateway::AnalysisResult;
use crate::state_machine::state::FailureKind;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Start,
    UserMessage {
        text: String,
    },
    DismissBanner,
    EndSession,
    JoinCircle,
    ReserveSeat,
    SubmitPayment {
        form: CardForm,
    },
    Reset,

    // Gateway events
    ReplyReceived {
        text: String,
    },
    ReplyFailed {
        message: String,
        kind: FailureKind,
    },
    AnalysisComplete {
        analysis: AnalysisResult,
    },
    AnalysisFailed {
        message: String,
        kind: FailureKind,
    },

    // Timer events
    MatchFound {
        booking: Booking,
    },
    PaymentSettled,
}

impl Event {
    /// Variant name without payload, safe to log
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "Start",
            Event::UserMessage { .. } => "UserMessage",
            Event::DismissBanner => "DismissBanner",
            Event::EndSession => "EndSession",
            Event::JoinCircle => "JoinCircle",
            Event::ReserveSeat => "ReserveSeat",
            Event::SubmitPayment { .. } => "SubmitPayment",
            Event::Reset => "Reset",
            Event::ReplyReceived { .. } => "ReplyReceived",
            Event::ReplyFailed { .. } => "ReplyFailed",
            Event::AnalysisComplete { .. } => "AnalysisComplete",
            Event::AnalysisFailed { .. } => "AnalysisFailed",
            Event::MatchFound { .. } => "MatchFound",
            Event::PaymentSettled => "PaymentSettled",
        }
    }
}
