//! Property-based tests for the state machine
//!
//! Random event sequences are replayed against the pure transition function;
//! rejected events leave the state untouched, as the runtime does.

use super::transition::TransitionError;
use super::*;
use crate::booking::{Booking, CardForm};
use crate::runtime::testing::sample_analysis;
use crate::transcript::Role;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("prop-session", 4)
}

fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![Just(FailureKind::Busy), Just(FailureKind::Generic)]
}

fn arb_card_form() -> impl Strategy<Value = CardForm> {
    prop_oneof![
        Just(CardForm::new("Ada", "4242424242424242", "1227", "123")),
        ("[a-z ]{0,5}", "[0-9]{0,18}", "[0-9]{0,4}", "[0-9]{0,4}")
            .prop_map(|(n, num, exp, cvv)| CardForm::new(&n, &num, &exp, &cvv)),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Start),
        "[a-z ]{0,12}".prop_map(|text| Event::UserMessage { text }),
        Just(Event::DismissBanner),
        Just(Event::EndSession),
        Just(Event::JoinCircle),
        Just(Event::ReserveSeat),
        arb_card_form().prop_map(|form| Event::SubmitPayment { form }),
        Just(Event::Reset),
        "[a-z]{1,8}".prop_map(|text| Event::ReplyReceived { text }),
        ("[a-z]{1,8}", arb_failure_kind())
            .prop_map(|(message, kind)| Event::ReplyFailed { message, kind }),
        Just(Event::AnalysisComplete {
            analysis: sample_analysis()
        }),
        ("[a-z]{1,8}", arb_failure_kind())
            .prop_map(|(message, kind)| Event::AnalysisFailed { message, kind }),
        Just(Event::MatchFound {
            booking: Booking::placeholder()
        }),
        Just(Event::PaymentSettled),
    ]
}

/// Replays events, mirroring the transcript through the emitted effects
struct Harness {
    state: ViewState,
    transcript: Vec<(Role, String)>,
    analyzed: bool,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: ViewState::Landing,
            transcript: Vec::new(),
            analyzed: false,
        }
    }

    fn apply(&mut self, event: Event) -> Option<Vec<Effect>> {
        let completes_analysis = matches!(event, Event::AnalysisComplete { .. });
        let result = transition(&self.state, &test_context(), event).ok()?;
        if completes_analysis {
            self.analyzed = true;
        }
        for effect in &result.effects {
            match effect {
                Effect::AppendMessage { role, content } => {
                    self.transcript.push((*role, content.clone()));
                }
                Effect::ClearSession => {
                    self.transcript.clear();
                    self.analyzed = false;
                }
                _ => {}
            }
        }
        self.state = result.new_state;
        Some(result.effects)
    }
}

proptest! {
    #[test]
    fn prop_post_analysis_requires_analysis(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut harness = Harness::new();
        for event in events {
            harness.apply(event);
            if harness.state.is_post_analysis() {
                prop_assert!(harness.analyzed, "entered {} without analysis", harness.state.name());
            }
        }
    }

    #[test]
    fn prop_transcript_is_append_only(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut harness = Harness::new();
        for event in events {
            let before = harness.transcript.clone();
            let cleared = harness
                .apply(event)
                .is_some_and(|effects| effects.contains(&Effect::ClearSession));
            if !cleared {
                prop_assert!(harness.transcript.len() >= before.len());
                prop_assert_eq!(&harness.transcript[..before.len()], &before[..]);
            }
        }
    }

    #[test]
    fn prop_exchanged_matches_transcript(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut harness = Harness::new();
        for event in events {
            harness.apply(event);
            match &harness.state {
                ViewState::Chatting { exchanged, .. } | ViewState::Analyzing { exchanged } => {
                    prop_assert_eq!(*exchanged, harness.transcript.len());
                }
                _ => {}
            }
        }
    }

    #[test]
    fn prop_reset_returns_to_landing(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut harness = Harness::new();
        for event in events {
            harness.apply(event);
        }
        let blocked = harness.state.is_reset_blocked();
        let result = transition(&harness.state, &test_context(), Event::Reset);
        if blocked {
            prop_assert_eq!(result.unwrap_err(), TransitionError::ResetBlocked);
        } else {
            let result = result.unwrap();
            prop_assert_eq!(result.new_state, ViewState::Landing);
            prop_assert_eq!(result.effects, vec![Effect::ClearSession]);
        }
    }

    #[test]
    fn prop_one_request_in_flight(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut harness = Harness::new();
        let mut pending = false;
        for event in events {
            let settles = matches!(
                event,
                Event::ReplyReceived { .. }
                    | Event::ReplyFailed { .. }
                    | Event::AnalysisComplete { .. }
                    | Event::AnalysisFailed { .. }
                    | Event::Reset
            );
            let Some(effects) = harness.apply(event) else { continue };
            if settles {
                pending = false;
            }
            let requests = effects
                .iter()
                .filter(|e| matches!(e, Effect::RequestReply | Effect::RequestAnalysis))
                .count();
            prop_assert!(requests <= 1);
            if requests == 1 {
                prop_assert!(!pending, "second request while one is outstanding");
                pending = true;
            }
        }
    }
}
